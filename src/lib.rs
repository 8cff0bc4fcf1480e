//! # Falba: Benchmark Result Database
//!
//! **Version**: 0.1.0
//!
//! Falba loads a directory of benchmark results, extracts facts (system and
//! test configuration) and metrics (measurement samples) from their raw
//! artifacts, and runs controlled A/B comparisons that refuse to report a
//! difference unless exactly one fact varies between the compared groups.
//!
//! ## Store Layout
//!
//! ```text
//! results/
//!     results.json                    optional store configuration
//!     <test_name>:<result_id>/
//!         artifacts/...               raw files, input to enrichment
//! ```
//!
//! ## Pipeline
//!
//! - [`builder`]: artifacts -> enrichers -> derivers -> immutable [`model::BenchResult`]
//! - [`db`]: all results of a store, loaded all-or-nothing
//! - [`compare`]: confound-checked grouping, statistics and histograms
//! - [`import`]: content-addressed import of new results
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use falba::compare::{compare, ComparisonRequest};
//! use falba::{Database, Pipeline};
//!
//! let db = Database::load("./results", &Pipeline::builtin()?)?;
//! println!("{} results, facts: {:?}", db.len(), db.unique_fact_names());
//!
//! let request = ComparisonRequest::new("mode", "latency_ns").ignore("nixos_system");
//! let comparison = compare(&db, &request)?;
//! println!("{}", comparison.render());
//! # Ok::<(), falba::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod builder;
pub mod compare;
pub mod config;
pub mod db;
pub mod derive;
pub mod enrich;
pub mod error;
pub mod import;
pub mod model;
pub mod query;
pub mod storage;

pub use builder::{Pipeline, ResultBuilder};
pub use config::StoreConfig;
pub use db::{Database, DatabaseBuilder};
pub use error::{Error, LoadFailure, Result};
