//! Result data model
//!
//! ## Schema Overview
//!
//! ```text
//! BenchResult (test_name:result_id)
//!     ├──< Artifact (N) [files under artifacts/]
//!     ├──< Fact (N)     [unique by name]
//!     └──< Metric (N)   [samples, names repeat]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use falba::model::{Fact, Metric, Value};
//!
//! let fact = Fact::new("kernel_version", "6.1");
//! let metric = Metric::new("latency", 52_777.7).with_unit("ns");
//!
//! assert_eq!(fact.value(), &Value::from("6.1"));
//! assert!(metric.value().is_numeric());
//! ```

mod artifact;
mod fact;
mod provenance;
mod result;
mod value;

pub use artifact::Artifact;
pub use fact::{Fact, Metric};
pub use provenance::{AttributeKind, Producer, Provenance};
pub use result::{parse_result_dirname, BenchResult};
pub use value::Value;
