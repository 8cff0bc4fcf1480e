//! Result database
//!
//! A database is every result found directly under a store directory, loaded
//! all-or-nothing and read-only afterwards.
//!
//! ```rust,no_run
//! use falba::{Database, Pipeline};
//!
//! let db = Database::builder()
//!     .pipeline(&Pipeline::builtin()?)
//!     .parallel(true)
//!     .load("./results")?;
//!
//! for row in db.results_table().rows() {
//!     println!("{}:{} ({} facts)", row.test_name, row.result_id, row.facts.len());
//! }
//! # Ok::<(), falba::Error>(())
//! ```

mod table;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::builder::{Pipeline, ResultBuilder};
use crate::config::{StoreConfig, CONFIG_FILE};
use crate::error::LoadFailure;
use crate::model::BenchResult;
use crate::query::{Activation, Predicate};
use crate::{Error, Result};

pub use table::{FlatRow, FlatTable, ResultRow, ResultsTable};

/// Every result in a store, with the store's configuration.
#[derive(Debug, Clone)]
pub struct Database {
    root: PathBuf,
    config: StoreConfig,
    results: Vec<BenchResult>,
    fact_names: BTreeSet<String>,
}

impl Database {
    /// Create a new database builder.
    #[must_use]
    pub fn builder<'a>() -> DatabaseBuilder<'a> {
        DatabaseBuilder::default()
    }

    /// Load every result under `root` with the given pipeline.
    ///
    /// # Errors
    ///
    /// Returns error if the root cannot be listed, the store configuration is
    /// invalid, or any result fails to build ([`Error::LoadFailed`])
    pub fn load(root: impl AsRef<Path>, pipeline: &Pipeline) -> Result<Self> {
        Self::builder().pipeline(pipeline).load(root)
    }

    /// Store root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Results, sorted by dirname.
    #[must_use]
    pub fn results(&self) -> &[BenchResult] {
        &self.results
    }

    /// Look up a result by dirname (`test_name:result_id`).
    #[must_use]
    pub fn result(&self, dirname: &str) -> Option<&BenchResult> {
        self.results.iter().find(|r| r.dirname() == dirname)
    }

    /// Number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True if the store holds no results.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Union of fact names across all results.
    #[must_use]
    pub const fn unique_fact_names(&self) -> &BTreeSet<String> {
        &self.fact_names
    }

    /// Union of metric names across all results.
    #[must_use]
    pub fn metric_names(&self) -> BTreeSet<String> {
        self.results
            .iter()
            .flat_map(|r| r.metrics().iter().map(|m| m.name().to_string()))
            .collect()
    }

    /// Distinct test names.
    #[must_use]
    pub fn test_names(&self) -> BTreeSet<String> {
        self.results
            .iter()
            .map(|r| r.test_name().to_string())
            .collect()
    }

    /// One row per result.
    #[must_use]
    pub fn results_table(&self) -> ResultsTable {
        ResultsTable::build(self.fact_columns(), &self.results)
    }

    /// One row per (result, metric sample).
    #[must_use]
    pub fn flat_table(&self) -> FlatTable {
        FlatTable::build(self.fact_columns(), &self.results)
    }

    /// Results for which `predicate` holds.
    ///
    /// The activation is the result's facts plus `result_id` and `test_name`
    /// (a fact of the same name takes precedence).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Predicate`] if evaluation fails on any result
    pub fn filter(&self, predicate: &Predicate) -> Result<Vec<&BenchResult>> {
        let mut matched = Vec::new();
        for result in &self.results {
            let mut activation: Activation = result.fact_values();
            activation
                .entry("result_id".to_string())
                .or_insert_with(|| result.result_id().into());
            activation
                .entry("test_name".to_string())
                .or_insert_with(|| result.test_name().into());
            let keep = predicate.evaluate(&activation).map_err(|e| match e {
                Error::Predicate(msg) => {
                    Error::Predicate(format!("{msg} (result {})", result.dirname()))
                }
                other => other,
            })?;
            if keep {
                matched.push(result);
            }
        }
        Ok(matched)
    }

    fn fact_columns(&self) -> Vec<String> {
        self.fact_names.iter().cloned().collect()
    }
}

/// Database builder
pub struct DatabaseBuilder<'a> {
    pipeline: Option<&'a Pipeline>,
    parallel: bool,
}

impl Default for DatabaseBuilder<'_> {
    fn default() -> Self {
        Self {
            pipeline: None,
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl<'a> DatabaseBuilder<'a> {
    /// Set the enrichment pipeline (defaults to [`Pipeline::builtin`]).
    #[must_use]
    pub const fn pipeline(mut self, pipeline: &'a Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Build results on a worker pool (requires the `parallel` feature;
    /// ignored without it).
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load the store at `root`.
    ///
    /// Each result is built with its own provenance map; result order is
    /// sorted by dirname regardless of scheduling.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `root` cannot be listed ([`Error::Io`])
    /// - `results.json` is invalid ([`Error::Config`])
    /// - any result fails to build ([`Error::LoadFailed`], listing all of them)
    pub fn load(self, root: impl AsRef<Path>) -> Result<Database> {
        let root = root.as_ref();
        let builtin;
        let pipeline = match self.pipeline {
            Some(p) => p,
            None => {
                builtin = Pipeline::builtin()?;
                &builtin
            }
        };

        let config = StoreConfig::load(root)?;
        let dirs = result_dirs(root)?;
        let builder = ResultBuilder::new(pipeline);

        let built = build_all(&builder, &dirs, self.parallel);

        let mut results = Vec::with_capacity(built.len());
        let mut failures = Vec::new();
        for (dirname, outcome) in built {
            match outcome {
                Ok(result) => results.push(result),
                Err(error) => {
                    tracing::warn!(result = %dirname, %error, "failed to load result");
                    failures.push(LoadFailure { dirname, error });
                }
            }
        }
        if !failures.is_empty() {
            return Err(Error::LoadFailed { failures });
        }

        let fact_names = results
            .iter()
            .flat_map(|r| r.facts().keys().cloned())
            .collect::<BTreeSet<_>>();

        tracing::info!(
            root = %root.display(),
            results = results.len(),
            facts = fact_names.len(),
            "loaded result database"
        );

        Ok(Database {
            root: root.to_path_buf(),
            config,
            results,
            fact_names,
        })
    }
}

/// Immediate children of the store root, sorted by name, without the config file.
fn result_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == CONFIG_FILE {
            continue;
        }
        dirs.push((name, entry.path()));
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

type Built = Vec<(String, Result<BenchResult>)>;

#[cfg(feature = "parallel")]
fn build_all(builder: &ResultBuilder<'_>, dirs: &[(String, PathBuf)], parallel: bool) -> Built {
    if parallel {
        dirs.par_iter()
            .map(|(name, path)| (name.clone(), builder.build(path)))
            .collect()
    } else {
        build_sequential(builder, dirs)
    }
}

#[cfg(not(feature = "parallel"))]
fn build_all(builder: &ResultBuilder<'_>, dirs: &[(String, PathBuf)], _parallel: bool) -> Built {
    build_sequential(builder, dirs)
}

fn build_sequential(builder: &ResultBuilder<'_>, dirs: &[(String, PathBuf)]) -> Built {
    dirs.iter()
        .map(|(name, path)| (name.clone(), builder.build(path)))
        .collect()
}
