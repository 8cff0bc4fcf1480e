//! Error types for falba
//!
//! Every error names the offending item and, where one exists, the set of
//! valid alternatives so the caller can correct the input and retry.

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

use crate::enrich::EnrichmentError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// A single result directory that failed to load.
#[derive(Debug)]
pub struct LoadFailure {
    /// Directory name of the failed result (`test_name:result_id`)
    pub dirname: String,
    /// Why it failed
    pub error: Error,
}

/// falba error types
#[derive(Error, Debug)]
pub enum Error {
    /// Path handed to the result builder is not a directory
    #[error("{} is not a directory, can't be read as a result", .0.display())]
    NotAResultDirectory(PathBuf),

    /// Result directory name lacks the `test_name:result_id` form
    #[error("malformed result directory name {0:?}: expected <test_name>:<result_id>")]
    MalformedResultName(String),

    /// An enricher or deriver failed on a specific artifact
    #[error("{producer} failed to enrich {artifact}: {source}")]
    Enrichment {
        /// Enricher or deriver name
        producer: String,
        /// Artifact key (or result dirname for derivers)
        artifact: String,
        /// Underlying extraction error
        #[source]
        source: EnrichmentError,
    },

    /// Two producers emitted the same attribute name where that is forbidden
    #[error("duplicate attribute {name:?}: produced by {first} and again by {second}")]
    DuplicateAttribute {
        /// Colliding fact/metric name
        name: String,
        /// Producer that emitted it first
        first: String,
        /// Producer that emitted the colliding attribute
        second: String,
    },

    /// One or more results failed to load; no partial database is returned
    #[error("failed to load {} result(s):{}", .failures.len(), format_failures(.failures))]
    LoadFailed {
        /// Every failed result, in dirname order
        failures: Vec<LoadFailure>,
    },

    /// Fact name not present on any result
    #[error("unknown fact {fact:?}; known facts: {}", .available.join(", "))]
    UnknownFact {
        /// Name the caller asked for
        fact: String,
        /// Every fact name present in the database
        available: Vec<String>,
    },

    /// A fact other than the experiment fact varies across the compared results
    #[error(
        "fact {fact:?} varies across compared results (values: {}); pin it with a fact equality filter or ignore it",
        .values.join(", ")
    )]
    UnresolvedConfound {
        /// Confounding fact
        fact: String,
        /// Distinct values observed (`<none>` for results lacking it)
        values: Vec<String>,
    },

    /// Filtering removed every candidate row
    #[error("no results match the comparison filters")]
    NoMatchingResults,

    /// Metric not present among the filtered rows
    #[error("unknown metric {metric:?}; available metrics: {}", .available.join(", "))]
    UnknownMetric {
        /// Name the caller asked for
        metric: String,
        /// Metric names present after filtering
        available: Vec<String>,
    },

    /// Test name not present among the filtered rows
    #[error("no results for test {test:?}; available tests: {}", .available.join(", "))]
    UnknownTest {
        /// Name the caller asked for
        test: String,
        /// Test names present after filtering
        available: Vec<String>,
    },

    /// More than one test reports the metric and no test constraint was given
    #[error("metric is reported by multiple tests ({}); pick one with --test", .tests.join(", "))]
    MultipleTests {
        /// Distinct test names that report the metric
        tests: Vec<String>,
    },

    /// Operation does not support the value type it was given
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// An identical artifact set was already imported under this test name
    #[error("result {0} already exists in the store")]
    DuplicateResult(String),

    /// Predicate failed to parse or evaluate
    #[error("predicate error: {0}")]
    Predicate(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Store configuration (`results.json`) could not be read
    #[error("invalid store configuration {}: {message}", .path.display())]
    Config {
        /// Path of the configuration file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    /// True for the comparator's validation family. These abort a single query
    /// and leave the database usable.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownFact { .. }
                | Self::UnresolvedConfound { .. }
                | Self::NoMatchingResults
                | Self::UnknownMetric { .. }
                | Self::UnknownTest { .. }
                | Self::MultipleTests { .. }
                | Self::Unsupported(_)
        )
    }
}

fn format_failures(failures: &[LoadFailure]) -> String {
    let mut out = String::new();
    for failure in failures {
        let _ = write!(out, "\n  {}: {}", failure.dirname, failure.error);
    }
    out
}
