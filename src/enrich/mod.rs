//! Artifact enrichment
//!
//! An enricher is a pure function from one [`Artifact`] to the facts and
//! metrics it can extract from it. Enrichers return [`Enrichment::none`] for
//! artifacts they do not recognise and a typed [`EnrichmentError`] for
//! artifacts they recognise but cannot parse.
//!
//! # Example
//!
//! ```rust
//! use falba::enrich::{Enricher, Enrichment, EnrichmentError, FnEnricher};
//! use falba::model::{Artifact, Metric};
//!
//! fn enrich_runtime(artifact: &Artifact) -> Result<Enrichment, EnrichmentError> {
//!     let secs: f64 = artifact
//!         .text()?
//!         .trim()
//!         .parse()
//!         .map_err(|_| EnrichmentError::Malformed("not a number".to_string()))?;
//!     Ok(Enrichment::metrics(vec![Metric::new("runtime", secs).with_unit("s")]))
//! }
//!
//! let enricher = FnEnricher::new("runtime", "runtime_*.txt", enrich_runtime)?;
//! assert_eq!(enricher.name(), "runtime");
//! # Ok::<(), falba::Error>(())
//! ```

mod archive;
mod json;
mod text;

use std::string::FromUtf8Error;

use glob::Pattern;
use thiserror::Error;

use crate::model::{Artifact, Fact, Metric};
use crate::{Error, Result};

pub use archive::enrich_from_sysfs_cpu_tgz;
pub use json::{
    enrich_from_ansible, enrich_from_falba_facts_json, enrich_from_fio_json_plus,
    enrich_from_nixos_version_json, enrich_from_phoronix_json,
};
pub use text::{
    enrich_from_bpftrace_logs, enrich_from_elapsed_ns, enrich_from_kconfig,
    enrich_from_nixos_system, enrich_from_os_release,
};

/// Extraction error raised by an enricher on content it is responsible for.
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// Artifact could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact is not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Artifact is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// A field the format requires is absent
    #[error("missing field {0}")]
    MissingField(String),

    /// Content does not follow the expected format
    #[error("malformed content: {0}")]
    Malformed(String),
}

/// Facts and metrics extracted from one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Facts produced
    pub facts: Vec<Fact>,
    /// Metric samples produced
    pub metrics: Vec<Metric>,
}

impl Enrichment {
    /// Nothing extracted (artifact irrelevant to this enricher).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Facts only.
    #[must_use]
    pub const fn facts(facts: Vec<Fact>) -> Self {
        Self {
            facts,
            metrics: Vec::new(),
        }
    }

    /// Metrics only.
    #[must_use]
    pub const fn metrics(metrics: Vec<Metric>) -> Self {
        Self {
            facts: Vec::new(),
            metrics,
        }
    }

    /// True if neither facts nor metrics were produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.metrics.is_empty()
    }
}

/// Extracts facts and metrics from a single artifact.
pub trait Enricher: Send + Sync {
    /// Stable name, used as the provenance producer ID.
    fn name(&self) -> &str;

    /// Extract from one artifact.
    ///
    /// # Errors
    ///
    /// Returns error if the artifact is one this enricher handles but its
    /// content is unreadable or malformed
    fn enrich(&self, artifact: &Artifact) -> std::result::Result<Enrichment, EnrichmentError>;
}

/// Signature of a plain-function enricher.
pub type EnrichFn = fn(&Artifact) -> std::result::Result<Enrichment, EnrichmentError>;

/// Enricher built from a name, a glob and a function.
///
/// A pattern containing `/` is matched against the whole artifact key;
/// otherwise it is matched against the file name only. The function is only
/// called for matching artifacts.
#[derive(Debug, Clone)]
pub struct FnEnricher {
    name: String,
    pattern: Pattern,
    func: EnrichFn,
}

impl FnEnricher {
    /// Create a new function enricher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the glob pattern is invalid
    pub fn new(name: impl Into<String>, pattern: &str, func: EnrichFn) -> Result<Self> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| Error::InvalidInput(format!("invalid glob {pattern:?}: {e}")))?;
        Ok(Self {
            name: name.into(),
            pattern,
            func,
        })
    }

    /// Whether this enricher applies to the artifact.
    #[must_use]
    pub fn matches(&self, artifact: &Artifact) -> bool {
        if self.pattern.as_str().contains('/') {
            self.pattern.matches(artifact.key())
        } else {
            self.pattern.matches(artifact.file_name())
        }
    }
}

impl Enricher for FnEnricher {
    fn name(&self) -> &str {
        &self.name
    }

    fn enrich(&self, artifact: &Artifact) -> std::result::Result<Enrichment, EnrichmentError> {
        if !self.matches(artifact) {
            return Ok(Enrichment::none());
        }
        (self.func)(artifact)
    }
}

const BUILTIN: &[(&str, &str, EnrichFn)] = &[
    ("falba_facts_json", "falba-facts.json", enrich_from_falba_facts_json),
    ("ansible", "ansible_facts.json", enrich_from_ansible),
    ("phoronix_json", "pts-results.json", enrich_from_phoronix_json),
    ("sysfs_cpu_tgz", "tmp/sysfs_cpu.tgz", enrich_from_sysfs_cpu_tgz),
    ("kconfig", "kconfig", enrich_from_kconfig),
    ("os_release", "etc_os-release", enrich_from_os_release),
    ("fio_json_plus", "fio_output_*.json", enrich_from_fio_json_plus),
    ("nixos_version_json", "nixos-version.json", enrich_from_nixos_version_json),
    ("bpftrace_logs", "bpftrace_asi_exits.log", enrich_from_bpftrace_logs),
    ("elapsed_ns", "compile-kernel_elapsed_ns_*", enrich_from_elapsed_ns),
    ("nixos_system", "nixos-system.txt", enrich_from_nixos_system),
];

/// The built-in enrichers, in registration order.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if a built-in glob pattern is invalid
pub fn builtin_enrichers() -> Result<Vec<Box<dyn Enricher>>> {
    BUILTIN
        .iter()
        .map(|&(name, pattern, func)| {
            FnEnricher::new(name, pattern, func).map(|e| Box::new(e) as Box<dyn Enricher>)
        })
        .collect()
}
