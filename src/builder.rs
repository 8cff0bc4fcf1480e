//! Result builder
//!
//! Turns one `<test_name>:<result_id>` directory into a fully enriched,
//! immutable [`BenchResult`]. Facts and metrics accumulate in local
//! collections; nothing is observable until the build succeeds.

use std::collections::BTreeMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::derive::{builtin_derivers, Deriver};
use crate::enrich::{builtin_enrichers, Enricher, Enrichment};
use crate::model::{parse_result_dirname, Artifact, BenchResult, Fact, Metric, Provenance};
use crate::{Error, Result};

/// Name of the subdirectory holding a result's artifacts.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Ordered enrichers followed by ordered derivers.
pub struct Pipeline {
    enrichers: Vec<Box<dyn Enricher>>,
    derivers: Vec<Box<dyn Deriver>>,
}

impl Pipeline {
    /// Built-in enrichers and derivers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a built-in enricher's glob is invalid
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            enrichers: builtin_enrichers()?,
            derivers: builtin_derivers(),
        })
    }

    /// No enrichers and no derivers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            enrichers: Vec::new(),
            derivers: Vec::new(),
        }
    }

    /// Append an enricher.
    #[must_use]
    pub fn with_enricher(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enrichers.push(Box::new(enricher));
        self
    }

    /// Append a deriver.
    #[must_use]
    pub fn with_deriver(mut self, deriver: impl Deriver + 'static) -> Self {
        self.derivers.push(Box::new(deriver));
        self
    }

    /// Registered enrichers, in order.
    #[must_use]
    pub fn enrichers(&self) -> &[Box<dyn Enricher>] {
        &self.enrichers
    }

    /// Registered derivers, in order.
    #[must_use]
    pub fn derivers(&self) -> &[Box<dyn Deriver>] {
        &self.derivers
    }
}

/// Accumulates one result's attributes under provenance checks.
#[derive(Default)]
struct Accumulator {
    facts: BTreeMap<String, Fact>,
    metrics: Vec<Metric>,
    provenance: Provenance,
}

impl Accumulator {
    fn absorb(&mut self, producer: &str, enrichment: Enrichment) -> Result<()> {
        for fact in enrichment.facts {
            self.provenance.record_fact(fact.name(), producer)?;
            self.facts.insert(fact.name().to_string(), fact);
        }
        for metric in enrichment.metrics {
            self.provenance.record_metric(metric.name(), producer)?;
            self.metrics.push(metric);
        }
        Ok(())
    }
}

/// Builds [`BenchResult`]s by running a [`Pipeline`] over result directories.
pub struct ResultBuilder<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> ResultBuilder<'a> {
    /// Create a builder for the given pipeline.
    #[must_use]
    pub const fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Build a result from its directory.
    ///
    /// Every enricher runs, in registration order, against every artifact, in
    /// key order. Derivers then run against the enriched facts.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `dir` is not a directory ([`Error::NotAResultDirectory`])
    /// - its name is not `<test_name>:<result_id>` ([`Error::MalformedResultName`])
    /// - an enricher or deriver fails ([`Error::Enrichment`])
    /// - an attribute name collides ([`Error::DuplicateAttribute`])
    pub fn build(&self, dir: &Path) -> Result<BenchResult> {
        if !dir.is_dir() {
            return Err(Error::NotAResultDirectory(dir.to_path_buf()));
        }
        let dirname = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (test_name, result_id) = parse_result_dirname(&dirname)?;

        let artifacts = collect_artifacts(&dir.join(ARTIFACTS_DIR))?;
        let mut acc = Accumulator::default();

        for enricher in &self.pipeline.enrichers {
            for artifact in artifacts.values() {
                let enrichment = enricher.enrich(artifact).map_err(|source| Error::Enrichment {
                    producer: enricher.name().to_string(),
                    artifact: artifact.key().to_string(),
                    source,
                })?;
                if !enrichment.is_empty() {
                    tracing::debug!(
                        enricher = enricher.name(),
                        artifact = artifact.key(),
                        facts = enrichment.facts.len(),
                        metrics = enrichment.metrics.len(),
                        "enriched"
                    );
                }
                acc.absorb(enricher.name(), enrichment)?;
            }
        }

        for deriver in &self.pipeline.derivers {
            let enrichment = deriver.derive(&acc.facts).map_err(|source| Error::Enrichment {
                producer: deriver.name().to_string(),
                artifact: dirname.clone(),
                source,
            })?;
            acc.absorb(deriver.name(), enrichment)?;
        }

        tracing::debug!(
            result = %dirname,
            artifacts = artifacts.len(),
            facts = acc.facts.len(),
            metrics = acc.metrics.len(),
            "built result"
        );

        Ok(BenchResult::from_parts(
            test_name,
            result_id,
            artifacts,
            acc.facts,
            acc.metrics,
            acc.provenance,
        ))
    }
}

/// Every non-directory file under `root`, keyed by `/`-separated relative path.
///
/// A missing artifacts directory yields no artifacts.
pub(crate) fn collect_artifacts(root: &Path) -> Result<BTreeMap<String, Artifact>> {
    let mut artifacts = BTreeMap::new();
    if !root.is_dir() {
        return Ok(artifacts);
    }
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.path().is_dir() {
            continue;
        }
        let key = relative_key(root, entry.path());
        artifacts.insert(key.clone(), Artifact::new(key, entry.path()));
    }
    Ok(artifacts)
}

/// `/`-separated path of `path` relative to `root`.
pub(crate) fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
