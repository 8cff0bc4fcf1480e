//! `BenchResult` - one benchmark run with its extracted facts and metrics

use std::collections::BTreeMap;

use super::{Artifact, Fact, Metric, Provenance, Value};
use crate::{Error, Result};

/// Split a result directory name into `(test_name, result_id)`.
///
/// The split happens on the last colon, so test names may themselves
/// contain colons.
///
/// # Errors
///
/// Returns [`Error::MalformedResultName`] if there is no colon or either half
/// is empty.
pub fn parse_result_dirname(dirname: &str) -> Result<(String, String)> {
    match dirname.rsplit_once(':') {
        Some((test_name, result_id)) if !test_name.is_empty() && !result_id.is_empty() => {
            Ok((test_name.to_string(), result_id.to_string()))
        }
        _ => Err(Error::MalformedResultName(dirname.to_string())),
    }
}

/// One benchmark run.
///
/// Constructed in a single pass by the
/// [`ResultBuilder`](crate::builder::ResultBuilder) and immutable afterwards.
#[derive(Debug, Clone)]
pub struct BenchResult {
    test_name: String,
    result_id: String,
    artifacts: BTreeMap<String, Artifact>,
    facts: BTreeMap<String, Fact>,
    metrics: Vec<Metric>,
    provenance: Provenance,
}

impl BenchResult {
    pub(crate) const fn from_parts(
        test_name: String,
        result_id: String,
        artifacts: BTreeMap<String, Artifact>,
        facts: BTreeMap<String, Fact>,
        metrics: Vec<Metric>,
        provenance: Provenance,
    ) -> Self {
        Self {
            test_name,
            result_id,
            artifacts,
            facts,
            metrics,
            provenance,
        }
    }

    /// Get the test name.
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Get the result ID.
    #[must_use]
    pub fn result_id(&self) -> &str {
        &self.result_id
    }

    /// Directory name of the result (`test_name:result_id`).
    #[must_use]
    pub fn dirname(&self) -> String {
        format!("{}:{}", self.test_name, self.result_id)
    }

    /// Artifacts keyed by path relative to the artifacts root.
    #[must_use]
    pub const fn artifacts(&self) -> &BTreeMap<String, Artifact> {
        &self.artifacts
    }

    /// Facts keyed by name.
    #[must_use]
    pub const fn facts(&self) -> &BTreeMap<String, Fact> {
        &self.facts
    }

    /// Look up a single fact.
    #[must_use]
    pub fn fact(&self, name: &str) -> Option<&Fact> {
        self.facts.get(name)
    }

    /// Metric samples in production order.
    #[must_use]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Which producer first emitted each attribute name.
    #[must_use]
    pub const fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Fact values keyed by name.
    #[must_use]
    pub fn fact_values(&self) -> BTreeMap<String, Value> {
        self.facts
            .iter()
            .map(|(name, fact)| (name.clone(), fact.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_dirname() {
        let (test, id) = parse_result_dirname("nixos-asi-benchmarks:836d59863d4a").unwrap();
        assert_eq!(test, "nixos-asi-benchmarks");
        assert_eq!(id, "836d59863d4a");
    }

    #[test]
    fn test_parse_result_dirname_splits_on_last_colon() {
        let (test, id) = parse_result_dirname("fio:randread:abc").unwrap();
        assert_eq!(test, "fio:randread");
        assert_eq!(id, "abc");
    }

    #[test]
    fn test_parse_result_dirname_rejects_malformed() {
        for name in ["no-colon", ":abc", "test:", ""] {
            assert!(
                matches!(parse_result_dirname(name), Err(Error::MalformedResultName(_))),
                "{name:?} should be rejected"
            );
        }
    }
}
