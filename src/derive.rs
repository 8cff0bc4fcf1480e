//! Derivers - facts computed from other facts after enrichment
//!
//! Derivers run once per result, after every enricher, and see the facts the
//! enrichers produced. Their output goes through the same provenance checks
//! as enricher output.

use std::collections::BTreeMap;

use crate::enrich::{Enrichment, EnrichmentError};
use crate::model::{Fact, Value};

/// Computes extra facts or metrics from a result's enriched facts.
pub trait Deriver: Send + Sync {
    /// Stable name, used as the provenance producer ID.
    fn name(&self) -> &str;

    /// Derive from the facts produced so far.
    ///
    /// # Errors
    ///
    /// Returns error if an input fact is present but unusable
    fn derive(&self, facts: &BTreeMap<String, Fact>) -> Result<Enrichment, EnrichmentError>;
}

fn cmdline(facts: &BTreeMap<String, Fact>) -> Option<&str> {
    facts.get("cmdline").and_then(|f| f.value().as_str())
}

/// `asi_on`: whether the kernel command line enables ASI.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsiOn;

impl Deriver for AsiOn {
    fn name(&self) -> &str {
        "asi_on"
    }

    fn derive(&self, facts: &BTreeMap<String, Fact>) -> Result<Enrichment, EnrichmentError> {
        let Some(cmdline) = cmdline(facts) else {
            return Ok(Enrichment::none());
        };
        let on = cmdline.contains("mitigations=auto,nosmt")
            || cmdline.contains("nosmt,mitigations=auto");
        Ok(Enrichment::facts(vec![Fact::new("asi_on", on)]))
    }
}

/// `retbleed_mitigation`: effective RETBleed mitigation from the command line
/// and SMT state.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetbleedMitigation;

impl RetbleedMitigation {
    fn classify(cmdline: &str, smp_active: bool) -> &'static str {
        let smt_dependent = if smp_active { "stibp" } else { "unret" };
        if cmdline.contains("retbleed=off") {
            "off"
        } else if cmdline.contains("retbleed=auto,nosmt") {
            smt_dependent
        } else if cmdline.contains("retbleed=unret,nosmt") {
            "stibp"
        } else if cmdline.contains("retbleed=ibpb") {
            "ibpb"
        } else if cmdline.contains("retbleed=unret") {
            smt_dependent
        } else {
            "unknown"
        }
    }
}

impl Deriver for RetbleedMitigation {
    fn name(&self) -> &str {
        "retbleed_mitigation"
    }

    fn derive(&self, facts: &BTreeMap<String, Fact>) -> Result<Enrichment, EnrichmentError> {
        let Some(cmdline) = cmdline(facts) else {
            return Ok(Enrichment::none());
        };
        let smp_active = match facts.get("lscpu_smp_active").map(Fact::value) {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                tracing::debug!(
                    kind = other.type_name(),
                    "lscpu_smp_active is not a boolean, assuming SMT inactive"
                );
                false
            }
        };
        let mitigation = Self::classify(cmdline, smp_active);
        tracing::debug!(cmdline, smp_active, mitigation, "derived retbleed mitigation");
        Ok(Enrichment::facts(vec![Fact::new(
            "retbleed_mitigation",
            mitigation,
        )]))
    }
}

/// The built-in derivers, in registration order.
#[must_use]
pub fn builtin_derivers() -> Vec<Box<dyn Deriver>> {
    vec![Box::new(AsiOn), Box::new(RetbleedMitigation)]
}
