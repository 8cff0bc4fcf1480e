//! Fact and Metric - the two kinds of attribute extracted from artifacts

use serde::{Deserialize, Serialize};

use super::Value;

/// Fact represents an immutable property of the system or the test.
///
/// A result holds at most one fact per name, which makes facts usable as
/// grouping and filter keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    name: String,
    value: Value,
    unit: Option<String>,
}

impl Fact {
    /// Create a new fact without a unit.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: None,
        }
    }

    /// Attach a unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Get the fact name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the fact value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Get the unit, if any.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}

/// Metric represents one measured sample.
///
/// Unlike facts, several metrics in a result may share a name (repeated
/// measurements); they are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    name: String,
    value: Value,
    unit: Option<String>,
}

impl Metric {
    /// Create a new metric sample without a unit.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: None,
        }
    }

    /// Attach a unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the sampled value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Get the unit, if any.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_new() {
        let fact = Fact::new("kernel_version", "6.1");
        assert_eq!(fact.name(), "kernel_version");
        assert_eq!(fact.value(), &Value::from("6.1"));
        assert!(fact.unit().is_none());
    }

    #[test]
    fn test_metric_with_unit() {
        let metric = Metric::new("compile-kernel_elapsed", 1_200_i64).with_unit("ns");
        assert_eq!(metric.unit(), Some("ns"));
        assert_eq!(metric.value().as_f64(), Some(1200.0));
    }
}
