//! Tabular projections of a [`Database`](super::Database)
//!
//! Both tables share a fixed prefix of columns plus one column per known fact
//! name. The fact-column schema is computed once, when the table is built, and
//! never changes afterwards.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{BenchResult, Value};

/// One row per result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    /// Result ID
    pub result_id: String,
    /// Test name
    pub test_name: String,
    /// Fact values present on this result
    pub facts: BTreeMap<String, Value>,
}

impl ResultRow {
    /// Value of a fact column, `None` if the result lacks it.
    #[must_use]
    pub fn fact(&self, name: &str) -> Option<&Value> {
        self.facts.get(name)
    }
}

/// One row per (result, metric sample).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatRow {
    /// Result ID
    pub result_id: String,
    /// Test name
    pub test_name: String,
    /// Metric name
    pub metric: String,
    /// Metric sample value
    pub value: Value,
    /// Metric unit
    pub unit: Option<String>,
    /// The owning result's fact values, broadcast to every metric row
    pub facts: BTreeMap<String, Value>,
}

impl FlatRow {
    /// Value of a fact column, `None` if the result lacks it.
    #[must_use]
    pub fn fact(&self, name: &str) -> Option<&Value> {
        self.facts.get(name)
    }
}

/// Results projection: `result_id`, `test_name`, one column per fact.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsTable {
    fact_names: Vec<String>,
    rows: Vec<ResultRow>,
}

impl ResultsTable {
    pub(crate) fn build(fact_names: Vec<String>, results: &[BenchResult]) -> Self {
        let rows = results
            .iter()
            .map(|r| ResultRow {
                result_id: r.result_id().to_string(),
                test_name: r.test_name().to_string(),
                facts: r.fact_values(),
            })
            .collect();
        Self { fact_names, rows }
    }

    /// Fact column names, sorted.
    #[must_use]
    pub fn fact_names(&self) -> &[String] {
        &self.fact_names
    }

    /// Rows in result dirname order.
    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Flat projection: `result_id`, `test_name`, `metric`, `value`, `unit`, one
/// column per fact.
///
/// This is the only input to the comparator.
#[derive(Debug, Clone, Serialize)]
pub struct FlatTable {
    fact_names: Vec<String>,
    rows: Vec<FlatRow>,
}

impl FlatTable {
    pub(crate) fn build(fact_names: Vec<String>, results: &[BenchResult]) -> Self {
        let mut rows = Vec::with_capacity(results.iter().map(|r| r.metrics().len()).sum());
        for result in results {
            let facts = result.fact_values();
            for metric in result.metrics() {
                rows.push(FlatRow {
                    result_id: result.result_id().to_string(),
                    test_name: result.test_name().to_string(),
                    metric: metric.name().to_string(),
                    value: metric.value().clone(),
                    unit: metric.unit().map(str::to_string),
                    facts: facts.clone(),
                });
            }
        }
        Self { fact_names, rows }
    }

    /// Fact column names, sorted.
    #[must_use]
    pub fn fact_names(&self) -> &[String] {
        &self.fact_names
    }

    /// Rows in result dirname order, metrics in production order.
    #[must_use]
    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
