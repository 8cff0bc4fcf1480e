//! Controlled A/B comparison
//!
//! A comparison groups the samples of one metric by the value of one
//! experiment fact. It is only produced when the experiment fact is the only
//! fact that varies across the compared results; any other varying fact must
//! be pinned with [`ComparisonRequest::fact_eq`] or accepted with
//! [`ComparisonRequest::ignore`].
//!
//! Validation runs in a fixed order and stops at the first failure:
//!
//! 1. every equality-filter key (and the experiment fact) is a known fact
//! 2. equality filtering; results lacking a filter fact pass
//! 3. confound check over every remaining fact (absent counts as a value)
//! 4. non-empty rows, then metric, then test name
//! 5. exactly one test reports the metric
//! 6. numeric metric values and scalar experiment values
//!
//! ```rust,no_run
//! use falba::compare::{compare, ComparisonRequest};
//! use falba::{Database, Pipeline};
//!
//! let db = Database::load("./results", &Pipeline::builtin()?)?;
//! let request = ComparisonRequest::new("os_release_variant_id", "fio_randread_read_iops")
//!     .fact_eq("kernel_version", "6.1")
//!     .ignore("nixos_system");
//! println!("{}", compare(&db, &request)?.render());
//! # Ok::<(), falba::Error>(())
//! ```

mod histogram;
mod stats;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};

use serde::Serialize;

use crate::db::{Database, FlatRow};
use crate::model::Value;
use crate::{Error, Result};

pub use histogram::{Histogram, GLYPHS};
pub use stats::GroupStats;

/// Label used for results lacking a fact.
pub const NONE_LABEL: &str = "<none>";

/// What to compare and under which constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    experiment_fact: String,
    metric: String,
    test: Option<String>,
    fact_eq: BTreeMap<String, Value>,
    ignore: BTreeSet<String>,
    plot_width: Option<usize>,
}

impl ComparisonRequest {
    /// Compare `metric` across the values of `experiment_fact`.
    #[must_use]
    pub fn new(experiment_fact: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            experiment_fact: experiment_fact.into(),
            metric: metric.into(),
            test: None,
            fact_eq: BTreeMap::new(),
            ignore: BTreeSet::new(),
            plot_width: None,
        }
    }

    /// Only consider results of this test.
    #[must_use]
    pub fn test(mut self, test: impl Into<String>) -> Self {
        self.test = Some(test.into());
        self
    }

    /// Require `fact` to equal `value` on results that have it.
    #[must_use]
    pub fn fact_eq(mut self, fact: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fact_eq.insert(fact.into(), value.into());
        self
    }

    /// Accept variation in `fact`.
    #[must_use]
    pub fn ignore(mut self, fact: impl Into<String>) -> Self {
        self.ignore.insert(fact.into());
        self
    }

    /// Histogram buckets (defaults to the store's `plot_width`).
    #[must_use]
    pub const fn plot_width(mut self, width: usize) -> Self {
        self.plot_width = Some(width);
        self
    }

    /// The experiment fact.
    #[must_use]
    pub fn experiment_fact(&self) -> &str {
        &self.experiment_fact
    }

    /// The target metric.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }
}

/// Summary of the samples sharing one experiment-fact value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Experiment-fact value (`None` for results lacking the fact)
    pub key: Option<Value>,
    /// Count, mean, min, max
    pub stats: GroupStats,
    /// Samples per histogram bucket
    pub bucket_counts: Vec<usize>,
}

impl GroupSummary {
    /// Display label of the group key.
    #[must_use]
    pub fn label(&self) -> String {
        self.key
            .as_ref()
            .map_or_else(|| NONE_LABEL.to_string(), ToString::to_string)
    }
}

/// Validated comparison result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Fact the groups are keyed on
    pub experiment_fact: String,
    /// Metric compared
    pub metric: String,
    /// The single test reporting the metric
    pub test_name: String,
    /// Metric unit, if any sample carried one
    pub unit: Option<String>,
    /// Groups in ascending key order
    pub groups: Vec<GroupSummary>,
    /// Shared histogram scale
    pub histogram: Histogram,
}

/// Run a comparison.
///
/// # Errors
///
/// Returns one of the validation errors ([`Error::is_validation`]) or
/// [`Error::UnknownFact`]; the database is left untouched either way.
pub fn compare(db: &Database, request: &ComparisonRequest) -> Result<Comparison> {
    let known = db.unique_fact_names();
    let unknown_fact = |fact: &str| Error::UnknownFact {
        fact: fact.to_string(),
        available: known.iter().cloned().collect(),
    };

    for key in request.fact_eq.keys() {
        if !known.contains(key) {
            return Err(unknown_fact(key));
        }
    }
    if !known.contains(&request.experiment_fact) {
        return Err(unknown_fact(&request.experiment_fact));
    }

    let table = db.flat_table();
    let rows: Vec<&FlatRow> = table
        .rows()
        .iter()
        .filter(|row| {
            request
                .fact_eq
                .iter()
                .all(|(k, v)| row.fact(k).map_or(true, |actual| actual.matches(v)))
        })
        .collect();
    tracing::debug!(rows = rows.len(), "applied fact equality filters");

    check_confounds(db, request, &rows)?;

    if rows.is_empty() {
        return Err(Error::NoMatchingResults);
    }

    let metric_rows: Vec<&FlatRow> = rows
        .iter()
        .copied()
        .filter(|row| row.metric == request.metric)
        .collect();
    if metric_rows.is_empty() {
        return Err(Error::UnknownMetric {
            metric: request.metric.clone(),
            available: distinct(rows.iter().map(|r| r.metric.as_str())),
        });
    }

    let metric_rows = match &request.test {
        Some(test) => {
            let filtered: Vec<&FlatRow> = metric_rows
                .iter()
                .copied()
                .filter(|row| &row.test_name == test)
                .collect();
            if filtered.is_empty() {
                return Err(Error::UnknownTest {
                    test: test.clone(),
                    available: distinct(metric_rows.iter().map(|r| r.test_name.as_str())),
                });
            }
            filtered
        }
        None => metric_rows,
    };

    let mut tests = distinct(metric_rows.iter().map(|r| r.test_name.as_str()));
    if tests.len() != 1 {
        return Err(Error::MultipleTests { tests });
    }
    let test_name = tests.swap_remove(0);

    let mut groups: BTreeMap<Option<Value>, Vec<f64>> = BTreeMap::new();
    let mut unit = None;
    for row in &metric_rows {
        let Some(sample) = row.value.as_f64() else {
            return Err(Error::Unsupported(format!(
                "metric {} has {} values; only integer and float metrics can be compared",
                request.metric,
                row.value.type_name()
            )));
        };
        let key = row.fact(&request.experiment_fact).cloned();
        if let Some(k) = key.as_ref().filter(|k| !k.is_scalar()) {
            return Err(Error::Unsupported(format!(
                "experiment fact {} has {} values; only scalar facts can be compared",
                request.experiment_fact,
                k.type_name()
            )));
        }
        if unit.is_none() {
            unit.clone_from(&row.unit);
        }
        groups.entry(key).or_default().push(sample);
    }

    let width = request.plot_width.unwrap_or(db.config().plot_width);
    let global_max = groups
        .values()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let histogram = Histogram::new(global_max, width);

    let mut summaries = Vec::with_capacity(groups.len());
    for (key, samples) in groups {
        let Some(stats) = GroupStats::from_samples(&samples) else {
            continue;
        };
        summaries.push(GroupSummary {
            key,
            stats,
            bucket_counts: histogram.bucket_counts(&samples),
        });
    }
    let max_bucket_count = summaries
        .iter()
        .flat_map(|g| g.bucket_counts.iter().copied())
        .max()
        .unwrap_or(0);
    let histogram = histogram.with_max_bucket_count(max_bucket_count);

    tracing::info!(
        experiment_fact = %request.experiment_fact,
        metric = %request.metric,
        test = %test_name,
        groups = summaries.len(),
        samples = metric_rows.len(),
        "compared"
    );

    Ok(Comparison {
        experiment_fact: request.experiment_fact.clone(),
        metric: request.metric.clone(),
        test_name,
        unit,
        groups: summaries,
        histogram,
    })
}

/// Fail if any fact outside the experiment fact, the filter keys and the
/// ignored set takes more than one value (absence included) across `rows`.
fn check_confounds(db: &Database, request: &ComparisonRequest, rows: &[&FlatRow]) -> Result<()> {
    let ignored = |name: &str| {
        name == request.experiment_fact
            || request.fact_eq.contains_key(name)
            || request.ignore.contains(name)
            || db.config().ignored_facts.iter().any(|f| f == name)
    };

    for fact in db.unique_fact_names() {
        if ignored(fact) {
            continue;
        }
        let values: BTreeSet<Option<&Value>> = rows.iter().map(|row| row.fact(fact)).collect();
        if values.len() > 1 {
            return Err(Error::UnresolvedConfound {
                fact: fact.clone(),
                values: values
                    .into_iter()
                    .map(|v| v.map_or_else(|| NONE_LABEL.to_string(), ToString::to_string))
                    .collect(),
            });
        }
    }
    Ok(())
}

fn distinct<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Comparison {
    /// Text summary: header, one line per group, histogram axis.
    #[must_use]
    pub fn render(&self) -> String {
        let labels: Vec<String> = self.groups.iter().map(GroupSummary::label).collect();
        let label_width = labels
            .iter()
            .map(|l| l.chars().count())
            .chain(std::iter::once(self.experiment_fact.chars().count()))
            .max()
            .unwrap_or(0);
        let unit = self.unit.as_deref().unwrap_or("");

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} [{}] by {} (test {})",
            self.metric,
            if unit.is_empty() { "-" } else { unit },
            self.experiment_fact,
            self.test_name
        );
        let _ = writeln!(
            out,
            "{:<label_width$} {:>6} {:>12} {:>12} {:>12}",
            self.experiment_fact, "count", "mean", "min", "max"
        );

        let mut prefix_width = 0;
        for (group, label) in self.groups.iter().zip(&labels) {
            let prefix = format!(
                "{:<label_width$} {:>6} {:>12} {:>12} {:>12} ",
                label,
                group.stats.count,
                format_number(group.stats.mean),
                format_number(group.stats.min),
                format_number(group.stats.max),
            );
            prefix_width = prefix.chars().count();
            let _ = writeln!(
                out,
                "{prefix}|{}|",
                self.histogram.render(&group.bucket_counts)
            );
        }

        let max_label = format!("{}{unit}", format_number(self.histogram.max_value()));
        let gap = self
            .histogram
            .width()
            .saturating_sub(1 + max_label.chars().count());
        let _ = write!(
            out,
            "{:prefix_width$} 0{:gap$}{max_label}",
            "", ""
        );
        out
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Compact human formatting: integers without decimals, otherwise 3 places.
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}
