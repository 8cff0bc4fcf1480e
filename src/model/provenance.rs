//! Provenance - which producer first emitted each attribute name

use rustc_hash::FxHashMap;

use crate::{Error, Result};

/// Kind of attribute a producer emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Single-valued fact
    Fact,
    /// Metric sample
    Metric,
}

/// First producer of an attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Producer {
    /// Enricher or deriver name
    pub producer: String,
    /// Whether the name was first seen as a fact or a metric
    pub kind: AttributeKind,
}

/// Attribute-name provenance for a single result.
///
/// Built by one [`ResultBuilder`](crate::builder::ResultBuilder) invocation
/// and frozen into the result it produced; never shared between results.
///
/// Collision rules:
/// - a fact whose name was already produced (as a fact or a metric) is a
///   [`Error::DuplicateAttribute`];
/// - a metric is only checked against fact names, so repeated metric samples
///   from any producer are accepted.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    producers: FxHashMap<String, Producer>,
}

impl Provenance {
    /// Create an empty provenance map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fact emitted by `producer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAttribute`] if the name was already produced.
    pub fn record_fact(&mut self, name: &str, producer: &str) -> Result<()> {
        if let Some(first) = self.producers.get(name) {
            return Err(Error::DuplicateAttribute {
                name: name.to_string(),
                first: first.producer.clone(),
                second: producer.to_string(),
            });
        }
        self.producers.insert(
            name.to_string(),
            Producer {
                producer: producer.to_string(),
                kind: AttributeKind::Fact,
            },
        );
        Ok(())
    }

    /// Record a metric sample emitted by `producer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAttribute`] if the name is already a fact.
    pub fn record_metric(&mut self, name: &str, producer: &str) -> Result<()> {
        match self.producers.get(name) {
            Some(first) if first.kind == AttributeKind::Fact => Err(Error::DuplicateAttribute {
                name: name.to_string(),
                first: first.producer.clone(),
                second: producer.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.producers.insert(
                    name.to_string(),
                    Producer {
                        producer: producer.to_string(),
                        kind: AttributeKind::Metric,
                    },
                );
                Ok(())
            }
        }
    }

    /// First producer of `name`, if any.
    #[must_use]
    pub fn producer_of(&self, name: &str) -> Option<&Producer> {
        self.producers.get(name)
    }

    /// Number of distinct attribute names recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}
