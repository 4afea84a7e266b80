//! Read-only cardinality lookup

use std::collections::BTreeMap;

use super::counts::CardinalityCounts;

/// Source of field/value statistics
pub trait CardinalityLookup: Send + Sync {
    /// Counts for `field == value`, or `None` when the pair has no statistics
    fn get(&self, field: &str, value: &str) -> Option<CardinalityCounts>;
}

/// In-memory statistics keyed by field and value.
///
/// Several entries for one pair (one per shard range) are merged on lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticCardinalityLookup {
    entries: BTreeMap<(String, String), Vec<CardinalityCounts>>,
}

impl StaticCardinalityLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry; field names are upper-cased
    pub fn insert(&mut self, counts: CardinalityCounts) {
        let key = (counts.field.to_ascii_uppercase(), counts.value.clone());
        self.entries.entry(key).or_default().push(counts);
    }

    pub fn with(mut self, counts: CardinalityCounts) -> Self {
        self.insert(counts);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CardinalityLookup for StaticCardinalityLookup {
    fn get(&self, field: &str, value: &str) -> Option<CardinalityCounts> {
        let entries = self
            .entries
            .get(&(field.to_ascii_uppercase(), value.to_string()))?;
        let (first, rest) = entries.split_first()?;
        Some(rest.iter().fold(first.clone(), |acc, c| acc.merge(c)))
    }
}
