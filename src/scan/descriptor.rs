//! Scan descriptor types

use std::collections::{BTreeMap, BTreeSet};

use super::range::RowRange;

/// One named, prioritized iterator setting attached to a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSetting {
    pub name: String,
    pub priority: u32,
    pub options: BTreeMap<String, String>,
}

impl ScanSetting {
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// The unit of work handed to a scan session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryData {
    pub query: String,
    pub settings: Vec<ScanSetting>,
    pub ranges: BTreeSet<RowRange>,
}

impl QueryData {
    pub fn new(
        query: impl Into<String>,
        settings: Vec<ScanSetting>,
        ranges: impl IntoIterator<Item = RowRange>,
    ) -> Self {
        Self {
            query: query.into(),
            settings,
            ranges: ranges.into_iter().collect(),
        }
    }

    /// True if `other` can be scanned in the same session as `self`
    pub fn shares_settings(&self, other: &QueryData) -> bool {
        self.query == other.query && self.settings == other.settings
    }

    /// Take over the ranges of `other`
    pub fn absorb(&mut self, other: QueryData) {
        self.ranges.extend(other.ranges);
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Look up a setting by name
    pub fn setting(&self, name: &str) -> Option<&ScanSetting> {
        self.settings.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(query: &str, rows: &[&str]) -> QueryData {
        QueryData::new(
            query,
            vec![ScanSetting::new("query", 40).with_option("query", query)],
            rows.iter().map(|r| RowRange::row(*r)),
        )
    }

    #[test]
    fn test_shares_settings_requires_same_query() {
        let a = data("FOO == 'a'", &["20240101_0"]);
        let b = data("FOO == 'a'", &["20240101_1"]);
        let c = data("FOO == 'b'", &["20240101_1"]);
        assert!(a.shares_settings(&b));
        assert!(!a.shares_settings(&c));
    }

    #[test]
    fn test_absorb_unions_ranges() {
        let mut a = data("FOO == 'a'", &["20240101_0", "20240101_1"]);
        a.absorb(data("FOO == 'a'", &["20240101_1", "20240101_2"]));
        assert_eq!(a.range_count(), 3);
    }
}
