//! Query model: field aliasing
//!
//! Forward maps a query-facing alias to one or more on-disk fields; reverse
//! maps an on-disk field back to at most one alias. The two need not be
//! inverses. Unevaluated fields exist only in the index.
//!
//! All names are upper case.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Reserved suffix for per-field original value counts
pub const ORIGINAL_COUNT_SUFFIX: &str = "ORIGINAL_COUNT";

/// Field alias mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldModel {
    #[serde(default)]
    forward: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    reverse: BTreeMap<String, String>,
    #[serde(default)]
    unevaluated: BTreeSet<String>,
}

impl FieldModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `alias -> field` to the forward map and `field -> alias` to the
    /// reverse map, replacing any earlier reverse alias for `field`
    pub fn with_mapping(mut self, alias: &str, field: &str) -> Self {
        self.add_forward(alias, field);
        self.reverse
            .insert(field.to_ascii_uppercase(), alias.to_ascii_uppercase());
        self
    }

    pub fn with_unevaluated(mut self, field: &str) -> Self {
        self.unevaluated.insert(field.to_ascii_uppercase());
        self
    }

    pub fn add_forward(&mut self, alias: &str, field: &str) {
        self.forward
            .entry(alias.to_ascii_uppercase())
            .or_default()
            .insert(field.to_ascii_uppercase());
    }

    /// Upper-case every name, for models deserialized from configuration
    pub fn normalized(self) -> Self {
        let forward = self
            .forward
            .into_iter()
            .fold(BTreeMap::new(), |mut acc: BTreeMap<String, BTreeSet<String>>, (k, v)| {
                acc.entry(k.to_ascii_uppercase())
                    .or_default()
                    .extend(v.into_iter().map(|f| f.to_ascii_uppercase()));
                acc
            });
        let reverse = self
            .reverse
            .into_iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), v.to_ascii_uppercase()))
            .collect();
        let unevaluated = self
            .unevaluated
            .into_iter()
            .map(|f| f.to_ascii_uppercase())
            .collect();
        Self {
            forward,
            reverse,
            unevaluated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty() && self.unevaluated.is_empty()
    }

    /// On-disk fields for an alias
    pub fn forward_fields(&self, alias: &str) -> Option<&BTreeSet<String>> {
        self.forward.get(&alias.to_ascii_uppercase())
    }

    pub fn is_unevaluated(&self, field: &str) -> bool {
        self.unevaluated.contains(&field.to_ascii_uppercase())
    }

    /// Upper-cased input plus every forward expansion. Originals are kept.
    pub fn remap<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for field in fields {
            let field = field.to_ascii_uppercase();
            if let Some(mapped) = self.forward.get(&field) {
                out.extend(mapped.iter().cloned());
            }
            out.insert(field);
        }
        out
    }

    /// Like [`remap`](Self::remap) for `FIELD=value` entries: only the part
    /// before `=` is looked up, and `=value` is reattached to each expansion
    pub fn remap_equation<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for entry in fields {
            let (field, suffix) = match entry.find('=') {
                Some(idx) => entry.split_at(idx),
                None => (entry, ""),
            };
            let field = field.to_ascii_uppercase();
            if let Some(mapped) = self.forward.get(&field) {
                out.extend(mapped.iter().map(|m| format!("{}{}", m, suffix)));
            }
            out.insert(format!("{}{}", field, suffix));
        }
        out
    }

    /// Alias for an on-disk field name, or the name unchanged.
    ///
    /// A `.group` suffix is stripped before lookup and reattached on a hit.
    /// Original-count names (`FOO_ORIGINAL_COUNT`, `FOO.ORIGINAL_COUNT`)
    /// alias their base name; the result always uses the dotted suffix.
    pub fn alias_reverse(&self, name: &str) -> String {
        if let Some(base) = strip_original_count(name) {
            let aliased = self.alias_reverse(base);
            return format!("{}.{}", aliased, ORIGINAL_COUNT_SUFFIX);
        }

        let (base, group) = match name.find('.') {
            Some(idx) => name.split_at(idx),
            None => (name, ""),
        };

        match self.reverse.get(&base.to_ascii_uppercase()) {
            Some(alias) => format!("{}{}", alias, group),
            None => name.to_string(),
        }
    }
}

/// Base name of an original-count field, if `name` is one
fn strip_original_count(name: &str) -> Option<&str> {
    let rest = name.strip_suffix(ORIGINAL_COUNT_SUFFIX)?;
    let base = rest.strip_suffix('_').or_else(|| rest.strip_suffix('.'))?;
    if base.is_empty() {
        None
    } else {
        Some(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> FieldModel {
        FieldModel::new()
            .with_mapping("NAME", "FIRST_NAME")
            .with_mapping("NAME", "LAST_NAME")
            .with_mapping("COLOR", "HUE")
            .with_unevaluated("BODY")
    }

    #[test]
    fn test_remap_keeps_originals() {
        let out = model().remap(["name", "OTHER"]);
        let expected: BTreeSet<String> = ["NAME", "FIRST_NAME", "LAST_NAME", "OTHER"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_remap_equation_reattaches_value() {
        let out = model().remap_equation(["COLOR=red", "SIZE=9"]);
        assert!(out.contains("COLOR=red"));
        assert!(out.contains("HUE=red"));
        assert!(out.contains("SIZE=9"));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_alias_reverse_hit_and_miss() {
        let m = model();
        assert_eq!(m.alias_reverse("HUE"), "COLOR");
        assert_eq!(m.alias_reverse("UNMAPPED"), "UNMAPPED");
    }

    #[test]
    fn test_alias_reverse_keeps_group() {
        let m = model();
        assert_eq!(m.alias_reverse("HUE.1.2"), "COLOR.1.2");
        assert_eq!(m.alias_reverse("UNMAPPED.3"), "UNMAPPED.3");
    }

    #[test]
    fn test_original_count_aliased() {
        let m = model();
        assert_eq!(m.alias_reverse("HUE_ORIGINAL_COUNT"), "COLOR.ORIGINAL_COUNT");
        assert_eq!(m.alias_reverse("HUE.ORIGINAL_COUNT"), "COLOR.ORIGINAL_COUNT");
    }

    #[test]
    fn test_original_count_unaliased_converts_separator() {
        let m = model();
        assert_eq!(m.alias_reverse("SIZE_ORIGINAL_COUNT"), "SIZE.ORIGINAL_COUNT");
    }

    #[test]
    fn test_bare_suffix_is_not_original_count() {
        assert_eq!(model().alias_reverse("ORIGINAL_COUNT"), "ORIGINAL_COUNT");
    }

    #[test]
    fn test_unevaluated() {
        let m = model();
        assert!(m.is_unevaluated("body"));
        assert!(!m.is_unevaluated("HUE"));
    }

    #[test]
    fn test_normalized_upper_cases() {
        let m: FieldModel = serde_json::from_str(
            r#"{"forward": {"name": ["first"]}, "reverse": {"first": "name"}, "unevaluated": ["body"]}"#,
        )
        .unwrap();
        let m = m.normalized();
        assert_eq!(m.alias_reverse("FIRST"), "NAME");
        assert!(m.forward_fields("NAME").unwrap().contains("FIRST"));
        assert!(m.is_unevaluated("BODY"));
    }
}
