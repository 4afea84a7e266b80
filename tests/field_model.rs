//! Field model remapping and reverse aliasing

use proptest::prelude::*;

use shardquery::model::FieldModel;

fn model() -> FieldModel {
    FieldModel::new()
        .with_mapping("NAME", "FIRST_NAME")
        .with_mapping("NAME", "LAST_NAME")
        .with_mapping("COLOR", "HUE")
        .with_unevaluated("BODY")
}

// =============================================================================
// FORWARD
// =============================================================================

proptest! {
    /// remap output always contains the upper-cased input
    #[test]
    fn remap_is_monotonic(fields in prop::collection::vec("[a-zA-Z_]{1,8}", 0..8)) {
        let out = model().remap(fields.iter().map(String::as_str));
        for field in &fields {
            prop_assert!(out.contains(&field.to_ascii_uppercase()));
        }
    }
}

#[test]
fn test_remap_unions_expansions() {
    let out = model().remap(["name", "size"]);
    let out: Vec<&str> = out.iter().map(String::as_str).collect();
    assert_eq!(out, vec!["FIRST_NAME", "LAST_NAME", "NAME", "SIZE"]);
}

#[test]
fn test_remap_equation_keeps_suffix() {
    let out = model().remap_equation(["COLOR=red"]);
    let out: Vec<&str> = out.iter().map(String::as_str).collect();
    assert_eq!(out, vec!["COLOR=red", "HUE=red"]);
}

// =============================================================================
// REVERSE
// =============================================================================

#[test]
fn test_alias_reverse_hit_and_miss() {
    let model = model();
    assert_eq!(model.alias_reverse("HUE"), "COLOR");
    assert_eq!(model.alias_reverse("WEIGHT"), "WEIGHT");
}

#[test]
fn test_alias_reverse_keeps_group_suffix() {
    let model = model();
    assert_eq!(model.alias_reverse("HUE.1.2"), "COLOR.1.2");
    assert_eq!(model.alias_reverse("WEIGHT.1"), "WEIGHT.1");
}

#[test]
fn test_alias_reverse_original_count() {
    let model = model();
    assert_eq!(model.alias_reverse("HUE_ORIGINAL_COUNT"), "COLOR.ORIGINAL_COUNT");
    assert_eq!(model.alias_reverse("HUE.ORIGINAL_COUNT"), "COLOR.ORIGINAL_COUNT");
    assert_eq!(model.alias_reverse("WEIGHT_ORIGINAL_COUNT"), "WEIGHT.ORIGINAL_COUNT");
}

#[test]
fn test_unevaluated_fields() {
    let model = model();
    assert!(model.is_unevaluated("body"));
    assert!(!model.is_unevaluated("HUE"));
}
