//! Range merge properties

use proptest::prelude::*;

use shardquery::overflow::{merge_ranges, OverflowMarker, OverflowPayload, RangeLiteral};

fn range_strategy() -> impl Strategy<Value = RangeLiteral> {
    prop_oneof![
        "[a-f]{1,2}".prop_map(RangeLiteral::point),
        ("[a-f]{1,2}", "[a-f]{1,2}", any::<bool>(), any::<bool>()).prop_filter_map(
            "lower must sort below upper",
            |(a, b, li, ui)| {
                if a < b {
                    Some(RangeLiteral::new(a, li, b, ui))
                } else {
                    None
                }
            }
        ),
    ]
}

proptest! {
    #[test]
    fn merge_is_idempotent(ranges in prop::collection::vec(range_strategy(), 0..12)) {
        let once = merge_ranges(ranges);
        let twice = merge_ranges(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_preserves_coverage(
        ranges in prop::collection::vec(range_strategy(), 1..12),
        probe in "[a-f]{1,3}",
    ) {
        let merged = merge_ranges(ranges.clone());
        let before = ranges.iter().any(|r| r.contains(&probe));
        let after = merged.iter().any(|r| r.contains(&probe));
        prop_assert_eq!(before, after);
    }

    #[test]
    fn merged_output_is_sorted_and_disjoint(
        ranges in prop::collection::vec(range_strategy(), 1..12),
    ) {
        let merged = merge_ranges(ranges);
        for pair in merged.windows(2) {
            prop_assert!(pair[0].upper() <= pair[1].lower());
        }
    }
}

#[test]
fn test_single_point_encodes_as_one_literal() {
    let merged = merge_ranges(vec![RangeLiteral::inclusive("a", "a")]);
    assert_eq!(merged.len(), 1);

    let encoded = merged[0].encode();
    assert_eq!(encoded, vec!["a".to_string()]);
    assert!(!encoded[0].contains(|c| "[]()".contains(c)));
}

#[test]
fn test_duplicate_points_collapse() {
    let marker = OverflowMarker::from_ranges(
        "FOO",
        vec![RangeLiteral::point("a"), RangeLiteral::point("a")],
    )
    .unwrap();
    assert_eq!(
        marker.payload(),
        &OverflowPayload::MergedRanges {
            ranges: vec![RangeLiteral::point("a")]
        }
    );
}

#[test]
fn test_exclusive_ends_meeting_stay_apart() {
    let merged = merge_ranges(vec![
        RangeLiteral::new("a", true, "c", false),
        RangeLiteral::new("c", false, "e", true),
    ]);
    assert_eq!(merged.len(), 2);
}
