//! Overflow marker round trips through the query text surface
//!
//! A marker is printed in its legacy `((_List_ = true) && (...))` form,
//! parsed back, and decoded into a typed marker again.

use std::collections::BTreeSet;

use shardquery::config::MalformedRangePolicy;
use shardquery::expression::{decode_legacy_markers, parse, ExpressionNode, Marker};
use shardquery::observability::{Event, Logger};
use shardquery::overflow::{OverflowMarker, OverflowPayload, RangeLiteral};

fn round_trip(marker: OverflowMarker, policy: MalformedRangePolicy) -> OverflowMarker {
    let text = ExpressionNode::Marker(Marker::overflow(marker)).to_string();
    let logger = Logger::memory();
    let decoded = decode_legacy_markers(parse(&text).unwrap(), &logger, policy);
    decoded
        .as_marker()
        .and_then(Marker::overflow_marker)
        .cloned()
        .unwrap_or_else(|| panic!("no overflow marker in {}", text))
}

fn values(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// VALUE SETS AND REFERENCES
// =============================================================================

#[test]
fn test_value_set_round_trip() {
    let marker = OverflowMarker::from_values("FOO", values(&["b", "a", "it's"])).unwrap();
    let decoded = round_trip(marker.clone(), MalformedRangePolicy::Fail);

    assert_eq!(decoded.id(), marker.id());
    assert_eq!(decoded.field(), "FOO");
    assert_eq!(decoded.payload(), marker.payload());
}

#[test]
fn test_fst_reference_round_trip() {
    let marker = OverflowMarker::from_fst_uri("FOO", "hdfs://fst/q1/FOO.fst").unwrap();
    let decoded = round_trip(marker.clone(), MalformedRangePolicy::Fail);
    assert_eq!(decoded, marker);
}

// =============================================================================
// RANGES
// =============================================================================

/// Test: overlapping input ranges come back sorted, disjoint, and covering
/// the same rows.
#[test]
fn test_range_round_trip_is_merged() {
    let input = vec![
        RangeLiteral::inclusive("m", "p"),
        RangeLiteral::new("a", true, "d", false),
        RangeLiteral::inclusive("c", "f"),
        RangeLiteral::point("x"),
    ];
    let marker = OverflowMarker::from_ranges("FOO", input.clone()).unwrap();
    let decoded = round_trip(marker, MalformedRangePolicy::Fail);

    let ranges = match decoded.payload() {
        OverflowPayload::MergedRanges { ranges } => ranges.clone(),
        other => panic!("expected ranges, got {:?}", other),
    };
    assert_eq!(
        ranges,
        vec![
            RangeLiteral::inclusive("a", "f"),
            RangeLiteral::inclusive("m", "p"),
            RangeLiteral::point("x"),
        ]
    );
    for pair in ranges.windows(2) {
        assert!(pair[0].upper() < pair[1].lower());
    }

    for row in ["a", "b", "d", "e", "f", "g", "m", "n", "p", "q", "x", "y"] {
        let in_input = input.iter().any(|r| r.contains(row));
        let in_output = ranges.iter().any(|r| r.contains(row));
        assert_eq!(in_input, in_output, "row {}", row);
    }
}

/// Test: values and ranges together become one merged range list.
#[test]
fn test_values_and_ranges_union() {
    let marker = OverflowMarker::from_values_and_ranges(
        "FOO",
        values(&["b", "z"]),
        vec![RangeLiteral::inclusive("a", "c")],
    )
    .unwrap();
    assert_eq!(
        marker.payload(),
        &OverflowPayload::MergedRanges {
            ranges: vec![RangeLiteral::inclusive("a", "c"), RangeLiteral::point("z")]
        }
    );
}

// =============================================================================
// MALFORMED PAYLOADS
// =============================================================================

const MALFORMED: &str = r#"((_List_ = true) && ((id = 'q1') && (field = 'FOO') && (params = '{"ranges":[["[a","c]"],["b","d"]]}')))"#;

#[test]
fn test_malformed_range_fails_marker_by_default() {
    let logger = Logger::memory();
    let node = decode_legacy_markers(parse(MALFORMED).unwrap(), &logger, MalformedRangePolicy::Fail);
    assert!(matches!(node, ExpressionNode::And(_)));
    assert!(logger.has_event(Event::MarkerDecodeFailed));
}

#[test]
fn test_malformed_range_dropped_under_drop_policy() {
    let logger = Logger::memory();
    let node = decode_legacy_markers(parse(MALFORMED).unwrap(), &logger, MalformedRangePolicy::Drop);
    let marker = node.as_marker().and_then(Marker::overflow_marker).unwrap();
    assert_eq!(
        marker.payload(),
        &OverflowPayload::MergedRanges {
            ranges: vec![RangeLiteral::inclusive("a", "c")]
        }
    );
    assert!(logger.has_event(Event::RangeLiteralDropped));
}
