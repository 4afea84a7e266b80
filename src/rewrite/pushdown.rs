//! Large fielded-list pushdown
//!
//! Inside an OR, equality terms on one indexed field are grouped. A group
//! larger than `max_or_expansion_threshold` is replaced by a single
//! ExceededOr marker carrying the values; above
//! `max_or_expansion_fst_threshold` the values are externalized and the
//! marker carries only the reference. More than `max_or_range_threshold`
//! bounded ranges on one field are merged, together with that field's
//! equality values, into one range marker.
//!
//! The marker takes the position of the group's first member. An OR left
//! with a single child is replaced by that child.
//!
//! Without an externalizer, lists above the FST threshold stay in-line
//! value markers and an `EXTERNALIZER_MISSING` warning is logged.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::context::QueryContext;
use crate::expression::{ExpressionNode, Marker, MarkerKind, MarkerPayload, Operator};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::overflow::{OverflowMarker, RangeLiteral};

use super::{RewriteResult, RewriteVisitor, TermExternalizer};

#[derive(Debug, Default)]
struct FieldGroup {
    value_members: Vec<usize>,
    values: BTreeSet<String>,
    range_members: Vec<usize>,
    ranges: Vec<RangeLiteral>,
}

/// Pushes oversized OR lists into overflow markers
pub struct LargeFieldedListPushdown {
    config: Arc<EngineConfig>,
    externalizer: Option<Arc<dyn TermExternalizer>>,
    logger: Logger,
    metrics: Arc<MetricsRegistry>,
}

impl LargeFieldedListPushdown {
    pub fn new(ctx: &QueryContext) -> Self {
        Self {
            config: ctx.config.clone(),
            externalizer: None,
            logger: ctx.logger.clone(),
            metrics: ctx.metrics.clone(),
        }
    }

    /// Use `externalizer` for lists above the FST threshold
    pub fn with_externalizer(mut self, externalizer: Arc<dyn TermExternalizer>) -> Self {
        self.externalizer = Some(externalizer);
        self
    }

    fn push(&self, node: ExpressionNode) -> RewriteResult<ExpressionNode> {
        match node {
            ExpressionNode::And(children) => Ok(ExpressionNode::And(self.push_all(children)?)),
            ExpressionNode::Not(children) => Ok(ExpressionNode::Not(self.push_all(children)?)),
            ExpressionNode::Or(children) => {
                let children = self.push_all(children)?;
                self.push_or(children)
            }
            ExpressionNode::Marker(marker) => match marker.into_parts() {
                (kind, MarkerPayload::Source(source)) => {
                    Ok(ExpressionNode::marker(kind, self.push(*source)?))
                }
                (_, MarkerPayload::Overflow(overflow)) => {
                    Ok(ExpressionNode::Marker(Marker::overflow(overflow)))
                }
            },
            leaf @ (ExpressionNode::Term(_)
            | ExpressionNode::Function(_)
            | ExpressionNode::Phrase(_)
            | ExpressionNode::Within(_)) => Ok(leaf),
        }
    }

    fn push_all(&self, children: Vec<ExpressionNode>) -> RewriteResult<Vec<ExpressionNode>> {
        children.into_iter().map(|c| self.push(c)).collect()
    }

    fn push_or(&self, children: Vec<ExpressionNode>) -> RewriteResult<ExpressionNode> {
        let mut groups: BTreeMap<String, FieldGroup> = BTreeMap::new();

        for (idx, child) in children.iter().enumerate() {
            if let Some((field, value)) = self.indexed_equality(child) {
                let group = groups.entry(field).or_default();
                group.value_members.push(idx);
                group.values.insert(value);
            } else if let Some((field, range)) = self.indexed_bounded_range(child) {
                let group = groups.entry(field).or_default();
                group.range_members.push(idx);
                group.ranges.push(range);
            }
        }

        let mut replacements: BTreeMap<usize, ExpressionNode> = BTreeMap::new();
        let mut removed: BTreeSet<usize> = BTreeSet::new();

        for (field, group) in groups {
            let (marker, members) = if group.range_members.len() > self.config.max_or_range_threshold
            {
                let members: Vec<usize> = group
                    .value_members
                    .iter()
                    .chain(group.range_members.iter())
                    .copied()
                    .collect();
                let marker =
                    OverflowMarker::from_values_and_ranges(&field, group.values, group.ranges)?;
                (marker, members)
            } else if group.value_members.len() > self.config.max_or_expansion_threshold {
                let marker = self.values_marker(&field, group.values)?;
                (marker, group.value_members)
            } else {
                continue;
            };

            let first = match members.iter().min() {
                Some(first) => *first,
                None => continue,
            };

            self.metrics.increment_overflow_markers();
            self.logger.event(
                Event::OverflowMarkerCreated,
                &[
                    ("field", &field),
                    ("id", marker.id()),
                    ("members", &members.len().to_string()),
                    ("payload", marker.payload().kind_name()),
                ],
            );

            replacements.insert(first, ExpressionNode::Marker(Marker::overflow(marker)));
            removed.extend(members);
        }

        if replacements.is_empty() {
            return Ok(ExpressionNode::Or(children));
        }

        let mut out = Vec::with_capacity(children.len() - removed.len() + replacements.len());
        for (idx, child) in children.into_iter().enumerate() {
            if let Some(marker) = replacements.remove(&idx) {
                out.push(marker);
            } else if !removed.contains(&idx) {
                out.push(child);
            }
        }

        if out.len() == 1 {
            Ok(out.remove(0))
        } else {
            Ok(ExpressionNode::Or(out))
        }
    }

    fn values_marker(&self, field: &str, values: BTreeSet<String>) -> RewriteResult<OverflowMarker> {
        if values.len() <= self.config.max_or_expansion_fst_threshold {
            return Ok(OverflowMarker::from_values(field, values)?);
        }

        let externalizer = match &self.externalizer {
            Some(externalizer) => externalizer,
            None => {
                self.logger.event(
                    Event::ExternalizerMissing,
                    &[
                        ("count", values.len().to_string().as_str()),
                        ("field", field),
                        (
                            "fst_threshold",
                            self.config.max_or_expansion_fst_threshold.to_string().as_str(),
                        ),
                    ],
                );
                return Ok(OverflowMarker::from_values(field, values)?);
            }
        };

        let uri = externalizer.store(field, &values)?;
        self.metrics.add_terms_externalized(values.len() as u64);
        self.logger.event(
            Event::TermsExternalized,
            &[
                ("count", &values.len().to_string()),
                ("field", field),
                ("uri", &uri),
            ],
        );
        Ok(OverflowMarker::from_fst_uri(field, uri)?)
    }

    /// `(FIELD, value)` for an equality term on an indexed field
    fn indexed_equality(&self, node: &ExpressionNode) -> Option<(String, String)> {
        let term = node.as_term()?;
        if !term.is_equality() || !self.config.is_indexed(&term.field) {
            return None;
        }
        let value = term.value.as_value()?;
        Some((term.field.to_ascii_uppercase(), value.to_string()))
    }

    /// `(FIELD, range)` for a bounded-range marker on an indexed field
    fn indexed_bounded_range(&self, node: &ExpressionNode) -> Option<(String, RangeLiteral)> {
        let marker = node.as_marker()?;
        if marker.kind() != MarkerKind::BoundedRange {
            return None;
        }

        let (a, b) = match marker.source()?.children() {
            [ExpressionNode::Term(a), ExpressionNode::Term(b)] => (a, b),
            _ => return None,
        };
        if !a.field.eq_ignore_ascii_case(&b.field) || !self.config.is_indexed(&a.field) {
            return None;
        }

        let (lower, upper) = match (a.op, b.op) {
            (Operator::Ge | Operator::Gt, Operator::Le | Operator::Lt) => (a, b),
            (Operator::Le | Operator::Lt, Operator::Ge | Operator::Gt) => (b, a),
            _ => return None,
        };

        let range = RangeLiteral::new(
            lower.value.as_value()?,
            lower.op == Operator::Ge,
            upper.value.as_value()?,
            upper.op == Operator::Le,
        );
        Some((a.field.to_ascii_uppercase(), range))
    }
}

impl RewriteVisitor for LargeFieldedListPushdown {
    fn name(&self) -> &'static str {
        "large_fielded_list_pushdown"
    }

    fn rewrite(&self, node: ExpressionNode) -> RewriteResult<ExpressionNode> {
        self.push(node)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::expression::parse;
    use crate::overflow::OverflowPayload;
    use crate::rewrite::RewriteError;

    struct RecordingExternalizer {
        stored: Mutex<Vec<(String, usize)>>,
    }

    impl TermExternalizer for RecordingExternalizer {
        fn store(&self, field: &str, values: &BTreeSet<String>) -> RewriteResult<String> {
            self.stored
                .lock()
                .unwrap()
                .push((field.to_string(), values.len()));
            Ok(format!("mem://fst/{}", field))
        }
    }

    struct BrokenExternalizer;

    impl TermExternalizer for BrokenExternalizer {
        fn store(&self, field: &str, _values: &BTreeSet<String>) -> RewriteResult<String> {
            Err(RewriteError::externalization_failed(field, "offline"))
        }
    }

    fn context(inline: usize, fst: usize, ranges: usize) -> QueryContext {
        let config = EngineConfig {
            max_or_expansion_threshold: inline,
            max_or_expansion_fst_threshold: fst,
            max_or_range_threshold: ranges,
            indexed_fields: ["FOO", "BAR"].iter().map(|s| s.to_string()).collect(),
            ..EngineConfig::default()
        };
        QueryContext::with_logger(config, Logger::memory())
    }

    fn or_of(field: &str, count: usize) -> String {
        (0..count)
            .map(|i| format!("{} == 'v{}'", field, i))
            .collect::<Vec<_>>()
            .join(" || ")
    }

    #[test]
    fn test_below_threshold_untouched() {
        let ctx = context(3, 5, 10);
        let query = or_of("FOO", 3);
        let out = LargeFieldedListPushdown::new(&ctx)
            .rewrite(parse(&query).unwrap())
            .unwrap();
        assert_eq!(out.to_string(), query);
    }

    #[test]
    fn test_above_threshold_becomes_value_marker() {
        let ctx = context(3, 5, 10);
        let out = LargeFieldedListPushdown::new(&ctx)
            .rewrite(parse(&or_of("FOO", 4)).unwrap())
            .unwrap();

        let marker = out.as_marker().unwrap().overflow_marker().unwrap();
        assert_eq!(marker.field(), "FOO");
        match marker.payload() {
            OverflowPayload::ValueSet { values } => assert_eq!(values.len(), 4),
            other => panic!("expected values, got {:?}", other),
        }
        assert_eq!(ctx.metrics.snapshot().overflow_markers, 1);
        assert!(ctx.logger.has_event(Event::OverflowMarkerCreated));
    }

    #[test]
    fn test_above_fst_threshold_without_externalizer_stays_inline() {
        let ctx = context(3, 5, 10);
        let out = LargeFieldedListPushdown::new(&ctx)
            .rewrite(parse(&or_of("FOO", 6)).unwrap())
            .unwrap();

        let marker = out.as_marker().unwrap().overflow_marker().unwrap();
        match marker.payload() {
            OverflowPayload::ValueSet { values } => assert_eq!(values.len(), 6),
            other => panic!("expected values, got {:?}", other),
        }
        assert!(ctx.logger.has_event(Event::ExternalizerMissing));
        assert_eq!(ctx.metrics.snapshot().terms_externalized, 0);
    }

    #[test]
    fn test_below_fst_threshold_logs_no_warning() {
        let ctx = context(3, 5, 10);
        LargeFieldedListPushdown::new(&ctx)
            .rewrite(parse(&or_of("FOO", 5)).unwrap())
            .unwrap();
        assert!(!ctx.logger.has_event(Event::ExternalizerMissing));
    }

    #[test]
    fn test_above_fst_threshold_externalizes() {
        let ctx = context(3, 5, 10);
        let externalizer = Arc::new(RecordingExternalizer {
            stored: Mutex::new(Vec::new()),
        });
        let out = LargeFieldedListPushdown::new(&ctx)
            .with_externalizer(externalizer.clone())
            .rewrite(parse(&or_of("FOO", 6)).unwrap())
            .unwrap();

        let marker = out.as_marker().unwrap().overflow_marker().unwrap();
        assert_eq!(
            marker.payload(),
            &OverflowPayload::FstReference {
                uri: "mem://fst/FOO".into()
            }
        );
        assert_eq!(
            externalizer.stored.lock().unwrap().as_slice(),
            &[("FOO".to_string(), 6)]
        );
        assert_eq!(ctx.metrics.snapshot().terms_externalized, 6);
    }

    #[test]
    fn test_externalization_failure_propagates() {
        let ctx = context(3, 5, 10);
        let err = LargeFieldedListPushdown::new(&ctx)
            .with_externalizer(Arc::new(BrokenExternalizer))
            .rewrite(parse(&or_of("FOO", 6)).unwrap())
            .unwrap_err();
        assert_eq!(err.code().code(), "SQ_EXTERNALIZATION_FAILED");
    }

    #[test]
    fn test_unindexed_and_other_fields_kept_in_place() {
        let ctx = context(2, 5, 10);
        let query = format!("OTHER == 'x' || {} || BAR == 'y'", or_of("FOO", 3));
        let out = LargeFieldedListPushdown::new(&ctx)
            .rewrite(parse(&query).unwrap())
            .unwrap();

        match out {
            ExpressionNode::Or(children) => {
                assert_eq!(children.len(), 3);
                assert_eq!(children[0], ExpressionNode::eq("OTHER", "x"));
                assert!(children[1].as_marker().is_some());
                assert_eq!(children[2], ExpressionNode::eq("BAR", "y"));
            }
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_or_inside_and() {
        let ctx = context(2, 5, 10);
        let query = format!("BAR == 'y' && ({})", or_of("FOO", 3));
        let out = LargeFieldedListPushdown::new(&ctx)
            .rewrite(parse(&query).unwrap())
            .unwrap();
        assert_eq!(out.overflow_markers().len(), 1);
        assert!(matches!(out, ExpressionNode::And(ref c) if c.len() == 2));
    }

    #[test]
    fn test_bounded_ranges_merge_into_range_marker() {
        let ctx = context(100, 200, 2);
        let ranges = ["a", "c", "e"]
            .iter()
            .map(|lo| {
                ExpressionNode::marker(
                    MarkerKind::BoundedRange,
                    parse(&format!("FOO >= '{}' && FOO <= '{}z'", lo, lo)).unwrap(),
                )
            })
            .chain(std::iter::once(ExpressionNode::eq("FOO", "q")))
            .collect();
        let out = LargeFieldedListPushdown::new(&ctx)
            .rewrite(ExpressionNode::Or(ranges))
            .unwrap();

        let marker = out.as_marker().unwrap().overflow_marker().unwrap();
        assert_eq!(
            marker.payload(),
            &OverflowPayload::MergedRanges {
                ranges: vec![
                    RangeLiteral::inclusive("a", "az"),
                    RangeLiteral::inclusive("c", "cz"),
                    RangeLiteral::inclusive("e", "ez"),
                    RangeLiteral::point("q"),
                ]
            }
        );
    }
}
