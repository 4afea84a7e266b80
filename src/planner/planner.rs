//! Query planner
//!
//! Parse errors are rejected before any rewrite runs. Rewrite errors carry
//! the name of the visitor that raised them.

use std::sync::Arc;

use crate::cardinality::CardinalityLookup;
use crate::context::QueryContext;
use crate::errors::EngineResult;
use crate::expression::{
    augment_control_query, decode_legacy_markers, parse, ExpressionNode, FieldValues, MarkerKind,
};
use crate::observability::Event;
use crate::overflow::OverflowMarker;
use crate::rewrite::{
    apply_visitors, LargeFieldedListPushdown, LowSelectivityDelay, QueryModelExpansion,
    TermExternalizer,
};
use crate::scan::{QueryData, RangeCounts, RowRange, ScanDescriptorBuilder};

/// A parsed and rewritten query
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenQuery {
    /// Query text as submitted
    pub original: String,
    /// Tree after every rewrite
    pub tree: ExpressionNode,
}

impl RewrittenQuery {
    /// Canonical text of the rewritten tree
    pub fn query_string(&self) -> String {
        self.tree.to_string()
    }

    /// Printed source of every delayed term
    pub fn delayed_terms(&self) -> Vec<String> {
        self.tree
            .markers()
            .into_iter()
            .filter(|m| m.kind() == MarkerKind::Delayed)
            .filter_map(|m| m.source().map(ToString::to_string))
            .collect()
    }

    pub fn overflow_markers(&self) -> Vec<&OverflowMarker> {
        self.tree.overflow_markers()
    }
}

/// A rewritten query plus the descriptors to scan
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub rewritten: RewrittenQuery,
    pub descriptors: Vec<QueryData>,
    pub range_counts: RangeCounts,
}

impl QueryPlan {
    /// Ranges across every descriptor
    pub fn range_count(&self) -> usize {
        self.descriptors.iter().map(QueryData::range_count).sum()
    }
}

/// Plans queries against one context
pub struct QueryPlanner<'a> {
    ctx: &'a QueryContext,
    lookup: Arc<dyn CardinalityLookup>,
    externalizer: Option<Arc<dyn TermExternalizer>>,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(ctx: &'a QueryContext, lookup: Arc<dyn CardinalityLookup>) -> Self {
        Self {
            ctx,
            lookup,
            externalizer: None,
        }
    }

    /// Externalize value lists above the FST threshold
    pub fn with_externalizer(mut self, externalizer: Arc<dyn TermExternalizer>) -> Self {
        self.externalizer = Some(externalizer);
        self
    }

    /// Parse and rewrite `query`
    pub fn rewrite(&self, query: &str) -> EngineResult<RewrittenQuery> {
        let logger = &self.ctx.logger;
        let query_id = self.ctx.query_id_str();

        let parsed = match parse(query) {
            Ok(tree) => tree,
            Err(err) => {
                self.ctx.metrics.increment_parse_failures();
                logger.event(
                    Event::QueryParseFailed,
                    &[
                        ("position", err.position().to_string().as_str()),
                        ("query_id", query_id.as_str()),
                        ("reason", err.message()),
                    ],
                );
                return Err(err.into());
            }
        };
        logger.event(Event::QueryParsed, &[("query_id", query_id.as_str())]);

        let decoded =
            decode_legacy_markers(parsed, logger, self.ctx.config.malformed_range_policy);

        let expansion = QueryModelExpansion::new(self.ctx);
        let pushdown = match &self.externalizer {
            Some(externalizer) => {
                LargeFieldedListPushdown::new(self.ctx).with_externalizer(externalizer.clone())
            }
            None => LargeFieldedListPushdown::new(self.ctx),
        };
        let delay = LowSelectivityDelay::new(self.ctx, self.lookup.clone());

        let tree = apply_visitors(&[&expansion, &pushdown, &delay], decoded)?;

        self.ctx.metrics.increment_queries_planned();
        logger.event(
            Event::RewriteComplete,
            &[
                ("elapsed_ms", self.ctx.elapsed_ms().to_string().as_str()),
                ("query_id", query_id.as_str()),
            ],
        );

        Ok(RewrittenQuery {
            original: query.to_string(),
            tree,
        })
    }

    /// Rewrite `query` and build descriptors covering `ranges`
    pub fn plan(
        &self,
        query: &str,
        ranges: impl IntoIterator<Item = RowRange>,
    ) -> EngineResult<QueryPlan> {
        let rewritten = self.rewrite(query)?;

        let mut builder = ScanDescriptorBuilder::new(self.ctx);
        let descriptors = builder.build(&rewritten.query_string(), &rewritten.tree, ranges);

        Ok(QueryPlan {
            rewritten,
            descriptors,
            range_counts: builder.counts(),
        })
    }

    /// Plan `query` with required and excluded field values pinned on
    pub fn plan_controlled(
        &self,
        query: &str,
        includes: &FieldValues,
        excludes: &FieldValues,
        ranges: impl IntoIterator<Item = RowRange>,
    ) -> EngineResult<QueryPlan> {
        self.plan(&augment_control_query(query, includes, excludes), ranges)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::cardinality::{CardinalityCounts, StaticCardinalityLookup};
    use crate::config::EngineConfig;
    use crate::model::FieldModel;
    use crate::observability::Logger;

    fn context(config: EngineConfig) -> QueryContext {
        QueryContext::with_logger(config, Logger::memory())
    }

    fn config() -> EngineConfig {
        EngineConfig {
            min_selectivity: 0.002,
            max_or_expansion_threshold: 3,
            indexed_fields: ["FOO", "BAR"].iter().map(|s| s.to_string()).collect(),
            model: FieldModel::new().with_mapping("COLOR", "BAR"),
            ..EngineConfig::default()
        }
    }

    fn lookup() -> Arc<StaticCardinalityLookup> {
        Arc::new(
            StaticCardinalityLookup::new()
                .with(CardinalityCounts::new("FOO", "jsub", 1, 1000))
                .with(CardinalityCounts::new("FOO", "ca1", 2, 1000)),
        )
    }

    #[test]
    fn test_rewrite_runs_every_visitor() {
        let ctx = context(config());
        let planner = QueryPlanner::new(&ctx, lookup());
        let rewritten = planner
            .rewrite("FOO == 'ca1' && (COLOR == 'a' || COLOR == 'b' || COLOR == 'c' || COLOR == 'd')")
            .unwrap();

        assert_eq!(rewritten.delayed_terms(), vec!["FOO == 'ca1'".to_string()]);
        let markers = rewritten.overflow_markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].field(), "BAR");

        let snapshot = ctx.metrics.snapshot();
        assert_eq!(snapshot.queries_planned, 1);
        assert_eq!(snapshot.terms_delayed, 1);
        assert!(ctx.logger.has_event(Event::RewriteComplete));
    }

    #[test]
    fn test_parse_failure_is_counted() {
        let ctx = context(config());
        let planner = QueryPlanner::new(&ctx, lookup());
        let err = planner.rewrite("FOO == ").unwrap_err();
        assert_eq!(err.code(), "SQ_PARSE_FAILURE");
        assert_eq!(ctx.metrics.snapshot().parse_failures, 1);
        assert!(ctx.logger.has_event(Event::QueryParseFailed));
    }

    #[test]
    fn test_legacy_markers_are_decoded() {
        let ctx = context(config());
        let planner = QueryPlanner::new(&ctx, lookup());
        let rewritten = planner
            .rewrite("((_Eval_ = true) && (FOO == 'jsub'))")
            .unwrap();
        let marker = rewritten.tree.as_marker().unwrap();
        assert_eq!(marker.kind(), MarkerKind::EvaluationOnly);
    }

    #[test]
    fn test_plan_builds_descriptors() {
        let ctx = context(config());
        let planner = QueryPlanner::new(&ctx, lookup());
        let ranges = vec![RowRange::row("20240101_0"), RowRange::row("20240101_1")];
        let plan = planner.plan("FOO == 'jsub'", ranges).unwrap();

        assert_eq!(plan.descriptors.len(), 2);
        assert_eq!(plan.range_count(), 2);
        assert_eq!(plan.range_counts.shard, 2);
        assert_eq!(plan.descriptors[0].query, "FOO == 'jsub'");
    }

    #[test]
    fn test_descriptors_carry_the_rewritten_query() {
        let ctx = context(config());
        let planner = QueryPlanner::new(&ctx, lookup());
        let plan = planner
            .plan(
                "FOO == 'jsub' && (FOO == 'ca1' || UNINDEXED == 'ca1')",
                vec![RowRange::row("20240101_0")],
            )
            .unwrap();

        let expected =
            "FOO == 'jsub' && (((_Delayed_ = true) && (FOO == 'ca1')) || UNINDEXED == 'ca1')";
        assert_eq!(plan.rewritten.query_string(), expected);
        assert_eq!(plan.descriptors[0].query, expected);
        assert_eq!(
            plan.descriptors[0].setting(crate::scan::QUERY_SETTING).unwrap().option("query"),
            Some(expected)
        );
        assert!(!ctx.logger.has_event(Event::OriginalQuerySubstituted));
    }

    #[test]
    fn test_descriptors_carry_expanded_fields() {
        let config = EngineConfig {
            model: FieldModel::new()
                .with_mapping("NAME", "FIRST_NAME")
                .with_mapping("NAME", "LAST_NAME"),
            ..EngineConfig::default()
        };
        let ctx = context(config);
        let planner = QueryPlanner::new(&ctx, lookup());
        let plan = planner
            .plan("NAME == 'bob'", vec![RowRange::row("20240101_0")])
            .unwrap();

        assert_eq!(
            plan.descriptors[0].query,
            "FIRST_NAME == 'bob' || LAST_NAME == 'bob'"
        );
    }

    #[test]
    fn test_plan_controlled_pins_values() {
        let ctx = context(config());
        let planner = QueryPlanner::new(&ctx, lookup());
        let mut includes = FieldValues::new();
        includes.insert("FOO".into(), BTreeSet::from(["x".to_string()]));

        let plan = planner
            .plan_controlled("FOO == 'jsub'", &includes, &FieldValues::new(), Vec::new())
            .unwrap();
        assert_eq!(plan.rewritten.original, "(FOO == 'jsub') AND (#INCLUDE(FOO, 'x'))");
        assert!(plan.descriptors.is_empty());
    }
}
