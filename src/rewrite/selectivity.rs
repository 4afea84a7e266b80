//! Low-selectivity delay marking
//!
//! An indexed equality term whose value matches too large a share of the
//! corpus is wrapped in a `Delayed` marker so it is evaluated as a filter on
//! documents found by the other terms instead of driving the scan.
//!
//! The share is `fieldValueCount / totalAllFieldAllValueCount`. A term is
//! delayed when the share reaches `min_selectivity`; a threshold of zero or
//! below disables marking. Terms without statistics are left alone.

use std::sync::Arc;

use crate::cardinality::CardinalityLookup;
use crate::config::EngineConfig;
use crate::context::QueryContext;
use crate::expression::{ExpressionNode, MarkerKind, Term};
use crate::observability::{Event, Logger, MetricsRegistry};

use super::{RewriteResult, RewriteVisitor};

/// Wraps low-selectivity terms in delay markers
pub struct LowSelectivityDelay {
    config: Arc<EngineConfig>,
    lookup: Arc<dyn CardinalityLookup>,
    logger: Logger,
    metrics: Arc<MetricsRegistry>,
}

impl LowSelectivityDelay {
    pub fn new(ctx: &QueryContext, lookup: Arc<dyn CardinalityLookup>) -> Self {
        Self {
            config: ctx.config.clone(),
            lookup,
            logger: ctx.logger.clone(),
            metrics: ctx.metrics.clone(),
        }
    }

    fn mark(&self, node: ExpressionNode) -> ExpressionNode {
        match node {
            ExpressionNode::And(children) => ExpressionNode::And(self.mark_all(children)),
            ExpressionNode::Or(children) => ExpressionNode::Or(self.mark_all(children)),
            ExpressionNode::Not(children) => ExpressionNode::Not(self.mark_all(children)),
            ExpressionNode::Term(term) => match self.score(&term) {
                Some(score) if score >= self.config.min_selectivity => {
                    self.metrics.increment_terms_delayed();
                    self.logger.event(
                        Event::TermDelayed,
                        &[
                            ("field", term.field.as_str()),
                            ("selectivity", score.to_string().as_str()),
                        ],
                    );
                    ExpressionNode::marker(MarkerKind::Delayed, ExpressionNode::Term(term))
                }
                _ => ExpressionNode::Term(term),
            },
            // Marked subtrees already carry their evaluation strategy
            other @ (ExpressionNode::Marker(_)
            | ExpressionNode::Function(_)
            | ExpressionNode::Phrase(_)
            | ExpressionNode::Within(_)) => other,
        }
    }

    fn mark_all(&self, children: Vec<ExpressionNode>) -> Vec<ExpressionNode> {
        children.into_iter().map(|c| self.mark(c)).collect()
    }

    fn score(&self, term: &Term) -> Option<f64> {
        if !term.is_equality() || !self.config.is_indexed(&term.field) {
            return None;
        }
        let value = term.value.as_value()?;
        self.lookup.get(&term.field, value)?.selectivity()
    }
}

impl RewriteVisitor for LowSelectivityDelay {
    fn name(&self) -> &'static str {
        "low_selectivity_delay"
    }

    fn rewrite(&self, node: ExpressionNode) -> RewriteResult<ExpressionNode> {
        if !self.config.delay_enabled() {
            return Ok(node);
        }
        Ok(self.mark(node))
    }
}
