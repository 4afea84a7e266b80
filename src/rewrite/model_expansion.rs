//! Query-model expansion
//!
//! A term on a query-facing alias becomes a term on its on-disk field, or an
//! OR of terms when the alias maps to several fields. Bounded-range markers
//! expand as a unit so each copy keeps both bounds on one field.

use std::cell::Cell;
use std::sync::Arc;

use crate::context::QueryContext;
use crate::expression::{ExpressionNode, Marker, MarkerKind, MarkerPayload, Operator, Term};
use crate::model::FieldModel;
use crate::observability::{Event, Logger};

use super::{RewriteResult, RewriteVisitor};

/// Expands aliases using the configured field model
pub struct QueryModelExpansion {
    model: Arc<FieldModel>,
    logger: Logger,
}

impl QueryModelExpansion {
    pub fn new(ctx: &QueryContext) -> Self {
        Self {
            model: Arc::new(ctx.config.model.clone()),
            logger: ctx.logger.clone(),
        }
    }

    pub fn with_model(model: FieldModel, logger: Logger) -> Self {
        Self {
            model: Arc::new(model),
            logger,
        }
    }

    fn expand(&self, node: ExpressionNode, expanded: &Cell<usize>) -> ExpressionNode {
        let expand_all = |children: Vec<ExpressionNode>| -> Vec<ExpressionNode> {
            children
                .into_iter()
                .map(|c| self.expand(c, expanded))
                .collect()
        };

        match node {
            ExpressionNode::And(children) => ExpressionNode::And(expand_all(children)),
            ExpressionNode::Or(children) => ExpressionNode::Or(expand_all(children)),
            ExpressionNode::Not(children) => ExpressionNode::Not(expand_all(children)),
            ExpressionNode::Term(term) => {
                if term.op == Operator::Assign {
                    return ExpressionNode::Term(term);
                }
                let field = term.field.clone();
                self.fan_out(&field, expanded, ExpressionNode::Term(term), rename_term_fields)
            }
            ExpressionNode::Phrase(phrase) => match phrase.field.clone() {
                Some(field) => self.fan_out(&field, expanded, ExpressionNode::Phrase(phrase), |node, to| {
                    match node {
                        ExpressionNode::Phrase(mut p) => {
                            p.field = Some(to.to_string());
                            ExpressionNode::Phrase(p)
                        }
                        other => other,
                    }
                }),
                None => ExpressionNode::Phrase(phrase),
            },
            ExpressionNode::Within(within) => match within.field.clone() {
                Some(field) => self.fan_out(&field, expanded, ExpressionNode::Within(within), |node, to| {
                    match node {
                        ExpressionNode::Within(mut w) => {
                            w.field = Some(to.to_string());
                            ExpressionNode::Within(w)
                        }
                        other => other,
                    }
                }),
                None => ExpressionNode::Within(within),
            },
            ExpressionNode::Function(call) => ExpressionNode::Function(call),
            ExpressionNode::Marker(marker) => self.expand_marker(marker, expanded),
        }
    }

    fn expand_marker(&self, marker: Marker, expanded: &Cell<usize>) -> ExpressionNode {
        match marker.into_parts() {
            (MarkerKind::BoundedRange, MarkerPayload::Source(source)) => {
                match single_field(&source) {
                    Some(field) => self.fan_out(
                        &field,
                        expanded,
                        ExpressionNode::marker(MarkerKind::BoundedRange, *source),
                        rename_term_fields,
                    ),
                    None => ExpressionNode::marker(MarkerKind::BoundedRange, *source),
                }
            }
            (kind, MarkerPayload::Source(source)) => {
                ExpressionNode::marker(kind, self.expand(*source, expanded))
            }
            (_, MarkerPayload::Overflow(overflow)) => {
                ExpressionNode::Marker(Marker::overflow(overflow))
            }
        }
    }

    /// One copy of `node` per on-disk field of `alias`
    fn fan_out<F>(
        &self,
        alias: &str,
        expanded: &Cell<usize>,
        node: ExpressionNode,
        rename: F,
    ) -> ExpressionNode
    where
        F: Fn(ExpressionNode, &str) -> ExpressionNode,
    {
        let fields = match self.model.forward_fields(alias) {
            Some(fields) if !fields.is_empty() => fields,
            _ => return node,
        };

        expanded.set(expanded.get() + 1);

        let mut copies: Vec<ExpressionNode> =
            fields.iter().map(|f| rename(node.clone(), f)).collect();
        if copies.len() == 1 {
            copies.remove(0)
        } else {
            ExpressionNode::Or(copies)
        }
    }
}

impl RewriteVisitor for QueryModelExpansion {
    fn name(&self) -> &'static str {
        "query_model_expansion"
    }

    fn rewrite(&self, node: ExpressionNode) -> RewriteResult<ExpressionNode> {
        if self.model.is_empty() {
            return Ok(node);
        }

        let expanded = Cell::new(0);
        let out = self.expand(node, &expanded);

        let count = expanded.get();
        if count > 0 {
            self.logger
                .event(Event::ModelExpanded, &[("expanded", &count.to_string())]);
        }
        Ok(out)
    }
}

/// Rename every term field in `node` to `to`
fn rename_term_fields(node: ExpressionNode, to: &str) -> ExpressionNode {
    match node {
        ExpressionNode::Term(term) => ExpressionNode::Term(Term { field: to.to_string(), ..term }),
        ExpressionNode::And(c) => {
            ExpressionNode::And(c.into_iter().map(|n| rename_term_fields(n, to)).collect())
        }
        ExpressionNode::Or(c) => {
            ExpressionNode::Or(c.into_iter().map(|n| rename_term_fields(n, to)).collect())
        }
        ExpressionNode::Not(c) => {
            ExpressionNode::Not(c.into_iter().map(|n| rename_term_fields(n, to)).collect())
        }
        ExpressionNode::Marker(marker) => match marker.into_parts() {
            (kind, MarkerPayload::Source(source)) => {
                ExpressionNode::marker(kind, rename_term_fields(*source, to))
            }
            (_, MarkerPayload::Overflow(overflow)) => {
                ExpressionNode::Marker(Marker::overflow(overflow))
            }
        },
        other @ (ExpressionNode::Function(_)
        | ExpressionNode::Phrase(_)
        | ExpressionNode::Within(_)) => other,
    }
}

/// The field shared by every term in `node`, if there is exactly one
fn single_field(node: &ExpressionNode) -> Option<String> {
    let terms = node.terms();
    let first = terms.first()?.field.to_ascii_uppercase();
    terms
        .iter()
        .all(|t| t.field.eq_ignore_ascii_case(&first))
        .then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parse;

    fn visitor() -> QueryModelExpansion {
        let model = FieldModel::new()
            .with_mapping("NAME", "FIRST_NAME")
            .with_mapping("NAME", "LAST_NAME")
            .with_mapping("COLOR", "HUE");
        QueryModelExpansion::with_model(model, Logger::memory())
    }

    fn rewrite(query: &str) -> String {
        visitor().rewrite(parse(query).unwrap()).unwrap().to_string()
    }

    #[test]
    fn test_single_mapping_renames() {
        assert_eq!(rewrite("COLOR == 'red'"), "HUE == 'red'");
    }

    #[test]
    fn test_multiple_mappings_become_or() {
        assert_eq!(
            rewrite("NAME == 'bob' && COLOR == 'red'"),
            "(FIRST_NAME == 'bob' || LAST_NAME == 'bob') && HUE == 'red'"
        );
    }

    #[test]
    fn test_unmapped_fields_untouched() {
        assert_eq!(rewrite("SIZE == '9'"), "SIZE == '9'");
    }

    #[test]
    fn test_bounded_range_expands_as_unit() {
        let node = ExpressionNode::marker(
            MarkerKind::BoundedRange,
            parse("NAME >= 'a' && NAME <= 'c'").unwrap(),
        );
        let out = visitor().rewrite(node).unwrap();
        assert_eq!(
            out.to_string(),
            "((_Bounded_ = true) && (FIRST_NAME >= 'a' && FIRST_NAME <= 'c')) || ((_Bounded_ = true) && (LAST_NAME >= 'a' && LAST_NAME <= 'c'))"
        );
    }

    #[test]
    fn test_phrase_field_expanded() {
        assert_eq!(
            rewrite("content:phrase(COLOR, termOffsetMap, 'dark', 'red')"),
            "content:phrase(HUE, termOffsetMap, 'dark', 'red')"
        );
    }

    #[test]
    fn test_expansion_is_logged() {
        let logger = Logger::memory();
        let v = QueryModelExpansion::with_model(
            FieldModel::new().with_mapping("COLOR", "HUE"),
            logger.clone(),
        );
        v.rewrite(parse("COLOR == 'red'").unwrap()).unwrap();
        assert!(logger.has_event(Event::ModelExpanded));
    }
}
