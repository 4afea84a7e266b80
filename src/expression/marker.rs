//! Legacy marker decoding
//!
//! Query text carries markers as `((LABEL = true) && (source))`. The parser
//! produces those as plain `And` nodes; this pass turns every such subtree
//! into a typed `Marker`. The printer is the matching encode side.
//!
//! An `ExceededOr` subtree whose id/field/params triple does not decode stays
//! an ordinary `And` and is logged.

use crate::config::MalformedRangePolicy;
use crate::observability::{Event, Logger};
use crate::overflow::OverflowMarker;

use super::ast::{ExpressionNode, Literal, Marker, MarkerKind, MarkerPayload, Operator};

/// Replace marker-shaped `And` subtrees with typed markers, bottom-up
pub fn decode_legacy_markers(
    node: ExpressionNode,
    logger: &Logger,
    policy: MalformedRangePolicy,
) -> ExpressionNode {
    let decode_all = |children: Vec<ExpressionNode>| -> Vec<ExpressionNode> {
        children
            .into_iter()
            .map(|c| decode_legacy_markers(c, logger, policy))
            .collect()
    };

    match node {
        ExpressionNode::And(children) => match_marker(decode_all(children), logger, policy),
        ExpressionNode::Or(children) => ExpressionNode::Or(decode_all(children)),
        ExpressionNode::Not(children) => ExpressionNode::Not(decode_all(children)),
        ExpressionNode::Marker(marker) => match marker.into_parts() {
            (kind, MarkerPayload::Source(source)) => {
                ExpressionNode::marker(kind, decode_legacy_markers(*source, logger, policy))
            }
            (_, MarkerPayload::Overflow(overflow)) => {
                ExpressionNode::Marker(Marker::overflow(overflow))
            }
        },
        leaf @ (ExpressionNode::Term(_)
        | ExpressionNode::Function(_)
        | ExpressionNode::Phrase(_)
        | ExpressionNode::Within(_)) => leaf,
    }
}

/// Returns the marker kind if `node` is `LABEL = true`
pub fn marker_label(node: &ExpressionNode) -> Option<MarkerKind> {
    let term = node.as_term()?;
    if term.op != Operator::Assign || term.value != Literal::Bool(true) {
        return None;
    }
    MarkerKind::from_label(&term.field)
}

fn match_marker(
    mut children: Vec<ExpressionNode>,
    logger: &Logger,
    policy: MalformedRangePolicy,
) -> ExpressionNode {
    let kind = match children.as_slice() {
        [label, _] => marker_label(label),
        _ => None,
    };

    let kind = match kind {
        Some(kind) => kind,
        None => return ExpressionNode::And(children),
    };

    // Two children, checked above
    let source = children.remove(1);

    if kind != MarkerKind::ExceededOr {
        return ExpressionNode::marker(kind, source);
    }

    let decoded = match &source {
        ExpressionNode::And(triple) => OverflowMarker::decode_assignments(triple, policy),
        _ => None,
    };

    match decoded {
        Some(Ok(decoded)) => {
            for literal in &decoded.dropped {
                logger.event(
                    Event::RangeLiteralDropped,
                    &[
                        ("field", decoded.marker.field()),
                        ("id", decoded.marker.id()),
                        ("literal", literal.join(",").as_str()),
                    ],
                );
            }
            ExpressionNode::Marker(Marker::overflow(decoded.marker))
        }
        Some(Err(e)) => {
            logger.event(
                Event::MarkerDecodeFailed,
                &[("code", e.code().code()), ("reason", e.message())],
            );
            children.push(source);
            ExpressionNode::And(children)
        }
        None => {
            logger.event(
                Event::MarkerDecodeFailed,
                &[("reason", "missing id, field, or params assignment")],
            );
            children.push(source);
            ExpressionNode::And(children)
        }
    }
}
