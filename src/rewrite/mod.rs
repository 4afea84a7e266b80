//! Rewrite visitors
//!
//! Each visitor consumes a tree and returns the rewritten tree. Dispatch is
//! an exhaustive `match` over `ExpressionNode`; no visitor keeps parent
//! links or mutates through them.
//!
//! Order used by the planner:
//! 1. `QueryModelExpansion` - aliases to on-disk fields
//! 2. `LargeFieldedListPushdown` - oversized OR lists into overflow markers
//! 3. `LowSelectivityDelay` - delay markers on low-selectivity terms

mod errors;
mod model_expansion;
mod pushdown;
mod selectivity;

use std::collections::BTreeSet;

use crate::expression::ExpressionNode;

pub use errors::{RewriteError, RewriteErrorCode, RewriteResult};
pub use model_expansion::QueryModelExpansion;
pub use pushdown::LargeFieldedListPushdown;
pub use selectivity::LowSelectivityDelay;

/// A tree-to-tree rewrite
pub trait RewriteVisitor {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    fn rewrite(&self, node: ExpressionNode) -> RewriteResult<ExpressionNode>;
}

/// Stores a large value set outside the query and returns a reference URI
pub trait TermExternalizer: Send + Sync {
    fn store(&self, field: &str, values: &BTreeSet<String>) -> RewriteResult<String>;
}

/// Run visitors in order, tagging any error with the failing visitor
pub fn apply_visitors(
    visitors: &[&dyn RewriteVisitor],
    node: ExpressionNode,
) -> RewriteResult<ExpressionNode> {
    visitors.iter().try_fold(node, |node, visitor| {
        visitor
            .rewrite(node)
            .map_err(|e| e.in_visitor(visitor.name()))
    })
}
