//! Explain plan output
//!
//! Produces deterministic, human-readable explain output.

use std::fmt;

use crate::errors::EngineError;

use super::planner::QueryPlan;

/// Explain plan output
#[derive(Debug, Clone)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// Query text as submitted
    pub original: Option<String>,
    /// Canonical text after every rewrite
    pub rewritten: Option<String>,
    /// Printed delayed terms
    pub delayed_terms: Vec<String>,
    /// One line per overflow marker
    pub overflow_markers: Vec<String>,
    pub descriptor_count: usize,
    pub range_count: usize,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a successful query plan
    pub fn from_plan(plan: &QueryPlan) -> Self {
        let overflow_markers = plan
            .rewritten
            .overflow_markers()
            .into_iter()
            .map(|m| {
                format!(
                    "{} {} ({} inline)",
                    m.field(),
                    m.payload().kind_name(),
                    m.inline_len()
                )
            })
            .collect();

        Self {
            accepted: true,
            original: Some(plan.rewritten.original.clone()),
            rewritten: Some(plan.rewritten.query_string()),
            delayed_terms: plan.rewritten.delayed_terms(),
            overflow_markers,
            descriptor_count: plan.descriptors.len(),
            range_count: plan.range_count(),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &EngineError) -> Self {
        Self {
            accepted: false,
            original: None,
            rewritten: None,
            delayed_terms: Vec::new(),
            overflow_markers: Vec::new(),
            descriptor_count: 0,
            range_count: 0,
            rejection_reason: Some(err.to_string()),
            rejection_code: Some(err.code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(original) = &self.original {
                writeln!(f, "Original: {}", original)?;
            }
            if let Some(rewritten) = &self.rewritten {
                writeln!(f, "Rewritten: {}", rewritten)?;
            }
            if !self.delayed_terms.is_empty() {
                writeln!(f, "Delayed:")?;
                for term in &self.delayed_terms {
                    writeln!(f, "  - {}", term)?;
                }
            }
            if !self.overflow_markers.is_empty() {
                writeln!(f, "Overflow Markers:")?;
                for marker in &self.overflow_markers {
                    writeln!(f, "  - {}", marker)?;
                }
            }
            writeln!(f, "Descriptors: {}", self.descriptor_count)?;
            writeln!(f, "Ranges: {}", self.range_count)?;
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cardinality::{CardinalityCounts, StaticCardinalityLookup};
    use crate::config::EngineConfig;
    use crate::context::QueryContext;
    use crate::observability::Logger;
    use crate::planner::QueryPlanner;
    use crate::scan::RowRange;

    fn planner_context() -> QueryContext {
        let config = EngineConfig {
            min_selectivity: 0.002,
            indexed_fields: ["FOO".to_string()].into_iter().collect(),
            ..EngineConfig::default()
        };
        QueryContext::with_logger(config, Logger::null())
    }

    fn lookup() -> Arc<StaticCardinalityLookup> {
        Arc::new(StaticCardinalityLookup::new().with(CardinalityCounts::new("FOO", "ca1", 2, 1000)))
    }

    #[test]
    fn test_explain_accepted_plan() {
        let ctx = planner_context();
        let plan = QueryPlanner::new(&ctx, lookup())
            .plan("FOO == 'ca1' || BAR == 'x'", vec![RowRange::row("20240101_0")])
            .unwrap();
        let explain = ExplainPlan::from_plan(&plan);

        assert!(explain.accepted);
        assert_eq!(explain.delayed_terms, vec!["FOO == 'ca1'".to_string()]);
        assert_eq!(explain.descriptor_count, 1);
        assert_eq!(explain.range_count, 1);

        let output = format!("{}", explain);
        assert!(output.contains("ACCEPTED"));
        assert!(output.contains("Rewritten: ((_Delayed_ = true) && (FOO == 'ca1')) || BAR == 'x'"));
    }

    #[test]
    fn test_explain_rejected_plan() {
        let ctx = planner_context();
        let err = QueryPlanner::new(&ctx, lookup())
            .plan("FOO == 'ca1' ||", Vec::new())
            .unwrap_err();
        let explain = ExplainPlan::from_error(&err);

        assert!(!explain.accepted);
        assert_eq!(explain.rejection_code, Some("SQ_PARSE_FAILURE".into()));

        let output = format!("{}", explain);
        assert!(output.contains("REJECTED"));
        assert!(output.contains("SQ_PARSE_FAILURE"));
    }

    #[test]
    fn test_explain_deterministic() {
        let ctx = planner_context();
        let plan = QueryPlanner::new(&ctx, lookup())
            .plan("FOO == 'ca1'", vec![RowRange::row("20240101_0")])
            .unwrap();

        let explain1 = format!("{}", ExplainPlan::from_plan(&plan));
        let explain2 = format!("{}", ExplainPlan::from_plan(&plan));
        assert_eq!(explain1, explain2);
    }
}
