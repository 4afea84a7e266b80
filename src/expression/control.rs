//! Include/exclude control-query augmentation
//!
//! A controlled front end pins required and excluded field values onto the
//! caller's query text before normal parsing.

use std::collections::{BTreeMap, BTreeSet};

use super::ast::Literal;

/// Field name to value set
pub type FieldValues = BTreeMap<String, BTreeSet<String>>;

/// Rewrite `query` to
/// `(query) AND (#INCLUDE(f, 'v') OR ...) AND (#EXCLUDE(f, 'v') AND ...)`.
///
/// Fields and values are emitted in sorted order. An empty map omits its
/// clause; with both maps empty the query is returned unchanged.
pub fn augment_control_query(query: &str, includes: &FieldValues, excludes: &FieldValues) -> String {
    let include_clause = control_clause("#INCLUDE", includes, " OR ");
    let exclude_clause = control_clause("#EXCLUDE", excludes, " AND ");

    if include_clause.is_none() && exclude_clause.is_none() {
        return query.to_string();
    }

    let mut out = format!("({})", query);
    for clause in include_clause.into_iter().chain(exclude_clause) {
        out.push_str(" AND (");
        out.push_str(&clause);
        out.push(')');
    }
    out
}

fn control_clause(function: &str, values: &FieldValues, joiner: &str) -> Option<String> {
    let calls: Vec<String> = values
        .iter()
        .flat_map(|(field, vals)| {
            vals.iter().map(move |v| {
                format!("{}({}, {})", function, field, Literal::Str(v.clone()))
            })
        })
        .collect();

    if calls.is_empty() {
        None
    } else {
        Some(calls.join(joiner))
    }
}
