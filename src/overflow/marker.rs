//! ExceededOr overflow markers
//!
//! An overflow marker stands in for an OR list too large to enumerate in the
//! query. In query text it is three assignments ANDed together:
//!
//! ```text
//! (id = '<uuid>') && (field = 'FOO') && (params = '{"values":["a","b"]}')
//! ```
//!
//! `params` holds exactly one of `fstURI`, `values`, or `ranges`.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::MalformedRangePolicy;
use crate::expression::{ExpressionNode, Literal, Operator, Term};

use super::errors::{OverflowError, OverflowResult};
use super::range_literal::{merge_ranges, RangeLiteral};

/// Reserved assignment names
pub const ID_ASSIGNMENT: &str = "id";
pub const FIELD_ASSIGNMENT: &str = "field";
pub const PARAMS_ASSIGNMENT: &str = "params";

/// What the marker carries in place of the OR list
#[derive(Debug, Clone, PartialEq)]
pub enum OverflowPayload {
    /// Values stored externally, referenced by URI
    FstReference { uri: String },
    /// Values carried inline
    ValueSet { values: BTreeSet<String> },
    /// Sorted, disjoint row ranges
    MergedRanges { ranges: Vec<RangeLiteral> },
}

impl OverflowPayload {
    /// Short name for logs and explain output
    pub fn kind_name(&self) -> &'static str {
        match self {
            OverflowPayload::FstReference { .. } => "fst",
            OverflowPayload::ValueSet { .. } => "values",
            OverflowPayload::MergedRanges { .. } => "ranges",
        }
    }
}

/// A decoded marker plus any range literals dropped along the way
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedOverflow {
    pub marker: OverflowMarker,
    /// Malformed literals skipped under the drop policy
    pub dropped: Vec<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverflowParams {
    #[serde(rename = "fstURI", default)]
    fst_uri: Option<String>,
    #[serde(default)]
    values: Option<BTreeSet<String>>,
    #[serde(default)]
    ranges: Option<Vec<Vec<String>>>,
}

/// An ExceededOr marker
#[derive(Debug, Clone, PartialEq)]
pub struct OverflowMarker {
    id: String,
    field: String,
    payload: OverflowPayload,
}

impl OverflowMarker {
    fn build(field: impl Into<String>, payload: OverflowPayload) -> OverflowResult<Self> {
        let field = field.into();
        if field.is_empty() {
            return Err(OverflowError::marker_encode_failure("field is empty"));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            field,
            payload,
        })
    }

    /// Marker referencing an externalized value set
    pub fn from_fst_uri(field: impl Into<String>, uri: impl Into<String>) -> OverflowResult<Self> {
        let uri = uri.into();
        if uri.is_empty() {
            return Err(OverflowError::marker_encode_failure("fst uri is empty"));
        }
        Self::build(field, OverflowPayload::FstReference { uri })
    }

    /// Marker carrying its values inline
    pub fn from_values(field: impl Into<String>, values: BTreeSet<String>) -> OverflowResult<Self> {
        if values.is_empty() {
            return Err(OverflowError::marker_encode_failure("value set is empty"));
        }
        Self::build(field, OverflowPayload::ValueSet { values })
    }

    /// Marker carrying merged row ranges
    pub fn from_ranges(field: impl Into<String>, ranges: Vec<RangeLiteral>) -> OverflowResult<Self> {
        if ranges.is_empty() {
            return Err(OverflowError::marker_encode_failure("range list is empty"));
        }
        Self::build(
            field,
            OverflowPayload::MergedRanges {
                ranges: merge_ranges(ranges),
            },
        )
    }

    /// Values become zero-width ranges and are merged with `ranges`.
    /// Without ranges this is [`from_values`](Self::from_values).
    pub fn from_values_and_ranges(
        field: impl Into<String>,
        values: BTreeSet<String>,
        ranges: Vec<RangeLiteral>,
    ) -> OverflowResult<Self> {
        if ranges.is_empty() {
            return Self::from_values(field, values);
        }
        let all = values.into_iter().map(RangeLiteral::point).chain(ranges);
        Self::from_ranges(field, all.collect())
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn payload(&self) -> &OverflowPayload {
        &self.payload
    }

    /// Number of values or ranges carried inline (zero for FST references)
    pub fn inline_len(&self) -> usize {
        match &self.payload {
            OverflowPayload::FstReference { .. } => 0,
            OverflowPayload::ValueSet { values } => values.len(),
            OverflowPayload::MergedRanges { ranges } => ranges.len(),
        }
    }

    /// Row ranges this marker covers; empty for FST references
    pub fn row_ranges(&self) -> Vec<RangeLiteral> {
        match &self.payload {
            OverflowPayload::FstReference { .. } => Vec::new(),
            OverflowPayload::ValueSet { values } => {
                values.iter().cloned().map(RangeLiteral::point).collect()
            }
            OverflowPayload::MergedRanges { ranges } => ranges.clone(),
        }
    }

    /// The `params` JSON object
    pub fn params_json(&self) -> String {
        let mut params = Map::new();
        match &self.payload {
            OverflowPayload::FstReference { uri } => {
                params.insert("fstURI".to_string(), Value::String(uri.clone()));
            }
            OverflowPayload::ValueSet { values } => {
                let values = values.iter().cloned().map(Value::String).collect();
                params.insert("values".to_string(), Value::Array(values));
            }
            OverflowPayload::MergedRanges { ranges } => {
                let ranges = ranges
                    .iter()
                    .map(|r| Value::Array(r.encode().into_iter().map(Value::String).collect()))
                    .collect();
                params.insert("ranges".to_string(), Value::Array(ranges));
            }
        }
        Value::Object(params).to_string()
    }

    /// The id/field/params assignment triple
    pub fn to_assignments(&self) -> Vec<Term> {
        vec![
            Term::assign(ID_ASSIGNMENT, Literal::Str(self.id.clone())),
            Term::assign(FIELD_ASSIGNMENT, Literal::Str(self.field.clone())),
            Term::assign(PARAMS_ASSIGNMENT, Literal::Str(self.params_json())),
        ]
    }

    /// Decode from the three assignment values
    pub fn from_params(
        id: &str,
        field: &str,
        params: &str,
        policy: MalformedRangePolicy,
    ) -> OverflowResult<DecodedOverflow> {
        if id.is_empty() || field.is_empty() {
            return Err(OverflowError::marker_decode_failure("id or field is empty"));
        }

        let parsed: OverflowParams = serde_json::from_str(params)
            .map_err(|e| OverflowError::marker_decode_failure(format!("params: {}", e)))?;

        let mut dropped = Vec::new();
        let payload = match parsed {
            OverflowParams {
                fst_uri: Some(uri),
                values: None,
                ranges: None,
            } if !uri.is_empty() => OverflowPayload::FstReference { uri },
            OverflowParams {
                fst_uri: None,
                values: Some(values),
                ranges: None,
            } if !values.is_empty() => OverflowPayload::ValueSet { values },
            OverflowParams {
                fst_uri: None,
                values: None,
                ranges: Some(literals),
            } => {
                let mut ranges = Vec::with_capacity(literals.len());
                for literal in literals {
                    match RangeLiteral::decode(&literal) {
                        Ok(range) => ranges.push(range),
                        Err(e) => match policy {
                            MalformedRangePolicy::Fail => return Err(e),
                            MalformedRangePolicy::Drop => dropped.push(literal),
                        },
                    }
                }
                if ranges.is_empty() {
                    return Err(OverflowError::marker_decode_failure("no usable ranges"));
                }
                OverflowPayload::MergedRanges {
                    ranges: merge_ranges(ranges),
                }
            }
            _ => {
                return Err(OverflowError::marker_decode_failure(
                    "params must hold exactly one non-empty fstURI, values, or ranges",
                ))
            }
        };

        Ok(DecodedOverflow {
            marker: OverflowMarker {
                id: id.to_string(),
                field: field.to_string(),
                payload,
            },
            dropped,
        })
    }

    /// Match `children` against the id/field/params triple.
    ///
    /// Returns `None` when the children are not that triple (not a marker),
    /// and `Some(Err)` when they are but the payload does not decode.
    pub fn decode_assignments(
        children: &[ExpressionNode],
        policy: MalformedRangePolicy,
    ) -> Option<OverflowResult<DecodedOverflow>> {
        if children.len() != 3 {
            return None;
        }

        let mut id = None;
        let mut field = None;
        let mut params = None;

        for child in children {
            let term = child.as_term()?;
            if term.op != Operator::Assign {
                return None;
            }
            let value = match &term.value {
                Literal::Str(s) => s.as_str(),
                _ => return None,
            };
            match term.field.as_str() {
                ID_ASSIGNMENT => id = Some(value),
                FIELD_ASSIGNMENT => field = Some(value),
                PARAMS_ASSIGNMENT => params = Some(value),
                _ => return None,
            }
        }

        Some(Self::from_params(id?, field?, params?, policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_value_set_params() {
        let marker = OverflowMarker::from_values("FOO", set(&["b", "a"])).unwrap();
        assert_eq!(marker.params_json(), r#"{"values":["a","b"]}"#);
    }

    #[test]
    fn test_fst_params() {
        let marker = OverflowMarker::from_fst_uri("FOO", "hdfs://fst/1").unwrap();
        assert_eq!(marker.params_json(), r#"{"fstURI":"hdfs://fst/1"}"#);
        assert!(marker.row_ranges().is_empty());
    }

    #[test]
    fn test_values_and_ranges_union() {
        let marker = OverflowMarker::from_values_and_ranges(
            "FOO",
            set(&["b", "z"]),
            vec![RangeLiteral::inclusive("a", "c")],
        )
        .unwrap();
        assert_eq!(
            marker.payload(),
            &OverflowPayload::MergedRanges {
                ranges: vec![RangeLiteral::inclusive("a", "c"), RangeLiteral::point("z")]
            }
        );
        assert_eq!(marker.params_json(), r#"{"ranges":[["[a","c]"],["z"]]}"#);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = OverflowMarker::from_values("FOO", set(&["a"])).unwrap();
        let b = OverflowMarker::from_values("FOO", set(&["a"])).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(OverflowMarker::from_values("FOO", BTreeSet::new()).is_err());
        assert!(OverflowMarker::from_ranges("FOO", Vec::new()).is_err());
        assert!(OverflowMarker::from_fst_uri("", "uri").is_err());
    }

    #[test]
    fn test_params_round_trip() {
        let marker = OverflowMarker::from_values("FOO", set(&["a", "b"]))
            .unwrap()
            .with_id("id-1");
        let decoded = OverflowMarker::from_params(
            "id-1",
            "FOO",
            &marker.params_json(),
            MalformedRangePolicy::Fail,
        )
        .unwrap();
        assert_eq!(decoded.marker, marker);
        assert!(decoded.dropped.is_empty());
    }

    #[test]
    fn test_two_payloads_rejected() {
        let err = OverflowMarker::from_params(
            "x",
            "FOO",
            r#"{"values":["a"],"fstURI":"u"}"#,
            MalformedRangePolicy::Fail,
        )
        .unwrap_err();
        assert_eq!(err.code().code(), "SQ_MARKER_DECODE_FAILURE");
    }

    #[test]
    fn test_malformed_literal_fails_under_fail_policy() {
        let err = OverflowMarker::from_params(
            "x",
            "FOO",
            r#"{"ranges":[["a","b"]]}"#,
            MalformedRangePolicy::Fail,
        )
        .unwrap_err();
        assert_eq!(err.code().code(), "SQ_RANGE_LITERAL_MALFORMED");
    }

    #[test]
    fn test_decode_assignments_ignores_other_shapes() {
        let children = vec![
            ExpressionNode::eq("FOO", "a"),
            ExpressionNode::eq("BAR", "b"),
            ExpressionNode::eq("BAZ", "c"),
        ];
        assert!(OverflowMarker::decode_assignments(&children, MalformedRangePolicy::Fail).is_none());
    }

    #[test]
    fn test_decode_assignments_any_order() {
        let marker = OverflowMarker::from_values("FOO", set(&["a"])).unwrap();
        let mut children: Vec<ExpressionNode> = marker
            .to_assignments()
            .into_iter()
            .map(ExpressionNode::Term)
            .collect();
        children.reverse();
        let decoded = OverflowMarker::decode_assignments(&children, MalformedRangePolicy::Fail)
            .unwrap()
            .unwrap();
        assert_eq!(decoded.marker, marker);
    }
}
