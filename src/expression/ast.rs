//! Expression tree structures
//!
//! A query is a single `ExpressionNode` root. Rewrites consume a node and
//! return a new one; nodes carry no parent links.

use crate::overflow::OverflowMarker;

/// Comparison and assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=~`
    RegexMatch,
    /// `!~`
    RegexNotMatch,
    /// `=` (marker assignments only)
    Assign,
}

impl Operator {
    /// Returns the operator as written in query text
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::RegexMatch => "=~",
            Operator::RegexNotMatch => "!~",
            Operator::Assign => "=",
        }
    }

    /// Returns true for `<`, `<=`, `>`, `>=`
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge
        )
    }
}

/// Literal values on the right-hand side of a term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Str(String),
    /// Numbers keep their source text
    Num(String),
    Bool(bool),
    Null,
}

impl Literal {
    /// Returns the literal as an index value, if it has one
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Literal::Str(s) | Literal::Num(s) => Some(s),
            Literal::Bool(_) | Literal::Null => None,
        }
    }
}

/// A fielded comparison: `FIELD op value`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    pub field: String,
    pub op: Operator,
    pub value: Literal,
}

impl Term {
    pub fn new(field: impl Into<String>, op: Operator, value: Literal) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// `FIELD == 'value'`
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Operator::Eq, Literal::Str(value.into()))
    }

    /// `name = 'value'`, the marker assignment form
    pub fn assign(name: impl Into<String>, value: Literal) -> Self {
        Self::new(name, Operator::Assign, value)
    }

    /// Returns true for `==` against a string or number
    pub fn is_equality(&self) -> bool {
        self.op == Operator::Eq && self.value.as_value().is_some()
    }
}

/// A function argument: bare identifier or literal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionArg {
    Ident(String),
    Literal(Literal),
}

/// `namespace:name(args)` or `name(args)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCall {
    pub namespace: Option<String>,
    pub name: String,
    pub args: Vec<FunctionArg>,
}

/// `content:phrase(FIELD?, termOffsetMap, 'w1', 'w2', ...)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhraseFunction {
    /// Absent when the phrase applies to the whole document
    pub field: Option<String>,
    /// Name of the term-offset map argument
    pub offsets: String,
    pub words: Vec<String>,
}

/// `content:within(FIELD?, distance, termOffsetMap, 'w1', ...)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WithinFunction {
    pub field: Option<String>,
    pub distance: u32,
    pub offsets: String,
    pub words: Vec<String>,
}

/// Marker kinds and their reserved labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKind {
    /// Evaluate against the document, not the index
    Delayed,
    /// Never run against the index
    EvaluationOnly,
    /// Source falls in a known index hole
    IndexHole,
    /// Source is a bounded range over one field
    BoundedRange,
    /// Oversized OR list carried as id/field/params
    ExceededOr,
    /// Value expansion exceeded its threshold
    ExceededValue,
    /// Term expansion exceeded its threshold
    ExceededTerm,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 7] = [
        MarkerKind::Delayed,
        MarkerKind::EvaluationOnly,
        MarkerKind::IndexHole,
        MarkerKind::BoundedRange,
        MarkerKind::ExceededOr,
        MarkerKind::ExceededValue,
        MarkerKind::ExceededTerm,
    ];

    /// The reserved assignment name
    pub fn label(&self) -> &'static str {
        match self {
            MarkerKind::Delayed => "_Delayed_",
            MarkerKind::EvaluationOnly => "_Eval_",
            MarkerKind::IndexHole => "_Hole_",
            MarkerKind::BoundedRange => "_Bounded_",
            MarkerKind::ExceededOr => "_List_",
            MarkerKind::ExceededValue => "_Value_",
            MarkerKind::ExceededTerm => "_Term_",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.label() == label)
    }
}

/// What a marker carries
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerPayload {
    /// The wrapped subtree
    Source(Box<ExpressionNode>),
    /// A decoded overflow list
    Overflow(OverflowMarker),
}

/// A marker node
///
/// `ExceededOr` markers are built with [`Marker::overflow`]; every other kind
/// wraps a source subtree with [`Marker::wrap`].
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    kind: MarkerKind,
    payload: MarkerPayload,
}

impl Marker {
    pub fn wrap(kind: MarkerKind, source: ExpressionNode) -> Self {
        Self {
            kind,
            payload: MarkerPayload::Source(Box::new(source)),
        }
    }

    pub fn overflow(marker: OverflowMarker) -> Self {
        Self {
            kind: MarkerKind::ExceededOr,
            payload: MarkerPayload::Overflow(marker),
        }
    }

    pub fn kind(&self) -> MarkerKind {
        self.kind
    }

    pub fn payload(&self) -> &MarkerPayload {
        &self.payload
    }

    pub fn into_parts(self) -> (MarkerKind, MarkerPayload) {
        (self.kind, self.payload)
    }

    /// The wrapped subtree, for source markers
    pub fn source(&self) -> Option<&ExpressionNode> {
        match &self.payload {
            MarkerPayload::Source(node) => Some(node),
            MarkerPayload::Overflow(_) => None,
        }
    }

    /// The overflow list, for `ExceededOr` markers
    pub fn overflow_marker(&self) -> Option<&OverflowMarker> {
        match &self.payload {
            MarkerPayload::Overflow(m) => Some(m),
            MarkerPayload::Source(_) => None,
        }
    }
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    And(Vec<ExpressionNode>),
    Or(Vec<ExpressionNode>),
    /// First child is the base; any further children are negated and
    /// AND-joined with it. A single child is plain negation.
    Not(Vec<ExpressionNode>),
    Term(Term),
    Function(FunctionCall),
    Phrase(PhraseFunction),
    Within(WithinFunction),
    Marker(Marker),
}

impl ExpressionNode {
    /// `FIELD == 'value'`
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        ExpressionNode::Term(Term::eq(field, value))
    }

    /// Plain negation
    pub fn negate(node: ExpressionNode) -> Self {
        ExpressionNode::Not(vec![node])
    }

    pub fn marker(kind: MarkerKind, source: ExpressionNode) -> Self {
        ExpressionNode::Marker(Marker::wrap(kind, source))
    }

    /// Child nodes of a junction or negation; empty for leaves and markers
    pub fn children(&self) -> &[ExpressionNode] {
        match self {
            ExpressionNode::And(c) | ExpressionNode::Or(c) | ExpressionNode::Not(c) => c,
            ExpressionNode::Term(_)
            | ExpressionNode::Function(_)
            | ExpressionNode::Phrase(_)
            | ExpressionNode::Within(_)
            | ExpressionNode::Marker(_) => &[],
        }
    }

    /// Returns true if this node needs parentheses inside a junction
    pub fn is_compound(&self) -> bool {
        match self {
            ExpressionNode::And(_) | ExpressionNode::Or(_) => true,
            ExpressionNode::Not(c) => c.len() > 1,
            _ => false,
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            ExpressionNode::Term(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            ExpressionNode::Marker(m) => Some(m),
            _ => None,
        }
    }

    /// All terms in pre-order, including those inside source markers
    pub fn terms(&self) -> Vec<&Term> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a Term>) {
        match self {
            ExpressionNode::Term(t) => out.push(t),
            ExpressionNode::Marker(m) => {
                if let Some(source) = m.source() {
                    source.collect_terms(out);
                }
            }
            ExpressionNode::And(c) | ExpressionNode::Or(c) | ExpressionNode::Not(c) => {
                for child in c {
                    child.collect_terms(out);
                }
            }
            ExpressionNode::Function(_)
            | ExpressionNode::Phrase(_)
            | ExpressionNode::Within(_) => {}
        }
    }

    /// All markers in pre-order
    pub fn markers(&self) -> Vec<&Marker> {
        let mut out = Vec::new();
        self.collect_markers(&mut out);
        out
    }

    fn collect_markers<'a>(&'a self, out: &mut Vec<&'a Marker>) {
        match self {
            ExpressionNode::Marker(m) => {
                out.push(m);
                if let Some(source) = m.source() {
                    source.collect_markers(out);
                }
            }
            ExpressionNode::And(c) | ExpressionNode::Or(c) | ExpressionNode::Not(c) => {
                for child in c {
                    child.collect_markers(out);
                }
            }
            ExpressionNode::Term(_)
            | ExpressionNode::Function(_)
            | ExpressionNode::Phrase(_)
            | ExpressionNode::Within(_) => {}
        }
    }

    /// Overflow markers in pre-order
    pub fn overflow_markers(&self) -> Vec<&OverflowMarker> {
        self.markers()
            .into_iter()
            .filter_map(|m| m.overflow_marker())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_labels_round_trip() {
        for kind in MarkerKind::ALL {
            assert_eq!(MarkerKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(MarkerKind::from_label("_Unknown_"), None);
    }

    #[test]
    fn test_equality_requires_value() {
        assert!(Term::eq("FOO", "bar").is_equality());
        assert!(!Term::new("FOO", Operator::Eq, Literal::Null).is_equality());
        assert!(!Term::new("FOO", Operator::Ne, Literal::Str("x".into())).is_equality());
    }

    #[test]
    fn test_terms_descend_into_markers() {
        let tree = ExpressionNode::And(vec![
            ExpressionNode::eq("A", "1"),
            ExpressionNode::marker(MarkerKind::Delayed, ExpressionNode::eq("B", "2")),
        ]);
        let fields: Vec<_> = tree.terms().iter().map(|t| t.field.as_str()).collect();
        assert_eq!(fields, vec!["A", "B"]);
        assert_eq!(tree.markers().len(), 1);
    }

    #[test]
    fn test_compound_detection() {
        assert!(ExpressionNode::Or(vec![]).is_compound());
        assert!(!ExpressionNode::negate(ExpressionNode::eq("A", "1")).is_compound());
        assert!(!ExpressionNode::eq("A", "1").is_compound());
    }
}
