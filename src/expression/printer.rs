//! Canonical query text
//!
//! Junctions print their children joined by `&&` / `||`; compound children
//! are parenthesized. Markers print in their legacy textual form
//! `((LABEL = true) && (source))`, so printed text parses back to the same
//! tree after marker decoding.

use std::fmt;

use super::ast::{
    ExpressionNode, FunctionArg, FunctionCall, Literal, Marker, MarkerPayload, PhraseFunction,
    Term, WithinFunction,
};

/// Writes a string literal with `'` and `\` escaped
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            other => write!(f, "{}", other)?,
        }
    }
    f.write_str("'")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write_quoted(f, s),
            Literal::Num(n) => f.write_str(n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.as_str(), self.value)
    }
}

impl fmt::Display for FunctionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionArg::Ident(id) => f.write_str(id),
            FunctionArg::Literal(lit) => write!(f, "{}", lit),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{}:", ns)?;
        }
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

fn write_words(f: &mut fmt::Formatter<'_>, words: &[String]) -> fmt::Result {
    for word in words {
        f.write_str(", ")?;
        write_quoted(f, word)?;
    }
    Ok(())
}

impl fmt::Display for PhraseFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("content:phrase(")?;
        if let Some(field) = &self.field {
            write!(f, "{}, ", field)?;
        }
        f.write_str(&self.offsets)?;
        write_words(f, &self.words)?;
        f.write_str(")")
    }
}

impl fmt::Display for WithinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("content:within(")?;
        if let Some(field) = &self.field {
            write!(f, "{}, ", field)?;
        }
        write!(f, "{}, {}", self.distance, self.offsets)?;
        write_words(f, &self.words)?;
        f.write_str(")")
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(({} = true) && (", self.kind().label())?;
        match self.payload() {
            MarkerPayload::Source(source) => write!(f, "{}", source)?,
            MarkerPayload::Overflow(marker) => {
                for (i, assignment) in marker.to_assignments().iter().enumerate() {
                    if i > 0 {
                        f.write_str(" && ")?;
                    }
                    write!(f, "({})", assignment)?;
                }
            }
        }
        f.write_str("))")
    }
}

fn write_junction(
    f: &mut fmt::Formatter<'_>,
    children: &[ExpressionNode],
    separator: &str,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        if child.is_compound() {
            write!(f, "({})", child)?;
        } else {
            write!(f, "{}", child)?;
        }
    }
    Ok(())
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionNode::And(children) => write_junction(f, children, " && "),
            ExpressionNode::Or(children) => write_junction(f, children, " || "),
            ExpressionNode::Not(children) => match children.as_slice() {
                [] => Ok(()),
                [only] => write!(f, "!({})", only),
                [base, negated @ ..] => {
                    if base.is_compound() {
                        write!(f, "({})", base)?;
                    } else {
                        write!(f, "{}", base)?;
                    }
                    for child in negated {
                        write!(f, " && !({})", child)?;
                    }
                    Ok(())
                }
            },
            ExpressionNode::Term(term) => write!(f, "{}", term),
            ExpressionNode::Function(call) => write!(f, "{}", call),
            ExpressionNode::Phrase(phrase) => write!(f, "{}", phrase),
            ExpressionNode::Within(within) => write!(f, "{}", within),
            ExpressionNode::Marker(marker) => write!(f, "{}", marker),
        }
    }
}
