//! Expression tree model
//!
//! Responsibilities:
//! - Tagged-union expression tree
//! - Query text lexing and parsing
//! - Canonical printing, including the legacy marker text form
//! - Legacy marker decoding
//! - Include/exclude control-query augmentation

mod ast;
mod control;
mod errors;
mod lexer;
mod marker;
mod parser;
mod printer;

pub use ast::{
    ExpressionNode, FunctionArg, FunctionCall, Literal, Marker, MarkerKind, MarkerPayload,
    Operator, PhraseFunction, Term, WithinFunction,
};
pub use control::{augment_control_query, FieldValues};
pub use errors::{ParseError, ParseErrorCode, ParseResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use marker::{decode_legacy_markers, marker_label};
pub use parser::{parse, Parser};
