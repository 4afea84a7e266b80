//! Recursive-descent query parser
//!
//! Grammar:
//!
//! ```text
//! or       := and ( '||' and )*
//! and      := unary ( '&&' unary )*
//! unary    := '!' unary | primary
//! primary  := '(' or ')' | function | term
//! function := IDENT ( ':' IDENT )? '(' args? ')'
//! term     := IDENT op literal
//! ```
//!
//! Parentheses do not create nodes; a parenthesized junction becomes a
//! nested child of the enclosing junction. Marker subtrees come out as
//! ordinary `And` nodes and are recognized later by
//! [`decode_legacy_markers`](super::decode_legacy_markers).

use super::ast::{
    ExpressionNode, FunctionArg, FunctionCall, Literal, Operator, PhraseFunction, Term,
    WithinFunction,
};
use super::errors::{ParseError, ParseResult};
use super::lexer::{Lexer, Token, TokenKind};

/// Parse query text into a tree
pub fn parse(input: &str) -> ParseResult<ExpressionNode> {
    if input.trim().is_empty() {
        return Err(ParseError::empty_query());
    }

    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens);
    let node = parser.parse_or()?;

    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(ParseError::unexpected_token(
            &trailing.kind,
            "end of query",
            trailing.pos,
        ));
    }

    Ok(node)
}

/// Query parser over a token list
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    // ========== Helpers ==========

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let idx = (self.current + n).min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn error_here(&self, expected: &str) -> ParseError {
        let token = self.peek();
        match token.kind {
            TokenKind::Eof => ParseError::unexpected_end(token.pos),
            ref kind => ParseError::unexpected_token(kind, expected, token.pos),
        }
    }

    // ========== Expressions ==========

    pub fn parse_or(&mut self) -> ParseResult<ExpressionNode> {
        let first = self.parse_and()?;
        if !self.check(&TokenKind::OrOr) {
            return Ok(first);
        }

        let mut children = vec![first];
        while self.check(&TokenKind::OrOr) {
            self.advance();
            children.push(self.parse_and()?);
        }
        Ok(ExpressionNode::Or(children))
    }

    fn parse_and(&mut self) -> ParseResult<ExpressionNode> {
        let first = self.parse_unary()?;
        if !self.check(&TokenKind::AndAnd) {
            return Ok(first);
        }

        let mut children = vec![first];
        while self.check(&TokenKind::AndAnd) {
            self.advance();
            children.push(self.parse_unary()?);
        }
        Ok(ExpressionNode::And(children))
    }

    fn parse_unary(&mut self) -> ParseResult<ExpressionNode> {
        if self.check(&TokenKind::Bang) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(ExpressionNode::negate(operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<ExpressionNode> {
        match self.peek().kind.clone() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                let start = self.advance().pos;
                let next = self.peek().kind.clone();
                match next {
                    TokenKind::Colon => {
                        self.advance();
                        let func = self.expect_identifier("function name")?;
                        self.parse_function(Some(name), func, start)
                    }
                    TokenKind::LParen => self.parse_function(None, name, start),
                    _ => self.parse_term(name),
                }
            }
            _ => Err(self.error_here("term, function, or '('")),
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> ParseResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(expected)),
        }
    }

    fn parse_term(&mut self, field: String) -> ParseResult<ExpressionNode> {
        let op = match self.peek().kind {
            TokenKind::EqEq => Operator::Eq,
            TokenKind::NotEq => Operator::Ne,
            TokenKind::Lt => Operator::Lt,
            TokenKind::Le => Operator::Le,
            TokenKind::Gt => Operator::Gt,
            TokenKind::Ge => Operator::Ge,
            TokenKind::RegexEq => Operator::RegexMatch,
            TokenKind::RegexNe => Operator::RegexNotMatch,
            TokenKind::Assign => Operator::Assign,
            _ => return Err(self.error_here("comparison operator")),
        };
        self.advance();

        let value = self.parse_literal()?;
        Ok(ExpressionNode::Term(Term::new(field, op, value)))
    }

    fn parse_literal(&mut self) -> ParseResult<Literal> {
        let literal = match self.peek().kind.clone() {
            TokenKind::Str(s) => Literal::Str(s),
            TokenKind::Number(n) => Literal::Num(n),
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Null => Literal::Null,
            _ => return Err(self.error_here("literal")),
        };
        self.advance();
        Ok(literal)
    }

    // ========== Functions ==========

    fn parse_function(
        &mut self,
        namespace: Option<String>,
        name: String,
        start: usize,
    ) -> ParseResult<ExpressionNode> {
        self.expect(TokenKind::LParen, "'('")?;

        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let arg = match self.peek().kind.clone() {
                    TokenKind::Ident(id) => {
                        self.advance();
                        FunctionArg::Ident(id)
                    }
                    _ => FunctionArg::Literal(self.parse_literal()?),
                };
                args.push(arg);

                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' or ','")?;

        let call = FunctionCall {
            namespace,
            name,
            args,
        };

        if call.namespace.as_deref() == Some("content") {
            match call.name.as_str() {
                "phrase" => {
                    return phrase_from_args(&call.args)
                        .map(ExpressionNode::Phrase)
                        .ok_or_else(|| ParseError::invalid("malformed content:phrase", start));
                }
                "within" => {
                    return within_from_args(&call.args)
                        .map(ExpressionNode::Within)
                        .ok_or_else(|| ParseError::invalid("malformed content:within", start));
                }
                _ => {}
            }
        }

        Ok(ExpressionNode::Function(call))
    }
}

/// Splits leading identifiers from trailing string words
fn split_idents_and_words(args: &[FunctionArg]) -> Option<(Vec<&str>, Vec<String>)> {
    let ident_count = args
        .iter()
        .take_while(|a| matches!(a, FunctionArg::Ident(_)))
        .count();

    let idents = args[..ident_count]
        .iter()
        .filter_map(|a| match a {
            FunctionArg::Ident(s) => Some(s.as_str()),
            FunctionArg::Literal(_) => None,
        })
        .collect();

    let mut words = Vec::new();
    for arg in &args[ident_count..] {
        match arg {
            FunctionArg::Literal(Literal::Str(w)) => words.push(w.clone()),
            _ => return None,
        }
    }

    if words.is_empty() {
        return None;
    }
    Some((idents, words))
}

fn phrase_from_args(args: &[FunctionArg]) -> Option<PhraseFunction> {
    let (idents, words) = split_idents_and_words(args)?;
    let (field, offsets) = match idents.as_slice() {
        [offsets] => (None, *offsets),
        [field, offsets] => (Some(field.to_string()), *offsets),
        _ => return None,
    };
    Some(PhraseFunction {
        field,
        offsets: offsets.to_string(),
        words,
    })
}

fn within_from_args(args: &[FunctionArg]) -> Option<WithinFunction> {
    let (field, rest) = match args.first()? {
        FunctionArg::Ident(f) => (Some(f.clone()), &args[1..]),
        FunctionArg::Literal(_) => (None, args),
    };

    let distance = match rest.first()? {
        FunctionArg::Literal(Literal::Num(n)) => n.parse::<u32>().ok()?,
        _ => return None,
    };

    let (idents, words) = split_idents_and_words(&rest[1..])?;
    let offsets = match idents.as_slice() {
        [offsets] => offsets.to_string(),
        _ => return None,
    };

    Some(WithinFunction {
        field,
        distance,
        offsets,
        words,
    })
}
