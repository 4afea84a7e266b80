//! Query text lexer
//!
//! Converts query text into tokens. Handles quoted strings with backslash
//! escapes, numbers, identifiers, keyword forms of the boolean operators,
//! and the comparison operators.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use super::errors::{ParseError, ParseResult};

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(String),
    True,
    False,
    Null,

    AndAnd,
    OrOr,
    Bang,

    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    RegexEq,
    RegexNe,
    Assign,

    LParen,
    RParen,
    Comma,
    Colon,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) | TokenKind::Number(s) => write!(f, "{}", s),
            TokenKind::Str(s) => write!(f, "'{}'", s),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Null => write!(f, "null"),
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::OrOr => write!(f, "||"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Le => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Ge => write!(f, ">="),
            TokenKind::RegexEq => write!(f, "=~"),
            TokenKind::RegexNe => write!(f, "!~"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Eof => write!(f, "end of query"),
        }
    }
}

/// A token and its byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

/// Query lexer
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire input, stopping at the first error
    pub fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        while let Some((pos, c)) = self.chars.next() {
            self.scan_token(pos, c)?;
        }

        self.tokens.push(Token {
            kind: TokenKind::Eof,
            pos: self.input.len(),
        });
        Ok(self.tokens)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn next_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, pos: usize) {
        self.tokens.push(Token { kind, pos });
    }

    fn scan_token(&mut self, pos: usize, c: char) -> ParseResult<()> {
        match c {
            ' ' | '\t' | '\r' | '\n' => {}

            '(' => self.push(TokenKind::LParen, pos),
            ')' => self.push(TokenKind::RParen, pos),
            ',' => self.push(TokenKind::Comma, pos),
            ':' => self.push(TokenKind::Colon, pos),

            '&' => {
                if !self.next_if('&') {
                    return Err(ParseError::invalid_character('&', pos));
                }
                self.push(TokenKind::AndAnd, pos);
            }
            '|' => {
                if !self.next_if('|') {
                    return Err(ParseError::invalid_character('|', pos));
                }
                self.push(TokenKind::OrOr, pos);
            }

            '=' => {
                if self.next_if('=') {
                    self.push(TokenKind::EqEq, pos);
                } else if self.next_if('~') {
                    self.push(TokenKind::RegexEq, pos);
                } else {
                    self.push(TokenKind::Assign, pos);
                }
            }
            '!' => {
                if self.next_if('=') {
                    self.push(TokenKind::NotEq, pos);
                } else if self.next_if('~') {
                    self.push(TokenKind::RegexNe, pos);
                } else {
                    self.push(TokenKind::Bang, pos);
                }
            }
            '<' => {
                if self.next_if('=') {
                    self.push(TokenKind::Le, pos);
                } else {
                    self.push(TokenKind::Lt, pos);
                }
            }
            '>' => {
                if self.next_if('=') {
                    self.push(TokenKind::Ge, pos);
                } else {
                    self.push(TokenKind::Gt, pos);
                }
            }

            '\'' | '"' => self.scan_string(pos, c)?,

            '-' if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                self.scan_number(pos)
            }
            c if c.is_ascii_digit() => self.scan_number(pos),

            c if is_ident_start(c) => self.scan_identifier(pos, c),

            other => return Err(ParseError::invalid_character(other, pos)),
        }
        Ok(())
    }

    fn scan_string(&mut self, start: usize, quote: char) -> ParseResult<()> {
        let mut value = String::new();

        loop {
            match self.chars.next() {
                None => return Err(ParseError::unterminated_string(start)),
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => match self.peek() {
                    // Only the quote and the backslash itself are escapes;
                    // anything else keeps its backslash (regex text)
                    Some(next) if next == quote || next == '\\' => {
                        value.push(next);
                        self.chars.next();
                    }
                    _ => value.push('\\'),
                },
                Some((_, c)) => value.push(c),
            }
        }

        self.push(TokenKind::Str(value), start);
        Ok(())
    }

    fn scan_number(&mut self, start: usize) {
        let mut end = start + 1;
        let mut seen_dot = false;

        while let Some(&(pos, c)) = self.chars.peek() {
            if c.is_ascii_digit() || (c == '.' && !seen_dot) {
                seen_dot |= c == '.';
                end = pos + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }

        self.push(TokenKind::Number(self.input[start..end].to_string()), start);
    }

    fn scan_identifier(&mut self, start: usize, first: char) {
        let mut end = start + first.len_utf8();

        while let Some(&(pos, c)) = self.chars.peek() {
            if is_ident_continue(c) {
                end = pos + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }

        let text = &self.input[start..end];
        let kind = match text.to_ascii_lowercase().as_str() {
            "and" => TokenKind::AndAnd,
            "or" => TokenKind::OrOr,
            "not" => TokenKind::Bang,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(text.to_string()),
        };
        self.push(kind, start);
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$' || c == '#'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_term_tokens() {
        assert_eq!(
            kinds("FOO == 'bar'"),
            vec![
                TokenKind::Ident("FOO".into()),
                TokenKind::EqEq,
                TokenKind::Str("bar".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= == != =~ !~ < <= > >= && || !"),
            vec![
                TokenKind::Assign,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::RegexEq,
                TokenKind::RegexNe,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_keyword_operators() {
        assert_eq!(
            kinds("a AND b or not c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::AndAnd,
                TokenKind::Ident("b".into()),
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Ident("c".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r"'it\'s' 'a\.b' 'c\\d'"),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str(r"a\.b".into()),
                TokenKind::Str(r"c\d".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 -2 3.5"),
            vec![
                TokenKind::Number("1".into()),
                TokenKind::Number("-2".into()),
                TokenKind::Number("3.5".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_non_ascii_identifiers() {
        assert_eq!(
            kinds("é == 'a' && NÄME == 'b'"),
            vec![
                TokenKind::Ident("é".into()),
                TokenKind::EqEq,
                TokenKind::Str("a".into()),
                TokenKind::AndAnd,
                TokenKind::Ident("NÄME".into()),
                TokenKind::EqEq,
                TokenKind::Str("b".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_hash_identifier() {
        assert_eq!(kinds("#INCLUDE")[0], TokenKind::Ident("#INCLUDE".into()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("FOO == 'bar").tokenize().unwrap_err();
        assert_eq!(err.position(), 7);
    }

    #[test]
    fn test_single_ampersand_rejected() {
        assert!(Lexer::new("a & b").tokenize().is_err());
    }
}
