//! Parse error types

use crate::lexer::LexError;
use crate::token::{Span, Token};
use std::fmt;

/// A syntax error with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

/// The kind of parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// Unexpected token found
    UnexpectedToken { expected: String, found: Token },

    /// Input ended in the middle of a construct
    UnexpectedEof { expected: String },

    /// Tokenization failed
    Lex(LexError),

    /// Well-formed tokens in a place the language does not allow
    InvalidSyntax,
}

impl ParseError {
    pub fn unexpected_token(expected: impl Into<String>, found: Token, span: Span) -> Self {
        let expected = expected.into();
        if found == Token::Eof {
            return Self {
                message: format!("unexpected end of file, expected {}", expected),
                kind: ParseErrorKind::UnexpectedEof { expected },
                span,
            };
        }
        Self {
            message: format!("unexpected {}, expected {}", found, expected),
            kind: ParseErrorKind::UnexpectedToken { expected, found },
            span,
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            span,
            message: message.into(),
        }
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn column(&self) -> u32 {
        self.span.column
    }
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        Self {
            span: error.span(),
            message: error.to_string(),
            kind: ParseErrorKind::Lex(error),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ line {}, column {}.",
            self.message, self.span.line, self.span.column
        )
    }
}

impl std::error::Error for ParseError {}
