//! Parser for Grove scripts
//!
//! A recursive descent parser over a pre-tokenized input. Newlines are
//! statement separators, so the parser skips them explicitly only where a
//! construct may continue on the next line (after operators, commas and
//! opening brackets).

pub mod error;
mod expr;
mod stmt;

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{Span, Token};

pub use error::{ParseError, ParseErrorKind};

/// Parser state.
pub struct Parser {
    /// Pre-tokenized input, always terminated by `Token::Eof`
    tokens: Vec<(Token, Span)>,

    /// Current position in token stream
    pos: usize,

    /// Accumulated parse errors (allows continuing after errors)
    errors: Vec<ParseError>,
}

impl Parser {
    /// Create a new parser from source code.
    pub fn new(source: &str) -> Result<Self, Vec<ParseError>> {
        let tokens = Lexer::new(source)
            .tokenize()
            .map_err(|errors| errors.into_iter().map(ParseError::from).collect::<Vec<_>>())?;

        Ok(Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        })
    }

    /// Parse the entire script into a [`ModuleNode`].
    ///
    /// Returns all accumulated errors on failure, in source order.
    pub fn parse(mut self) -> Result<ModuleNode, Vec<ParseError>> {
        let start_span = self.current_span();
        let mut module = ModuleNode {
            package: None,
            imports: Vec::new(),
            star_imports: Vec::new(),
            statements: Vec::new(),
            methods: Vec::new(),
            span: start_span,
        };

        self.skip_separators();
        while !self.at_eof() {
            let result = self
                .parse_top_level(&mut module)
                .and_then(|()| self.expect_statement_end(false));
            if let Err(err) = result {
                self.errors.push(err);
                self.sync_to_statement_boundary();
            }
            self.skip_separators();
        }

        module.span = start_span.merge(&self.current_span());

        if self.errors.is_empty() {
            Ok(module)
        } else {
            Err(self.errors)
        }
    }

    fn parse_top_level(&mut self, module: &mut ModuleNode) -> Result<(), ParseError> {
        match self.current() {
            Token::Package => {
                let package = self.parse_package()?;
                if module.package.is_some()
                    || !module.imports.is_empty()
                    || !module.star_imports.is_empty()
                    || !module.statements.is_empty()
                    || !module.methods.is_empty()
                {
                    return Err(ParseError::invalid_syntax(
                        "package definition must be the first statement",
                        package.span,
                    ));
                }
                module.package = Some(package);
            }
            Token::Import => self.parse_import(module)?,
            Token::Def if self.is_method_declaration() => {
                let method = self.parse_method()?;
                module.methods.push(method);
            }
            _ => {
                let stmt = self.parse_statement()?;
                module.statements.push(stmt);
            }
        }
        Ok(())
    }

    // ===== Token helpers =====

    fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index].0
    }

    fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn advance(&mut self) -> (Token, Span) {
        let entry = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        entry
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<Span, ParseError> {
        if self.check(&token) {
            Ok(self.advance().1)
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.current().clone() {
            Token::Identifier(name) => {
                let span = self.advance().1;
                Ok((name, span))
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::unexpected_token(expected, self.current().clone(), self.current_span())
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current(), Token::Newline) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while self.current().is_separator() {
            self.advance();
        }
    }

    /// A statement must be followed by a separator, the end of input, or,
    /// inside a block, the closing brace.
    fn expect_statement_end(&self, in_block: bool) -> Result<(), ParseError> {
        match self.current() {
            Token::Newline | Token::Semicolon | Token::Eof => Ok(()),
            Token::RightBrace if in_block => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    /// Skip to the next statement separator after an error.
    fn sync_to_statement_boundary(&mut self) {
        while !self.at_eof() && !self.current().is_separator() {
            self.advance();
        }
    }
}
