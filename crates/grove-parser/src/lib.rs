//! Grove script language front end
//!
//! Grove is the small dynamic language build scripts are written in:
//! newline separated statements, `def` declarations and methods, command
//! calls such as `println "hi"`, and package/import headers.
//!
//! The entry point is [`parse`], which turns source text into a
//! [`ast::ModuleNode`] or the list of syntax errors found.

#![warn(rust_2018_idioms)]

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::ModuleNode;
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, ParseErrorKind, Parser};
pub use token::{Span, Token};

/// Parse a complete script.
pub fn parse(source: &str) -> Result<ModuleNode, Vec<ParseError>> {
    Parser::new(source)?.parse()
}
