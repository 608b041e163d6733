//! Compilation errors
//!
//! Errors found while compiling are collected per unit in an
//! [`ErrorCollector`] and raised together as [`MultipleCompilationErrors`]
//! at the end of the phase that found them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use grove_parser::ParseError;
use termcolor::NoColor;
use thiserror::Error;

use crate::phase::Phase;

pub type CompileResult<T> = Result<T, CompileError>;

/// Errors raised by compiler passes, operations and verifiers
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Too many local variables in method {method} (max 65535)")]
    TooManyLocals { method: String },

    #[error("Too many arguments in call to {method} (max 65535)")]
    TooManyArguments { method: String },

    /// A class node was rejected by a verifier
    #[error("{message}")]
    Verification { class: String, message: String },

    /// A phase operation failed
    #[error("{message}")]
    Operation { message: String },

    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl CompileError {
    pub fn verification(class: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::Verification {
            class: class.into(),
            message: message.into(),
        }
    }

    pub fn operation(message: impl Into<String>) -> Self {
        CompileError::Operation {
            message: message.into(),
        }
    }
}

/// A syntax or resolution error at a source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxException {
    pub message: String,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
    /// Byte range in the source text
    pub start: usize,
    pub end: usize,
}

impl From<&ParseError> for SyntaxException {
    fn from(error: &ParseError) -> Self {
        Self {
            message: error.message.clone(),
            line: error.line(),
            column: error.column(),
            start: error.span.start,
            end: error.span.end,
        }
    }
}

/// A [`SyntaxException`] attributed to a source unit
#[derive(Debug, Clone)]
pub struct SyntaxErrorMessage {
    cause: SyntaxException,
    source_name: String,
    source_text: Arc<str>,
}

impl SyntaxErrorMessage {
    pub fn new(cause: SyntaxException, source_name: impl Into<String>, source_text: Arc<str>) -> Self {
        Self {
            cause,
            source_name: source_name.into(),
            source_text,
        }
    }

    pub fn cause(&self) -> &SyntaxException {
        &self.cause
    }

    /// Name of the source unit the error is reported against
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Report the error against a different name, e.g. a user facing
    /// display name instead of the generated class name.
    pub fn set_source_name(&mut self, name: impl Into<String>) {
        self.source_name = name.into();
    }

    pub fn line(&self) -> u32 {
        self.cause.line
    }
}

impl fmt::Display for SyntaxErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {} @ line {}, column {}.",
            self.source_name, self.cause.line, self.cause.message, self.cause.line, self.cause.column
        )
    }
}

/// An error without a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleMessage {
    pub message: String,
    pub source_name: Option<String>,
}

impl fmt::Display for SimpleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_name {
            Some(name) => write!(f, "{}: {}", name, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Syntax(SyntaxErrorMessage),
    Simple(SimpleMessage),
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Syntax(m) => m.fmt(f),
            Message::Simple(m) => m.fmt(f),
        }
    }
}

/// Errors collected by a compilation unit
#[derive(Debug, Clone)]
pub struct ErrorCollector {
    messages: Vec<Message>,
    tolerance: usize,
}

impl ErrorCollector {
    pub fn new(tolerance: usize) -> Self {
        Self {
            messages: Vec::new(),
            tolerance,
        }
    }

    pub fn add_syntax_error(&mut self, message: SyntaxErrorMessage) {
        self.messages.push(Message::Syntax(message));
    }

    pub fn add_error(&mut self, message: impl Into<String>, source_name: Option<&str>) {
        self.messages.push(Message::Simple(SimpleMessage {
            message: message.into(),
            source_name: source_name.map(str::to_string),
        }));
    }

    pub fn has_errors(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.messages.len()
    }

    /// Whether more errors were collected than the configured tolerance
    pub fn over_tolerance(&self) -> bool {
        self.tolerance > 0 && self.messages.len() > self.tolerance
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut [Message] {
        &mut self.messages
    }

    pub fn syntax_errors_mut(&mut self) -> impl Iterator<Item = &mut SyntaxErrorMessage> {
        self.messages.iter_mut().filter_map(|m| match m {
            Message::Syntax(s) => Some(s),
            Message::Simple(_) => None,
        })
    }

    pub fn first_syntax_error(&self) -> Option<&SyntaxErrorMessage> {
        self.messages.iter().find_map(|m| match m {
            Message::Syntax(s) => Some(s),
            Message::Simple(_) => None,
        })
    }
}

/// All errors found by the phase that failed
#[derive(Debug, Clone)]
pub struct MultipleCompilationErrors {
    phase: Phase,
    collector: ErrorCollector,
}

impl MultipleCompilationErrors {
    pub fn new(phase: Phase, collector: ErrorCollector) -> Self {
        Self { phase, collector }
    }

    /// The phase that failed
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error_collector(&self) -> &ErrorCollector {
        &self.collector
    }

    pub fn error_collector_mut(&mut self) -> &mut ErrorCollector {
        &mut self.collector
    }

    /// Render every message with source snippets, without colors.
    pub fn render(&self) -> String {
        let mut files = SimpleFiles::new();
        let mut writer = NoColor::new(Vec::new());
        let config = term::Config::default();

        for message in self.collector.messages() {
            let diagnostic = match message {
                Message::Syntax(m) => {
                    let file = files.add(m.source_name().to_string(), m.source_text.to_string());
                    let end = m.cause.end.max(m.cause.start);
                    Diagnostic::error()
                        .with_message(&m.cause.message)
                        .with_labels(vec![Label::primary(file, m.cause.start..end)])
                }
                Message::Simple(m) => Diagnostic::error().with_message(m.to_string()),
            };
            if let Err(err) = term::emit(&mut writer, &config, &files, &diagnostic) {
                tracing::debug!(error = %err, "could not render diagnostic");
            }
        }

        String::from_utf8_lossy(writer.get_ref()).into_owned()
    }
}

impl fmt::Display for MultipleCompilationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "startup failed:")?;
        for message in self.collector.messages() {
            writeln!(f, "{}", message)?;
        }
        let count = self.collector.error_count();
        write!(f, "\n{} error{}", count, if count == 1 { "" } else { "s" })
    }
}

impl std::error::Error for MultipleCompilationErrors {}

/// Why [`crate::CompilationUnit::compile`] failed
#[derive(Debug, Error)]
pub enum CompilationFailed {
    #[error(transparent)]
    Multiple(#[from] MultipleCompilationErrors),

    #[error("Could not write class file {path} for {class_name}")]
    Output {
        class_name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax(message: &str, line: u32) -> SyntaxException {
        SyntaxException {
            message: message.to_string(),
            line,
            column: 5,
            start: 4,
            end: 5,
        }
    }

    #[test]
    fn test_rename_source() {
        let mut collector = ErrorCollector::new(10);
        collector.add_error("general", None);
        collector.add_syntax_error(SyntaxErrorMessage::new(
            syntax("unexpected '('", 1),
            "build_1a",
            Arc::from("def ("),
        ));

        for message in collector.syntax_errors_mut() {
            message.set_source_name("build file 'a'");
        }
        let first = collector.first_syntax_error().unwrap();
        assert_eq!(first.source_name(), "build file 'a'");
        assert_eq!(first.line(), 1);
    }

    #[test]
    fn test_display_and_render() {
        let mut collector = ErrorCollector::new(10);
        collector.add_syntax_error(SyntaxErrorMessage::new(
            syntax("unexpected '(', expected identifier", 1),
            "settings file",
            Arc::from("def ("),
        ));
        let errors = MultipleCompilationErrors::new(Phase::Parsing, collector);

        let text = errors.to_string();
        assert!(text.starts_with("startup failed:\nsettings file: 1: unexpected '('"));
        assert!(text.ends_with("1 error"));

        let rendered = errors.render();
        assert!(rendered.contains("settings file:1:5"));
        assert!(rendered.contains("def ("));
    }

    #[test]
    fn test_tolerance() {
        let mut collector = ErrorCollector::new(1);
        collector.add_error("one", None);
        assert!(!collector.over_tolerance());
        collector.add_error("two", Some("Script1"));
        assert!(collector.over_tolerance());
        assert_eq!(collector.messages()[1].to_string(), "Script1: two");
    }
}
