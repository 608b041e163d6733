//! Sources submitted to a compilation unit

use std::sync::Arc;

use grove_parser::ModuleNode;

use crate::class_node::ClassNode;

/// Script text with the name of the class it compiles to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSource {
    text: Arc<str>,
    name: String,
    code_base: String,
}

impl CodeSource {
    /// `name` becomes the class name; `code_base` is a synthetic location
    /// such as `/grove/script`.
    pub fn new(text: &str, name: impl Into<String>, code_base: impl Into<String>) -> Self {
        Self {
            text: Arc::from(text),
            name: name.into(),
            code_base: code_base.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code_base(&self) -> &str {
        &self.code_base
    }
}

/// One source as it moves through the phases
#[derive(Debug)]
pub struct SourceUnit {
    name: String,
    code_base: String,
    text: Arc<str>,
    pub(crate) ast: Option<ModuleNode>,
    pub(crate) class_nodes: Vec<ClassNode>,
}

impl SourceUnit {
    pub(crate) fn new(source: CodeSource) -> Self {
        Self {
            name: source.name,
            code_base: source.code_base,
            text: source.text,
            ast: None,
            class_nodes: Vec::new(),
        }
    }

    /// Name of the unit; also the name of its script class
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code_base(&self) -> &str {
        &self.code_base
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn shared_text(&self) -> Arc<str> {
        self.text.clone()
    }

    /// The AST, available from the end of parsing
    pub fn ast(&self) -> Option<&ModuleNode> {
        self.ast.as_ref()
    }

    pub fn ast_mut(&mut self) -> Option<&mut ModuleNode> {
        self.ast.as_mut()
    }

    /// Class nodes, available from instruction selection on
    pub fn class_nodes(&self) -> &[ClassNode] {
        &self.class_nodes
    }
}
