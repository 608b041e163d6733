//! Class nodes and their verification

use rustc_hash::FxHashSet;

use grove_parser::ast::{MethodNode, ModuleNode};
use grove_parser::Span;

use crate::error::{CompileError, CompileResult};

/// Name of the method holding the script body
pub const RUN_METHOD: &str = "run";

/// A class about to be generated
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    pub name: String,
    pub super_name: Option<String>,
    /// Whether the class was generated from a script body
    pub is_script: bool,
    pub line: u32,
    pub methods: Vec<MethodNode>,
}

impl ClassNode {
    /// The class for a script: its declared methods plus a `run` method
    /// holding the top-level statements.
    pub fn script(name: &str, base_class: &str, module: &ModuleNode) -> Self {
        let mut methods = module.methods.clone();
        methods.push(MethodNode {
            name: RUN_METHOD.to_string(),
            parameters: Vec::new(),
            body: module.statements.clone(),
            span: Span::new(0, 0, 1, 1),
        });

        Self {
            name: name.to_string(),
            super_name: Some(base_class.to_string()),
            is_script: true,
            line: 1,
            methods,
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodNode> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Checks a class node before bytecode is generated
pub trait Verifier {
    fn verify(&self, node: &ClassNode) -> CompileResult<()>;
}

impl<F> Verifier for F
where
    F: Fn(&ClassNode) -> CompileResult<()>,
{
    fn verify(&self, node: &ClassNode) -> CompileResult<()> {
        self(node)
    }
}

/// Structural checks every class must pass
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultVerifier;

impl Verifier for DefaultVerifier {
    fn verify(&self, node: &ClassNode) -> CompileResult<()> {
        let mut names = FxHashSet::default();
        for method in &node.methods {
            if !names.insert(method.name.as_str()) {
                let message = if node.is_script && method.name == RUN_METHOD {
                    format!(
                        "The method 'run' in script {} is reserved for the script body",
                        node.name
                    )
                } else {
                    format!(
                        "Repetitive method name '{}' in class '{}'",
                        method.name, node.name
                    )
                };
                return Err(CompileError::verification(&node.name, message));
            }

            let mut params = FxHashSet::default();
            for param in &method.parameters {
                if !params.insert(param.name.as_str()) {
                    return Err(CompileError::verification(
                        &node.name,
                        format!(
                            "Duplicate parameter '{}' in method '{}'",
                            param.name, method.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
