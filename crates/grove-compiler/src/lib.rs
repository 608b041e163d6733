//! Grove compiler
//!
//! Compiles Grove scripts to class files in phases:
//! 1. Parsing: source text to AST
//! 2. Conversion and semantic analysis: imports, class reference resolution
//! 3. Canonicalization: the complete AST is handed to phase operations
//! 4. Instruction selection: class nodes are built and verified
//! 5. Class generation and output
//!
//! A [`CompilationUnit`] is configured once (customizers, phase operations,
//! class node resolver, verifier, class visitor factory) and then compiled.
//! [`ScriptClassLoader`] creates units and defines compiled classes.

#![warn(rust_2018_idioms)]

pub mod class_node;
pub mod codegen;
pub mod config;
pub mod customizer;
pub mod error;
pub mod loader;
pub mod phase;
pub mod resolve;
pub mod resource;
pub mod source;
pub mod unit;
pub mod writer;

pub use class_node::{ClassNode, DefaultVerifier, Verifier, RUN_METHOD};
pub use codegen::CodeGenerator;
pub use config::CompilerConfiguration;
pub use customizer::{CompilationCustomizer, ImportCustomizer, SourceUnitOperation};
pub use error::{
    CompilationFailed, CompileError, CompileResult, ErrorCollector, Message,
    MultipleCompilationErrors, SimpleMessage, SyntaxErrorMessage, SyntaxException,
};
pub use loader::{ParseClassError, ScriptClassLoader};
pub use phase::Phase;
pub use resolve::{ClassNodeResolver, DefaultClassNodeResolver, LookupResult};
pub use resource::{DirectoryResourceLoader, NoOpResourceLoader, ResourceLoader};
pub use source::{CodeSource, SourceUnit};
pub use unit::{ClassVisitorFactory, CompilationUnit, CompiledClass};
pub use writer::{accept, ClassVisitor, ClassWriter};
