//! Grove runtime
//!
//! This crate provides what a compiled script needs after it leaves the
//! compiler:
//! - Class loaders (platform classes, class directories, filtering)
//! - A classloader cache keyed by caller supplied ids
//! - A bytecode interpreter and script instances to run loaded classes

#![warn(rust_2018_idioms)]

pub mod builtins;
pub mod cache;
pub mod class;
pub mod interpreter;
pub mod loader;
pub mod script;
pub mod value;

pub use cache::{CacheStats, ClassLoaderCache, ClassLoaderId, DefaultClassLoaderCache};
pub use class::{Class, MethodRef, NativeMethod};
pub use loader::{
    ClassLoader, ClassPath, ClassPathClassLoader, FilterSpec, FilteringClassLoader, LoadError,
    SystemClassLoader,
};
pub use script::{Binding, OutputSink, ScriptContext, ScriptInstance};
pub use value::Value;

/// Binary name of the class every script class extends.
pub const SCRIPT_CLASS: &str = "groovy.lang.Script";

/// Binary name of the root class.
pub const OBJECT_CLASS: &str = "java.lang.Object";

/// VM execution errors
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// Call depth exceeded
    #[error("Stack overflow")]
    StackOverflow,

    /// Operand stack exhausted; only reachable with unverified code
    #[error("Stack underflow")]
    StackUnderflow,

    /// Invalid opcode
    #[error("Invalid opcode: {0}")]
    InvalidOpcode(u8),

    /// No method with that name and arity
    #[error("No signature of method: {receiver}.{method}() is applicable for {arg_count} argument(s)")]
    MissingMethod {
        /// Class or value type the call was made on
        receiver: String,
        /// Method name
        method: String,
        /// Number of arguments supplied
        arg_count: usize,
    },

    /// Unknown binding variable or property
    #[error("No such property: {0}")]
    MissingProperty(String),

    /// Operand types do not support the operation
    #[error("Type error: {0}")]
    TypeError(String),

    /// Division by zero and similar
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// Class is not runnable as a script
    #[error("{0} is not a script class")]
    NotAScript(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

/// VM execution result
pub type VmResult<T> = Result<T, VmError>;
