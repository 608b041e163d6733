//! Running script classes

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::class::Class;
use crate::interpreter::Interpreter;
use crate::value::Value;
use crate::{VmError, VmResult, SCRIPT_CLASS};

/// Script variables that are not declared locals
#[derive(Debug, Clone, Default)]
pub struct Binding {
    variables: FxHashMap<String, Value>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

/// Where `print` and `println` write to
#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    /// Shared in-memory buffer, readable with [`OutputSink::contents`]
    Buffer(Arc<Mutex<String>>),
}

impl OutputSink {
    pub fn buffer() -> Self {
        OutputSink::Buffer(Arc::new(Mutex::new(String::new())))
    }

    pub fn write_str(&self, s: &str) -> VmResult<()> {
        match self {
            OutputSink::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(s.as_bytes())
                    .and_then(|_| out.flush())
                    .map_err(|e| VmError::RuntimeError(format!("could not write output: {}", e)))
            }
            OutputSink::Buffer(buffer) => {
                buffer.lock().push_str(s);
                Ok(())
            }
        }
    }

    /// Everything written so far; always empty for stdout
    pub fn contents(&self) -> String {
        match self {
            OutputSink::Stdout => String::new(),
            OutputSink::Buffer(buffer) => buffer.lock().clone(),
        }
    }
}

/// What a native method sees of the running script
pub struct ScriptContext<'a> {
    pub binding: &'a mut Binding,
    pub out: &'a OutputSink,
    pub class: &'a Arc<Class>,
}

/// An instance of a loaded script class
#[derive(Debug)]
pub struct ScriptInstance {
    class: Arc<Class>,
    binding: Binding,
    out: OutputSink,
}

impl ScriptInstance {
    /// Instantiate `class`, which must extend `groovy.lang.Script`.
    pub fn new(class: Arc<Class>) -> VmResult<Self> {
        if !class.extends(SCRIPT_CLASS) {
            return Err(VmError::NotAScript(class.name().to_string()));
        }
        Ok(Self {
            class,
            binding: Binding::new(),
            out: OutputSink::default(),
        })
    }

    pub fn with_output(mut self, out: OutputSink) -> Self {
        self.out = out;
        self
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }

    /// Execute the script body.
    pub fn run(&mut self) -> VmResult<Value> {
        self.invoke_method("run", Vec::new())
    }

    /// Call a method of the script by name.
    pub fn invoke_method(&mut self, name: &str, args: Vec<Value>) -> VmResult<Value> {
        tracing::trace!(class = self.class.name(), method = name, "invoke");
        Interpreter::new(&self.class, &mut self.binding, &self.out).invoke(name, args)
    }
}
