//! Runtime classes
//!
//! A class is either native (methods implemented in Rust, used for platform
//! classes and script base classes) or compiled (backed by a class file).

use std::fmt;
use std::sync::Arc;

use grove_bytecode::{ClassFile, Method};
use rustc_hash::FxHashMap;

use crate::loader::LoadError;
use crate::script::ScriptContext;
use crate::value::Value;
use crate::VmResult;

/// Signature of a method implemented in Rust
pub type NativeMethod = fn(&mut ScriptContext<'_>, &[Value]) -> VmResult<Value>;

/// A loaded class
pub struct Class {
    name: String,
    super_class: Option<Arc<Class>>,
    kind: ClassKind,
}

enum ClassKind {
    Native(FxHashMap<String, NativeMethod>),
    Compiled(ClassFile),
}

/// A method found by [`Class::find_method`]
#[derive(Clone)]
pub enum MethodRef {
    /// Compiled method, with the class that declares it
    Compiled { owner: Arc<Class>, index: usize },
    Native(NativeMethod),
}

impl MethodRef {
    /// Number of declared parameters; `None` for native methods, which
    /// check their own arguments
    pub fn param_count(&self) -> Option<usize> {
        match self {
            MethodRef::Compiled { owner, index } => owner
                .class_file()
                .and_then(|file| file.methods.get(*index))
                .map(|m| m.param_count as usize),
            MethodRef::Native(_) => None,
        }
    }
}

impl Class {
    /// Start building a native class
    pub fn native(name: impl Into<String>, super_class: Option<Arc<Class>>) -> NativeClassBuilder {
        NativeClassBuilder {
            name: name.into(),
            super_class,
            methods: FxHashMap::default(),
        }
    }

    /// Wrap a decoded class file. The caller has resolved its superclass.
    pub fn compiled(file: ClassFile, super_class: Option<Arc<Class>>) -> Self {
        Self {
            name: file.name.clone(),
            super_class,
            kind: ClassKind::Compiled(file),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn super_class(&self) -> Option<&Arc<Class>> {
        self.super_class.as_ref()
    }

    pub fn is_native(&self) -> bool {
        matches!(self.kind, ClassKind::Native(_))
    }

    /// The backing class file of a compiled class
    pub fn class_file(&self) -> Option<&ClassFile> {
        match &self.kind {
            ClassKind::Compiled(file) => Some(file),
            ClassKind::Native(_) => None,
        }
    }

    /// The `SourceFile` attribute of a compiled class
    pub fn source_file(&self) -> Option<&str> {
        self.class_file().and_then(|file| file.source_file.as_deref())
    }

    /// Names of the methods this class declares itself
    pub fn declared_methods(&self) -> Vec<&str> {
        match &self.kind {
            ClassKind::Compiled(file) => file.methods.iter().map(|m| m.name.as_str()).collect(),
            ClassKind::Native(methods) => methods.keys().map(String::as_str).collect(),
        }
    }

    /// A compiled method declared by this class
    pub fn compiled_method(&self, index: usize) -> Option<&Method> {
        self.class_file().and_then(|file| file.methods.get(index))
    }

    /// Whether this class is `other` or inherits from it. Classes are
    /// compared by binary name.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.extends(&other.name)
    }

    /// Whether this class or one of its superclasses is named `name`.
    pub fn extends(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.name == name {
                return true;
            }
            current = class.super_class.as_deref();
        }
        false
    }

    /// Narrow this class to a subclass of `base`.
    pub fn as_subclass(self: &Arc<Self>, base: &Class) -> Result<Arc<Class>, LoadError> {
        if self.is_subclass_of(base) {
            Ok(Arc::clone(self))
        } else {
            Err(LoadError::IncompatibleClass {
                class: self.name.clone(),
                expected: base.name.clone(),
            })
        }
    }

    /// Look a method up by name, walking the superclass chain.
    pub fn find_method(self: &Arc<Self>, name: &str) -> Option<MethodRef> {
        let mut current = Some(self);
        while let Some(class) = current {
            match &class.kind {
                ClassKind::Compiled(file) => {
                    if let Some(index) = file.methods.iter().position(|m| m.name == name) {
                        return Some(MethodRef::Compiled {
                            owner: Arc::clone(class),
                            index,
                        });
                    }
                }
                ClassKind::Native(methods) => {
                    if let Some(method) = methods.get(name) {
                        return Some(MethodRef::Native(*method));
                    }
                }
            }
            current = class.super_class.as_ref();
        }
        None
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("super_class", &self.super_class.as_ref().map(|c| c.name()))
            .field("native", &self.is_native())
            .finish()
    }
}

/// Builder for native classes
pub struct NativeClassBuilder {
    name: String,
    super_class: Option<Arc<Class>>,
    methods: FxHashMap<String, NativeMethod>,
}

impl NativeClassBuilder {
    pub fn method(mut self, name: &str, method: NativeMethod) -> Self {
        self.methods.insert(name.to_string(), method);
        self
    }

    pub fn build(self) -> Arc<Class> {
        Arc::new(Class {
            name: self.name,
            super_class: self.super_class,
            kind: ClassKind::Native(self.methods),
        })
    }
}
