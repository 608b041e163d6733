//! The root loader for platform classes

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{ClassLoader, LoadError};
use crate::builtins;
use crate::class::Class;
use crate::{OBJECT_CLASS, SCRIPT_CLASS};

/// Platform classes without methods of their own, all extending `java.lang.Object`
const PLATFORM_CLASSES: &[&str] = &[
    "java.lang.String",
    "java.lang.Integer",
    "java.lang.Boolean",
    "java.lang.Class",
    "java.lang.Math",
    "java.lang.System",
    "java.math.BigDecimal",
    "java.util.List",
    "java.util.ArrayList",
    "java.util.Map",
    "java.util.Map$Entry",
    "java.util.HashMap",
    "java.io.File",
    "groovy.lang.GroovyObject",
];

/// Root of every loader chain. Defines the platform classes and the script
/// base class `groovy.lang.Script`; embedders add their own native classes
/// (typically script base classes) with [`SystemClassLoader::with_class`].
#[derive(Debug)]
pub struct SystemClassLoader {
    classes: FxHashMap<String, Arc<Class>>,
}

impl SystemClassLoader {
    pub fn new() -> Self {
        let object = Class::native(OBJECT_CLASS, None).build();
        let mut classes = FxHashMap::default();

        for name in PLATFORM_CLASSES {
            let class = Class::native(*name, Some(object.clone())).build();
            classes.insert(name.to_string(), class);
        }

        let script = Class::native(SCRIPT_CLASS, Some(object.clone()))
            .method("println", builtins::println)
            .method("print", builtins::print)
            .build();
        classes.insert(SCRIPT_CLASS.to_string(), script);
        classes.insert(OBJECT_CLASS.to_string(), object);

        Self { classes }
    }

    /// Register an additional class, replacing any class of the same name.
    pub fn with_class(mut self, class: Arc<Class>) -> Self {
        self.classes.insert(class.name().to_string(), class);
        self
    }

    /// A class defined by this loader
    pub fn class(&self, name: &str) -> Option<Arc<Class>> {
        self.classes.get(name).cloned()
    }

    /// The `groovy.lang.Script` class
    pub fn script_class(&self) -> Arc<Class> {
        match self.classes.get(SCRIPT_CLASS) {
            Some(class) => class.clone(),
            // only reachable if an embedder replaced it with `with_class`
            None => Class::native(SCRIPT_CLASS, None).build(),
        }
    }
}

impl Default for SystemClassLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassLoader for SystemClassLoader {
    fn parent(&self) -> Option<&Arc<dyn ClassLoader>> {
        None
    }

    fn find_class(&self, name: &str) -> Result<Option<Arc<Class>>, LoadError> {
        Ok(self.classes.get(name).cloned())
    }
}
