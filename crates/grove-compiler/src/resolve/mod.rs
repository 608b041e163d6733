//! Class reference resolution
//!
//! Semantic analysis turns names such as `Map.Entry` into class references
//! by probing candidate binary names against a [`ClassNodeResolver`]. Every
//! identifier can produce many probes, so the resolver sits on a hot path.

mod visitor;

pub use visitor::{candidate_names, nested_forms, ResolveVisitor, DEFAULT_PACKAGES};

use std::path::PathBuf;
use std::sync::Arc;

use grove_runtime::{Class, ClassLoader, LoadError};
use rustc_hash::FxHashMap;

use crate::resource::ResourceLoader;

/// What a successful lookup found
#[derive(Debug, Clone)]
pub enum LookupResult {
    /// A class known to the class loader
    Class(Arc<Class>),
    /// A source file that defines the class
    Source(PathBuf),
}

impl LookupResult {
    pub fn class(&self) -> Option<&Arc<Class>> {
        match self {
            LookupResult::Class(class) => Some(class),
            LookupResult::Source(_) => None,
        }
    }
}

/// Looks up classes by fully qualified binary name
pub trait ClassNodeResolver {
    /// `None` when no class of that name exists.
    fn find_class_node(&mut self, name: &str) -> Option<LookupResult>;
}

impl<R: ClassNodeResolver + ?Sized> ClassNodeResolver for Box<R> {
    fn find_class_node(&mut self, name: &str) -> Option<LookupResult> {
        (**self).find_class_node(name)
    }
}

/// Asks the class loader first and then the resource loader. Results,
/// misses included, are cached for the life of the resolver.
#[derive(Debug)]
pub struct DefaultClassNodeResolver {
    loader: Arc<dyn ClassLoader>,
    resources: Arc<dyn ResourceLoader>,
    cache: FxHashMap<String, Option<LookupResult>>,
}

impl DefaultClassNodeResolver {
    pub fn new(loader: Arc<dyn ClassLoader>, resources: Arc<dyn ResourceLoader>) -> Self {
        Self {
            loader,
            resources,
            cache: FxHashMap::default(),
        }
    }

    fn lookup(&self, name: &str) -> Option<LookupResult> {
        match self.loader.load_class(name) {
            Ok(class) => return Some(LookupResult::Class(class)),
            Err(LoadError::ClassNotFound(_)) => {}
            Err(err) => {
                tracing::debug!(class = name, error = %err, "class failed to load during resolution");
                return None;
            }
        }
        self.resources.load_source(name).map(LookupResult::Source)
    }
}

impl ClassNodeResolver for DefaultClassNodeResolver {
    fn find_class_node(&mut self, name: &str) -> Option<LookupResult> {
        if let Some(cached) = self.cache.get(name) {
            return cached.clone();
        }
        let result = self.lookup(name);
        self.cache.insert(name.to_string(), result.clone());
        result
    }
}
