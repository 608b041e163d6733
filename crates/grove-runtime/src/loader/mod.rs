//! Class loaders
//!
//! Loaders form a parent chain. [`ClassLoader::load_class`] asks the parent
//! first and only then looks at the loader's own classes, so platform
//! classes cannot be shadowed by script output.

mod class_path;
mod filtering;
mod system;

pub use class_path::ClassPathClassLoader;
pub use filtering::{FilterSpec, FilteringClassLoader};
pub use system::SystemClassLoader;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grove_bytecode::{ClassFileError, VerifyError};

use crate::class::Class;

/// Class loading errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Neither the loader nor its parents know the class
    #[error("Class {0} not found")]
    ClassNotFound(String),

    /// The class file exists but could not be read
    #[error("Could not read class file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The class file could not be decoded
    #[error("Malformed class file {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: ClassFileError,
    },

    /// The class file failed verification
    #[error("Class file {path} failed verification")]
    Verify {
        path: PathBuf,
        #[source]
        source: VerifyError,
    },

    /// The class file holds a different class than its path promises
    #[error("Class file {path} defines {found}, expected {expected}")]
    NameMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// A class was loaded but is not of the required type
    #[error("{class} is not a subclass of {expected}")]
    IncompatibleClass { class: String, expected: String },

    /// The superclass of a class could not be loaded
    #[error("Could not load superclass {super_name} of {class}")]
    MissingSuperclass {
        class: String,
        super_name: String,
        #[source]
        source: Box<LoadError>,
    },
}

/// Something that can produce classes by binary name
pub trait ClassLoader: Send + Sync + fmt::Debug {
    /// The loader consulted first by [`ClassLoader::load_class`]
    fn parent(&self) -> Option<&Arc<dyn ClassLoader>>;

    /// Find a class this loader defines itself, without asking the parent.
    fn find_class(&self, name: &str) -> Result<Option<Arc<Class>>, LoadError>;

    /// Load a class, parent first.
    fn load_class(&self, name: &str) -> Result<Arc<Class>, LoadError> {
        if let Some(parent) = self.parent() {
            match parent.load_class(name) {
                Ok(class) => return Ok(class),
                Err(LoadError::ClassNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        self.find_class(name)?
            .ok_or_else(|| LoadError::ClassNotFound(name.to_string()))
    }
}

/// An ordered list of class directories
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClassPath {
    roots: Vec<PathBuf>,
}

impl ClassPath {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A class path of a single directory
    pub fn of(root: impl AsRef<Path>) -> Self {
        Self {
            roots: vec![root.as_ref().to_path_buf()],
        }
    }

    pub fn from_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    /// This class path followed by `other`
    pub fn plus(&self, other: &ClassPath) -> Self {
        let mut roots = self.roots.clone();
        roots.extend(other.roots.iter().cloned());
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
