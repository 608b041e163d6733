//! A class loader that compiles scripts

use std::sync::Arc;

use grove_bytecode::ClassFile;
use grove_runtime::{Class, ClassLoader, ClassPath, ClassPathClassLoader, LoadError};
use thiserror::Error;

use crate::config::CompilerConfiguration;
use crate::error::CompilationFailed;
use crate::resource::{DirectoryResourceLoader, ResourceLoader};
use crate::source::CodeSource;
use crate::unit::CompilationUnit;

/// Why [`ScriptClassLoader::parse_class`] failed
#[derive(Debug, Error)]
pub enum ParseClassError {
    #[error(transparent)]
    Compilation(#[from] CompilationFailed),

    #[error("Compiled class {name} could not be defined")]
    Define {
        name: String,
        #[source]
        source: LoadError,
    },

    #[error("Compilation of {0} produced no class")]
    NoClass(String),
}

/// Compiles scripts against a parent class loader and defines the
/// resulting classes in memory.
///
/// Classes the compiler cannot find through the parent are looked up as
/// sources through the resource loader, which by default reads `.grv` files
/// from the working directory.
#[derive(Debug)]
pub struct ScriptClassLoader {
    config: CompilerConfiguration,
    parent: Arc<dyn ClassLoader>,
    resources: Arc<dyn ResourceLoader>,
    defined: ClassPathClassLoader,
}

impl ScriptClassLoader {
    pub fn new(parent: Arc<dyn ClassLoader>, config: CompilerConfiguration) -> Self {
        Self {
            config,
            defined: ClassPathClassLoader::new(ClassPath::empty(), Some(parent.clone())),
            parent,
            resources: Arc::new(DirectoryResourceLoader::new(".")),
        }
    }

    pub fn config(&self) -> &CompilerConfiguration {
        &self.config
    }

    pub fn resource_loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.resources
    }

    pub fn set_resource_loader(&mut self, resources: Arc<dyn ResourceLoader>) {
        self.resources = resources;
    }

    pub fn with_resource_loader(mut self, resources: Arc<dyn ResourceLoader>) -> Self {
        self.set_resource_loader(resources);
        self
    }

    /// A fresh unit using this loader's configuration, parent and
    /// resource loader
    pub fn create_compilation_unit<'a>(&self) -> CompilationUnit<'a> {
        CompilationUnit::new(self.config.clone(), self.parent.clone(), self.resources.clone())
    }

    /// Compile `source` and define its classes in this loader. Returns the
    /// class named after the source.
    pub fn parse_class(&self, source: CodeSource) -> Result<Arc<Class>, ParseClassError> {
        let name = source.name().to_string();
        let mut unit = self.create_compilation_unit();
        unit.add_source(source);

        let mut main = None;
        for compiled in unit.compile()? {
            let define = |bytes: &[u8]| {
                let file = ClassFile::decode(bytes).map_err(|source| LoadError::Malformed {
                    path: format!("<memory>/{}", compiled.name).into(),
                    source,
                })?;
                self.defined.define_class(file)
            };
            let class = define(&compiled.bytes).map_err(|source| ParseClassError::Define {
                name: compiled.name.clone(),
                source,
            })?;
            if class.name() == name {
                main = Some(class);
            }
        }
        main.ok_or(ParseClassError::NoClass(name))
    }
}

impl ClassLoader for ScriptClassLoader {
    fn parent(&self) -> Option<&Arc<dyn ClassLoader>> {
        Some(&self.parent)
    }

    fn find_class(&self, name: &str) -> Result<Option<Arc<Class>>, LoadError> {
        self.defined.find_class(name)
    }
}
