//! Handles to scripts compiled into a class directory

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grove_bytecode::class_file_path;
use grove_runtime::{Class, ClassLoader, ClassLoaderCache, ClassLoaderId, ClassPath};
use once_cell::sync::OnceCell;

use crate::error::{ScriptError, ScriptResult};
use crate::source::ScriptSource;

/// A compiled script as seen by its callers
pub trait CompiledScript<M> {
    /// Whether running the script could have any effect
    fn run_does_something(&self) -> bool;

    fn has_methods(&self) -> bool;

    /// Data extracted by the compile operation, if it kept any
    fn data(&self) -> Option<&M>;

    /// The script class, loaded on first use
    fn load_class(&self) -> ScriptResult<Arc<Class>>;
}

/// A script whose classes live in a directory and are loaded through the
/// shared classloader cache
pub struct ClassesDirCompiledScript<M> {
    is_empty: bool,
    has_methods: bool,
    class_loader_id: ClassLoaderId,
    base_class: Arc<Class>,
    classes_dir: PathBuf,
    parent: Arc<dyn ClassLoader>,
    source: Arc<dyn ScriptSource>,
    data: Option<M>,
    cache: Arc<dyn ClassLoaderCache>,
    script_class: OnceCell<Arc<Class>>,
}

impl<M> ClassesDirCompiledScript<M> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        is_empty: bool,
        has_methods: bool,
        class_loader_id: ClassLoaderId,
        base_class: Arc<Class>,
        classes_dir: impl AsRef<Path>,
        parent: Arc<dyn ClassLoader>,
        source: Arc<dyn ScriptSource>,
        data: Option<M>,
        cache: Arc<dyn ClassLoaderCache>,
    ) -> Self {
        Self {
            is_empty,
            has_methods,
            class_loader_id,
            base_class,
            classes_dir: classes_dir.as_ref().to_path_buf(),
            parent,
            source,
            data,
            cache,
            script_class: OnceCell::new(),
        }
    }

    pub fn class_loader_id(&self) -> &ClassLoaderId {
        &self.class_loader_id
    }

    pub fn classes_dir(&self) -> &Path {
        &self.classes_dir
    }

    pub fn source(&self) -> &Arc<dyn ScriptSource> {
        &self.source
    }

    fn load(&self) -> ScriptResult<Arc<Class>> {
        let loader = self.cache.get(
            &self.class_loader_id,
            &ClassPath::of(&self.classes_dir),
            Some(Arc::clone(&self.parent)),
            None,
        );
        let class_name = self.source.class_name();
        let loaded = loader
            .load_class(class_name)
            .and_then(|class| class.as_subclass(&self.base_class));

        loaded.map_err(|source| {
            let path = class_file_path(&self.classes_dir, class_name);
            let display_name = self.source.display_name().to_string();
            if path.is_file() {
                ScriptError::CompiledArtifactUnloadable { display_name, source }
            } else {
                ScriptError::CompiledArtifactMissing {
                    display_name,
                    path,
                    source,
                }
            }
        })
    }
}

impl<M> CompiledScript<M> for ClassesDirCompiledScript<M> {
    fn run_does_something(&self) -> bool {
        !self.is_empty
    }

    fn has_methods(&self) -> bool {
        self.has_methods
    }

    fn data(&self) -> Option<&M> {
        self.data.as_ref()
    }

    fn load_class(&self) -> ScriptResult<Arc<Class>> {
        if self.is_empty && !self.has_methods {
            return Err(ScriptError::UnloadableEmptyScript);
        }
        self.script_class.get_or_try_init(|| self.load()).cloned()
    }
}

impl<M: fmt::Debug> fmt::Debug for ClassesDirCompiledScript<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassesDirCompiledScript")
            .field("source", &self.source.display_name())
            .field("is_empty", &self.is_empty)
            .field("has_methods", &self.has_methods)
            .field("class_loader_id", &self.class_loader_id)
            .field("classes_dir", &self.classes_dir)
            .field("data", &self.data)
            .field("loaded", &self.script_class.get().is_some())
            .finish()
    }
}
