//! Classloader cache
//!
//! Compiled scripts are loaded through loaders that are shared across
//! builds. The cache hands out one loader per [`ClassLoaderId`]; asking for
//! an id with a different class path, parent or filter replaces the cached
//! loader, so stale classes never survive a recompile into a new directory.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::loader::{ClassLoader, ClassPath, ClassPathClassLoader, FilterSpec, FilteringClassLoader};

/// Caller supplied key of a cached loader
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassLoaderId(Arc<str>);

impl ClassLoaderId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Id of the loader for a script class within a scope,
    /// e.g. `settings:build_1a2b`
    pub fn script(scope: &str, class_name: &str) -> Self {
        Self::new(format!("{}:{}", scope, class_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassLoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared store of class loaders
pub trait ClassLoaderCache: Send + Sync {
    /// The loader for `id`, created if absent or if the cached loader was
    /// built from a different class path, parent or filter.
    fn get(
        &self,
        id: &ClassLoaderId,
        class_path: &ClassPath,
        parent: Option<Arc<dyn ClassLoader>>,
        filter: Option<&FilterSpec>,
    ) -> Arc<dyn ClassLoader>;

    /// Drop the loader for `id`. Returns whether one was cached.
    fn remove(&self, id: &ClassLoaderId) -> bool;

    /// Number of cached loaders
    fn size(&self) -> usize;
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// What a cached loader was built from
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoaderSpec {
    class_path: ClassPath,
    /// Address of the parent loader; loaders are compared by identity
    parent: Option<usize>,
    filter: Option<FilterSpec>,
}

#[derive(Debug)]
struct CachedLoader {
    spec: LoaderSpec,
    loader: Arc<dyn ClassLoader>,
}

/// [`ClassLoaderCache`] over a concurrent map
#[derive(Debug, Default)]
pub struct DefaultClassLoaderCache {
    entries: DashMap<ClassLoaderId, CachedLoader>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl DefaultClassLoaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn create(
        class_path: &ClassPath,
        parent: Option<Arc<dyn ClassLoader>>,
        filter: Option<&FilterSpec>,
    ) -> Arc<dyn ClassLoader> {
        let parent = match (parent, filter) {
            (Some(parent), Some(filter)) => {
                Some(Arc::new(FilteringClassLoader::new(parent, filter.clone())) as Arc<dyn ClassLoader>)
            }
            (parent, _) => parent,
        };
        Arc::new(ClassPathClassLoader::new(class_path.clone(), parent))
    }
}

fn loader_address(loader: &Arc<dyn ClassLoader>) -> usize {
    Arc::as_ptr(loader) as *const () as usize
}

impl ClassLoaderCache for DefaultClassLoaderCache {
    fn get(
        &self,
        id: &ClassLoaderId,
        class_path: &ClassPath,
        parent: Option<Arc<dyn ClassLoader>>,
        filter: Option<&FilterSpec>,
    ) -> Arc<dyn ClassLoader> {
        let spec = LoaderSpec {
            class_path: class_path.clone(),
            parent: parent.as_ref().map(loader_address),
            filter: filter.cloned(),
        };

        match self.entries.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().spec == spec {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return entry.get().loader.clone();
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(id = %id, "class loader spec changed, replacing");
                let loader = Self::create(class_path, parent, filter);
                entry.insert(CachedLoader {
                    spec,
                    loader: loader.clone(),
                });
                loader
            }
            Entry::Vacant(entry) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(id = %id, "creating class loader");
                let loader = Self::create(class_path, parent, filter);
                entry.insert(CachedLoader {
                    spec,
                    loader: loader.clone(),
                });
                loader
            }
        }
    }

    fn remove(&self, id: &ClassLoaderId) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            tracing::debug!(id = %id, "removed class loader");
        }
        removed
    }

    fn size(&self) -> usize {
        self.entries.len()
    }
}
