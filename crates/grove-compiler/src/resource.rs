//! Locating script sources for classes that are not on the class path

use std::fmt;
use std::path::{Path, PathBuf};

/// Extension of Grove script files
pub const SOURCE_EXTENSION: &str = "grv";

/// Finds the source file that would define a class
pub trait ResourceLoader: Send + Sync + fmt::Debug {
    fn load_source(&self, class_name: &str) -> Option<PathBuf>;
}

/// Looks for `a/b/C.grv` under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryResourceLoader {
    root: PathBuf,
}

impl DirectoryResourceLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ResourceLoader for DirectoryResourceLoader {
    fn load_source(&self, class_name: &str) -> Option<PathBuf> {
        // nested classes live in the source of their outermost class
        let outer = class_name.split('$').next().unwrap_or(class_name);
        let mut path = self.root.clone();
        for segment in outer.split('.') {
            path.push(segment);
        }
        path.set_extension(SOURCE_EXTENSION);
        path.is_file().then_some(path)
    }
}

/// Never finds anything; keeps compilation from touching arbitrary files
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpResourceLoader;

impl ResourceLoader for NoOpResourceLoader {
    fn load_source(&self, _class_name: &str) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("org/acme")).unwrap();
        std::fs::write(dir.path().join("org/acme/Helper.grv"), "def help() {}").unwrap();

        let loader = DirectoryResourceLoader::new(dir.path());
        assert_eq!(
            loader.load_source("org.acme.Helper"),
            Some(dir.path().join("org/acme/Helper.grv"))
        );
        assert!(loader.load_source("org.acme.Helper$Inner").is_some());
        assert!(loader.load_source("org.acme.Missing").is_none());
        assert!(NoOpResourceLoader.load_source("org.acme.Helper").is_none());
    }
}
