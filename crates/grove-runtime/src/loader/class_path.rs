//! Loading classes from class directories

use std::path::PathBuf;
use std::sync::Arc;

use grove_bytecode::{class_file_path, verify_class, ClassFile};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{ClassLoader, ClassPath, LoadError};
use crate::class::Class;

/// Loads classes from the `.class` files under a [`ClassPath`].
///
/// Every class is decoded and verified once and then kept for the life of
/// the loader. Classes can also be defined directly from memory with
/// [`ClassPathClassLoader::define_class`].
#[derive(Debug)]
pub struct ClassPathClassLoader {
    class_path: ClassPath,
    parent: Option<Arc<dyn ClassLoader>>,
    defined: RwLock<FxHashMap<String, Arc<Class>>>,
}

impl ClassPathClassLoader {
    pub fn new(class_path: ClassPath, parent: Option<Arc<dyn ClassLoader>>) -> Self {
        Self {
            class_path,
            parent,
            defined: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn class_path(&self) -> &ClassPath {
        &self.class_path
    }

    /// Define a class from an in-memory class file. Returns the already
    /// defined class if one of the same name exists.
    pub fn define_class(&self, file: ClassFile) -> Result<Arc<Class>, LoadError> {
        if let Some(existing) = self.defined.read().get(&file.name) {
            return Ok(existing.clone());
        }
        let path = PathBuf::from(format!("<memory>/{}", file.name));
        verify_class(&file).map_err(|source| LoadError::Verify {
            path: path.clone(),
            source,
        })?;
        self.link(file)
    }

    /// Number of classes defined so far
    pub fn defined_count(&self) -> usize {
        self.defined.read().len()
    }

    fn read_class_file(&self, name: &str) -> Result<Option<ClassFile>, LoadError> {
        for root in self.class_path.roots() {
            let path = class_file_path(root, name);
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(LoadError::Io { path, source }),
            };

            let file = ClassFile::decode(&bytes).map_err(|source| LoadError::Malformed {
                path: path.clone(),
                source,
            })?;
            if file.name != name {
                return Err(LoadError::NameMismatch {
                    path,
                    expected: name.to_string(),
                    found: file.name,
                });
            }
            verify_class(&file).map_err(|source| LoadError::Verify {
                path: path.clone(),
                source,
            })?;

            tracing::trace!(class = name, path = %path.display(), "read class file");
            return Ok(Some(file));
        }
        Ok(None)
    }

    fn link(&self, file: ClassFile) -> Result<Arc<Class>, LoadError> {
        let super_class = match &file.super_name {
            Some(super_name) => Some(self.load_class(super_name).map_err(|source| {
                LoadError::MissingSuperclass {
                    class: file.name.clone(),
                    super_name: super_name.clone(),
                    source: Box::new(source),
                }
            })?),
            None => None,
        };

        let class = Arc::new(Class::compiled(file, super_class));
        let mut defined = self.defined.write();
        // a racing definition of the same class wins; keep identity stable
        let class = defined
            .entry(class.name().to_string())
            .or_insert(class)
            .clone();
        Ok(class)
    }
}

impl ClassLoader for ClassPathClassLoader {
    fn parent(&self) -> Option<&Arc<dyn ClassLoader>> {
        self.parent.as_ref()
    }

    fn find_class(&self, name: &str) -> Result<Option<Arc<Class>>, LoadError> {
        if let Some(class) = self.defined.read().get(name) {
            return Ok(Some(class.clone()));
        }
        match self.read_class_file(name)? {
            Some(file) => self.link(file).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SystemClassLoader;
    use crate::SCRIPT_CLASS;
    use grove_bytecode::{Method, Opcode};

    fn script_file(name: &str) -> ClassFile {
        let mut file = ClassFile::new(name, Some(SCRIPT_CLASS.to_string()));
        file.methods.push(Method {
            name: "run".to_string(),
            param_count: 0,
            local_count: 0,
            line: 1,
            code: vec![Opcode::ReturnNull.to_u8()],
        });
        file
    }

    fn write_class(root: &std::path::Path, file: &ClassFile) {
        let path = class_file_path(root, &file.name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, file.encode()).unwrap();
    }

    fn system() -> Option<Arc<dyn ClassLoader>> {
        Some(Arc::new(SystemClassLoader::new()))
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), &script_file("org.acme.Build"));

        let loader = ClassPathClassLoader::new(ClassPath::of(dir.path()), system());
        let class = loader.load_class("org.acme.Build").unwrap();

        assert_eq!(class.name(), "org.acme.Build");
        assert_eq!(class.super_class().map(|c| c.name()), Some(SCRIPT_CLASS));
        // second load returns the same class
        let again = loader.load_class("org.acme.Build").unwrap();
        assert!(Arc::ptr_eq(&class, &again));
        assert_eq!(loader.defined_count(), 1);
    }

    #[test]
    fn test_missing_class() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ClassPathClassLoader::new(ClassPath::of(dir.path()), system());
        assert!(matches!(
            loader.load_class("Nope"),
            Err(LoadError::ClassNotFound(_))
        ));
    }

    #[test]
    fn test_name_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let file = script_file("Other");
        std::fs::write(dir.path().join("Expected.class"), file.encode()).unwrap();

        let loader = ClassPathClassLoader::new(ClassPath::of(dir.path()), system());
        assert!(matches!(
            loader.load_class("Expected"),
            Err(LoadError::NameMismatch { found, .. }) if found == "Other"
        ));
    }

    #[test]
    fn test_corrupt_class_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken.class"), b"not a class").unwrap();

        let loader = ClassPathClassLoader::new(ClassPath::of(dir.path()), system());
        assert!(matches!(
            loader.load_class("Broken"),
            Err(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_superclass() {
        let loader = ClassPathClassLoader::new(ClassPath::empty(), system());
        let file = ClassFile::new("Orphan", Some("org.acme.Gone".to_string()));

        let err = loader.define_class(file).unwrap_err();
        assert!(matches!(err, LoadError::MissingSuperclass { super_name, .. } if super_name == "org.acme.Gone"));
    }

    #[test]
    fn test_define_class_rejects_unverifiable_code() {
        let loader = ClassPathClassLoader::new(ClassPath::empty(), system());
        let mut file = script_file("Bad");
        file.methods[0].code = vec![Opcode::Pop.to_u8()];

        assert!(matches!(
            loader.define_class(file),
            Err(LoadError::Verify { .. })
        ));
    }
}
