//! Restricting what a child loader can see of its parent

use std::collections::BTreeSet;
use std::sync::Arc;

use super::{ClassLoader, LoadError};
use crate::class::Class;

/// The packages and classes a [`FilteringClassLoader`] lets through
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSpec {
    packages: BTreeSet<String>,
    class_names: BTreeSet<String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow every class in `package` and its subpackages.
    pub fn allow_package(mut self, package: impl Into<String>) -> Self {
        let mut package = package.into();
        if !package.ends_with('.') {
            package.push('.');
        }
        self.packages.insert(package);
        self
    }

    /// Allow a single class by binary name.
    pub fn allow_class(mut self, name: impl Into<String>) -> Self {
        self.class_names.insert(name.into());
        self
    }

    pub fn allows(&self, name: &str) -> bool {
        self.class_names.contains(name) || self.packages.iter().any(|p| name.starts_with(p.as_str()))
    }
}

/// Exposes only the classes of its delegate that a [`FilterSpec`] allows.
///
/// The filtering loader has no parent of its own: the delegate is asked
/// directly, so nothing outside the spec leaks through the parent chain.
#[derive(Debug)]
pub struct FilteringClassLoader {
    delegate: Arc<dyn ClassLoader>,
    spec: FilterSpec,
}

impl FilteringClassLoader {
    pub fn new(delegate: Arc<dyn ClassLoader>, spec: FilterSpec) -> Self {
        Self { delegate, spec }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }
}

impl ClassLoader for FilteringClassLoader {
    fn parent(&self) -> Option<&Arc<dyn ClassLoader>> {
        None
    }

    fn find_class(&self, name: &str) -> Result<Option<Arc<Class>>, LoadError> {
        if !self.spec.allows(name) {
            return Ok(None);
        }
        match self.delegate.load_class(name) {
            Ok(class) => Ok(Some(class)),
            Err(LoadError::ClassNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SystemClassLoader;

    #[test]
    fn test_filter_spec() {
        let spec = FilterSpec::new()
            .allow_package("java.util")
            .allow_class("java.lang.String");

        assert!(spec.allows("java.util.Map"));
        assert!(spec.allows("java.util.Map$Entry"));
        assert!(spec.allows("java.lang.String"));
        assert!(!spec.allows("java.lang.Integer"));
        assert!(!spec.allows("java.utilities.Foo"));
    }

    #[test]
    fn test_filtering_hides_classes() {
        let spec = FilterSpec::new().allow_package("java.lang");
        let loader = FilteringClassLoader::new(Arc::new(SystemClassLoader::new()), spec);

        assert!(loader.load_class("java.lang.String").is_ok());
        assert!(matches!(
            loader.load_class("java.util.List"),
            Err(LoadError::ClassNotFound(_))
        ));
    }
}
