//! Compile operations: a transformer plus the data it extracts

use std::fmt;
use std::sync::Arc;

use grove_compiler::CompilationUnit;

use crate::serialize::Serializer;

/// Hooks into a compilation, typically by adding phase operations
pub trait Transformer: Send + Sync {
    /// Shown in the "Compiling ..." log line
    fn name(&self) -> &str;

    fn register<'a>(&'a self, unit: &mut CompilationUnit<'a>);
}

/// What to do to a script beyond compiling it, and what to keep afterwards
///
/// Every part is optional. When a serializer is present, the data extracted
/// after compilation is written into the metadata record, and read back when
/// the script is loaded from the cache.
pub trait CompileOperation<M>: Send + Sync {
    /// Identifies the operation within the cache key of compiled scripts
    fn id(&self) -> &str;

    fn transformer(&self) -> Option<&dyn Transformer>;

    /// Called once, after a successful compilation
    fn extracted_data(&self) -> Option<M>;

    fn data_serializer(&self) -> Option<&dyn Serializer<M>>;
}

type Extractor<M> = Box<dyn Fn() -> Option<M> + Send + Sync>;

/// A [`CompileOperation`] assembled from independent parts
pub struct FactoryBackedCompileOperation<M> {
    id: String,
    transformer: Option<Arc<dyn Transformer>>,
    extractor: Option<Extractor<M>>,
    serializer: Option<Box<dyn Serializer<M>>>,
}

impl<M> FactoryBackedCompileOperation<M> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transformer: None,
            extractor: None,
            serializer: None,
        }
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn with_extractor(mut self, extractor: impl Fn() -> Option<M> + Send + Sync + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    pub fn with_serializer(mut self, serializer: impl Serializer<M> + 'static) -> Self {
        self.serializer = Some(Box::new(serializer));
        self
    }
}

impl<M> CompileOperation<M> for FactoryBackedCompileOperation<M> {
    fn id(&self) -> &str {
        &self.id
    }

    fn transformer(&self) -> Option<&dyn Transformer> {
        self.transformer.as_deref()
    }

    fn extracted_data(&self) -> Option<M> {
        self.extractor.as_ref().and_then(|extract| extract())
    }

    fn data_serializer(&self) -> Option<&dyn Serializer<M>> {
        self.serializer.as_deref()
    }
}

impl<M> fmt::Debug for FactoryBackedCompileOperation<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryBackedCompileOperation")
            .field("id", &self.id)
            .field("transformer", &self.transformer.as_ref().map(|t| t.name()))
            .field("has_extractor", &self.extractor.is_some())
            .field("has_serializer", &self.serializer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::StringSerializer;

    struct Named;

    impl Transformer for Named {
        fn name(&self) -> &str {
            "named"
        }

        fn register<'a>(&'a self, _unit: &mut CompilationUnit<'a>) {}
    }

    #[test]
    fn test_parts_are_optional() {
        let op = FactoryBackedCompileOperation::<String>::new("plain");
        assert_eq!(op.id(), "plain");
        assert!(op.transformer().is_none());
        assert!(op.extracted_data().is_none());
        assert!(op.data_serializer().is_none());
    }

    #[test]
    fn test_assembled() {
        let op = FactoryBackedCompileOperation::new("plugins")
            .with_transformer(Arc::new(Named))
            .with_extractor(|| Some("found".to_string()))
            .with_serializer(StringSerializer);
        assert_eq!(op.transformer().map(|t| t.name()), Some("named"));
        assert_eq!(op.extracted_data().as_deref(), Some("found"));
        assert!(op.data_serializer().is_some());
        assert!(format!("{:?}", op).contains("\"named\""));
    }
}
