//! Compiling scripts into the cache and loading them back
//!
//! A compiled script occupies two directories: the classes directory holds
//! one class file per generated class, the metadata directory holds the
//! metadata record (see [`crate::metadata`]). Both are owned by the caller,
//! which is expected to key them by script content and compile operation.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use grove_bytecode::{ConstantPool, Method};
use grove_compiler::{
    ClassNode, ClassVisitor, ClassWriter, CodeSource, CompilationFailed, CompilerConfiguration,
    ImportCustomizer, NoOpResourceLoader, Phase, ScriptClassLoader, Verifier,
};
use grove_runtime::{Class, ClassLoader, ClassLoaderCache, ClassLoaderId};

use crate::compiled::ClassesDirCompiledScript;
use crate::detectors::{EmptyScriptDetector, PackageStatementDetector};
use crate::error::{ScriptError, ScriptResult};
use crate::imports::ImportsReader;
use crate::metadata::{write_metadata, MetadataError, MetadataReader, ScriptFlags};
use crate::operation::CompileOperation;
use crate::prefilter::ShortcutClassNodeResolver;
use crate::source::ScriptSource;

/// Code base recorded for every script source handed to the compiler
pub const SCRIPT_CODE_BASE: &str = "/grove/script";

pub trait ScriptCompilationHandler: Send + Sync {
    /// Compile `source` into `classes_dir` and record its metadata in
    /// `metadata_dir`. Both directories are left empty when this fails.
    #[allow(clippy::too_many_arguments)]
    fn compile_to_dir<M>(
        &self,
        source: &dyn ScriptSource,
        parent: Arc<dyn ClassLoader>,
        classes_dir: &Path,
        metadata_dir: &Path,
        operation: Option<&dyn CompileOperation<M>>,
        base_class: &Class,
        verifier: Option<&dyn Verifier>,
    ) -> ScriptResult<()>;

    /// Read back what [`ScriptCompilationHandler::compile_to_dir`] wrote.
    /// Classes are not loaded until the handle asks for them.
    #[allow(clippy::too_many_arguments)]
    fn load_from_dir<M>(
        &self,
        source: Arc<dyn ScriptSource>,
        parent: Arc<dyn ClassLoader>,
        classes_dir: &Path,
        metadata_dir: &Path,
        operation: Option<&dyn CompileOperation<M>>,
        base_class: Arc<Class>,
        class_loader_id: ClassLoaderId,
    ) -> ScriptResult<ClassesDirCompiledScript<M>>;
}

pub struct DefaultScriptCompilationHandler {
    class_loader_cache: Arc<dyn ClassLoaderCache>,
    default_import_packages: Vec<String>,
}

impl DefaultScriptCompilationHandler {
    pub fn new(class_loader_cache: Arc<dyn ClassLoaderCache>, imports: &dyn ImportsReader) -> Self {
        Self {
            class_loader_cache,
            default_import_packages: imports.import_packages().to_vec(),
        }
    }

    pub fn class_loader_cache(&self) -> &Arc<dyn ClassLoaderCache> {
        &self.class_loader_cache
    }

    pub fn default_import_packages(&self) -> &[String] {
        &self.default_import_packages
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_and_persist<M>(
        &self,
        source: &dyn ScriptSource,
        parent: Arc<dyn ClassLoader>,
        classes_dir: &Path,
        metadata_dir: &Path,
        operation: Option<&dyn CompileOperation<M>>,
        base_class: &Class,
        verifier: Option<&dyn Verifier>,
    ) -> ScriptResult<()> {
        let config = CompilerConfiguration::new()
            .with_script_base_class(base_class.name())
            .with_target_directory(classes_dir);
        let loader =
            ScriptClassLoader::new(parent, config).with_resource_loader(Arc::new(NoOpResourceLoader));
        let transformer = operation.and_then(|op| op.transformer());

        tracing::info!(
            "Compiling {} using {}.",
            source.display_name(),
            transformer.map_or("no transformer", |t| t.name())
        );

        let text = source
            .resource()
            .text()
            .map_err(|err| ScriptError::ScriptSourceUnreadable {
                display_name: source.display_name().to_string(),
                source: err,
            })?
            .unwrap_or_default();

        let mut package_detector = PackageStatementDetector::new();
        let mut empty_detector = EmptyScriptDetector::new();

        let compiled = {
            let mut unit = loader.create_compilation_unit();

            let mut imports = ImportCustomizer::new();
            imports.add_star_imports(&self.default_import_packages);
            unit.add_customizer(imports);

            if let Some(verifier) = verifier {
                unit.set_verifier(move |node: &ClassNode| verifier.verify(node));
            }
            let resolver = ShortcutClassNodeResolver::new(unit.default_class_node_resolver());
            unit.set_class_node_resolver(Box::new(resolver));
            if let Some(transformer) = transformer {
                transformer.register(&mut unit);
            }
            unit.add_phase_operation(Box::new(&mut package_detector), Phase::Canonicalization);
            unit.add_phase_operation(Box::new(&mut empty_detector), Phase::Canonicalization);

            let file_name = source.file_name().map(str::to_string);
            unit.set_class_visitor_factory(move || {
                Box::new(SourceFileStamp::new(file_name.clone(), ClassWriter::new())) as Box<dyn ClassVisitor>
            });

            unit.add_source(CodeSource::new(&text, source.class_name(), SCRIPT_CODE_BASE));
            unit.compile()
        };
        compiled.map_err(|err| compilation_failed(source, err))?;

        if package_detector.has_package_statement() {
            return Err(ScriptError::IllegalPackageStatement {
                display_name: source.display_name().to_string(),
            });
        }

        let flags = ScriptFlags::new(empty_detector.is_empty_script(), empty_detector.has_methods());
        persist_metadata(metadata_dir, flags, operation).map_err(|err| ScriptError::MetadataIoError {
            display_name: source.display_name().to_string(),
            source: err,
        })
    }
}

impl ScriptCompilationHandler for DefaultScriptCompilationHandler {
    fn compile_to_dir<M>(
        &self,
        source: &dyn ScriptSource,
        parent: Arc<dyn ClassLoader>,
        classes_dir: &Path,
        metadata_dir: &Path,
        operation: Option<&dyn CompileOperation<M>>,
        base_class: &Class,
        verifier: Option<&dyn Verifier>,
    ) -> ScriptResult<()> {
        let started = Instant::now();
        recreate_dir(classes_dir).map_err(|err| ScriptError::DirectoryIo {
            path: classes_dir.to_path_buf(),
            source: err,
        })?;

        let result = self.compile_and_persist(
            source,
            parent,
            classes_dir,
            metadata_dir,
            operation,
            base_class,
            verifier,
        );
        match &result {
            Ok(()) => tracing::debug!(
                "Timing: Writing script to cache at {} took: {:?}",
                classes_dir.display(),
                started.elapsed()
            ),
            // a script with a package statement has already written its
            // classes; they go too
            Err(_) => {
                wipe(classes_dir);
                wipe(metadata_dir);
            }
        }
        result
    }

    fn load_from_dir<M>(
        &self,
        source: Arc<dyn ScriptSource>,
        parent: Arc<dyn ClassLoader>,
        classes_dir: &Path,
        metadata_dir: &Path,
        operation: Option<&dyn CompileOperation<M>>,
        base_class: Arc<Class>,
        class_loader_id: ClassLoaderId,
    ) -> ScriptResult<ClassesDirCompiledScript<M>> {
        let unreadable = |err: MetadataError| ScriptError::MetadataUnreadable {
            display_name: source.display_name().to_string(),
            source: err,
        };

        let mut reader = MetadataReader::open(metadata_dir).map_err(&unreadable)?;
        let flags = reader.read_flags().map_err(&unreadable)?;
        if flags.is_empty {
            // an empty script's class is never loaded; drop its loader now
            self.class_loader_cache.remove(&class_loader_id);
        }
        let data = match operation.and_then(|op| op.data_serializer()) {
            Some(serializer) => reader.read_data(serializer).map_err(&unreadable)?,
            None => None,
        };

        Ok(ClassesDirCompiledScript::new(
            flags.is_empty,
            flags.has_methods,
            class_loader_id,
            base_class,
            classes_dir,
            parent,
            source,
            data,
            Arc::clone(&self.class_loader_cache),
        ))
    }
}

fn compilation_failed(source: &dyn ScriptSource, mut err: CompilationFailed) -> ScriptError {
    let line = match &mut err {
        CompilationFailed::Multiple(errors) => {
            let collector = errors.error_collector_mut();
            for message in collector.syntax_errors_mut() {
                message.set_source_name(source.display_name());
            }
            collector.first_syntax_error().map(|message| message.line())
        }
        CompilationFailed::Output { .. } => None,
    };
    ScriptError::ScriptCompilationFailed {
        display_name: source.display_name().to_string(),
        line,
        source: err,
    }
}

/// Writes the flags and, when the operation has a serializer, whatever
/// data it extracted.
fn persist_metadata<M>(
    dir: &Path,
    flags: ScriptFlags,
    operation: Option<&dyn CompileOperation<M>>,
) -> Result<(), MetadataError> {
    match operation.and_then(|op| op.data_serializer().map(|serializer| (op, serializer))) {
        Some((op, serializer)) => {
            let data = op.extracted_data();
            write_metadata(dir, flags, data.as_ref(), Some(serializer))
        }
        None => write_metadata::<M>(dir, flags, None, None),
    }
}

fn recreate_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    fs::create_dir_all(dir)
}

/// Leave `dir` empty if it exists
fn wipe(dir: &Path) {
    if !dir.exists() {
        return;
    }
    if let Err(err) = recreate_dir(dir) {
        tracing::warn!(dir = %dir.display(), error = %err, "could not clean script cache directory");
    }
}

/// Records the script's own file name as the `SourceFile` of every class,
/// whatever name the compiler chose.
struct SourceFileStamp<V> {
    file_name: Option<String>,
    inner: V,
}

impl<V: ClassVisitor> SourceFileStamp<V> {
    fn new(file_name: Option<String>, inner: V) -> Self {
        Self { file_name, inner }
    }
}

impl<V: ClassVisitor> ClassVisitor for SourceFileStamp<V> {
    fn visit(&mut self, name: &str, super_name: Option<&str>, flags: u32) {
        self.inner.visit(name, super_name, flags);
    }

    fn visit_source(&mut self, _source_file: Option<&str>) {
        self.inner.visit_source(self.file_name.as_deref());
    }

    fn visit_constants(&mut self, constants: &ConstantPool) {
        self.inner.visit_constants(constants);
    }

    fn visit_method(&mut self, method: &Method) {
        self.inner.visit_method(method);
    }

    fn visit_end(&mut self) {
        self.inner.visit_end();
    }

    fn to_byte_array(self: Box<Self>) -> Vec<u8> {
        Box::new(self.inner).to_byte_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_bytecode::ClassFile;
    use grove_compiler::accept;

    #[test]
    fn test_source_file_stamp() {
        let mut file = ClassFile::new("Script1".to_string(), Some("groovy.lang.Script".to_string()));
        file.source_file = Some("Script1".to_string());

        let mut stamp: Box<dyn ClassVisitor> =
            Box::new(SourceFileStamp::new(Some("/p/build.grv".to_string()), ClassWriter::new()));
        accept(&file, stamp.as_mut());
        let decoded = ClassFile::decode(&stamp.to_byte_array()).unwrap();
        assert_eq!(decoded.source_file.as_deref(), Some("/p/build.grv"));

        let mut unnamed: Box<dyn ClassVisitor> = Box::new(SourceFileStamp::new(None, ClassWriter::new()));
        accept(&file, unnamed.as_mut());
        let decoded = ClassFile::decode(&unnamed.to_byte_array()).unwrap();
        assert_eq!(decoded.source_file, None);
    }

    #[test]
    fn test_recreate_and_wipe() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("classes");
        recreate_dir(&target).unwrap();
        fs::write(target.join("Old.class"), b"x").unwrap();
        recreate_dir(&target).unwrap();
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);

        fs::write(target.join("Old.class"), b"x").unwrap();
        wipe(&target);
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);

        let missing = dir.path().join("missing");
        wipe(&missing);
        assert!(!missing.exists());
    }
}
