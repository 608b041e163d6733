//! Compilation units
//!
//! A [`CompilationUnit`] takes its sources through every [`Phase`] in
//! order. Errors are collected per phase; a phase that collected any error
//! ends the compilation with [`MultipleCompilationErrors`].

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use grove_bytecode::class_file_path;
use grove_runtime::{ClassLoader, LoadError};

use crate::class_node::{ClassNode, DefaultVerifier, Verifier};
use crate::codegen::CodeGenerator;
use crate::config::CompilerConfiguration;
use crate::customizer::{CompilationCustomizer, SourceUnitOperation};
use crate::error::{
    CompilationFailed, ErrorCollector, MultipleCompilationErrors, SyntaxErrorMessage,
    SyntaxException,
};
use crate::phase::Phase;
use crate::resolve::{ClassNodeResolver, DefaultClassNodeResolver, ResolveVisitor};
use crate::resource::ResourceLoader;
use crate::source::{CodeSource, SourceUnit};
use crate::writer::{accept, ClassVisitor, ClassWriter};

/// Creates the visitor each generated class is written through
pub type ClassVisitorFactory<'a> = Box<dyn Fn() -> Box<dyn ClassVisitor> + 'a>;

/// An encoded class produced by a compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledClass {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A set of sources compiled together
pub struct CompilationUnit<'a> {
    config: CompilerConfiguration,
    loader: Arc<dyn ClassLoader>,
    resources: Arc<dyn ResourceLoader>,
    sources: Vec<SourceUnit>,
    operations: Vec<(Phase, Box<dyn SourceUnitOperation + 'a>)>,
    resolver: Option<Box<dyn ClassNodeResolver + 'a>>,
    verifier: Option<Box<dyn Verifier + 'a>>,
    class_visitor_factory: ClassVisitorFactory<'a>,
    errors: ErrorCollector,
}

impl<'a> CompilationUnit<'a> {
    /// `loader` supplies already compiled classes, `resources` the sources
    /// of classes that are not compiled yet.
    pub fn new(
        config: CompilerConfiguration,
        loader: Arc<dyn ClassLoader>,
        resources: Arc<dyn ResourceLoader>,
    ) -> Self {
        let errors = ErrorCollector::new(config.tolerance);
        Self {
            config,
            loader,
            resources,
            sources: Vec::new(),
            operations: Vec::new(),
            resolver: None,
            verifier: None,
            class_visitor_factory: Box::new(|| Box::new(ClassWriter::new())),
            errors,
        }
    }

    pub fn config(&self) -> &CompilerConfiguration {
        &self.config
    }

    pub fn add_source(&mut self, source: CodeSource) -> &mut Self {
        self.sources.push(SourceUnit::new(source));
        self
    }

    /// Run `operation` on every source unit at the end of `phase`.
    pub fn add_phase_operation(
        &mut self,
        operation: Box<dyn SourceUnitOperation + 'a>,
        phase: Phase,
    ) -> &mut Self {
        self.operations.push((phase, operation));
        self
    }

    pub fn add_customizer(&mut self, customizer: impl CompilationCustomizer + 'a) -> &mut Self {
        let phase = customizer.phase();
        self.add_phase_operation(Box::new(customizer), phase)
    }

    /// The resolver used when none is set: class loader first, then the
    /// resource loader.
    pub fn default_class_node_resolver(&self) -> DefaultClassNodeResolver {
        DefaultClassNodeResolver::new(self.loader.clone(), self.resources.clone())
    }

    pub fn set_class_node_resolver(&mut self, resolver: Box<dyn ClassNodeResolver + 'a>) -> &mut Self {
        self.resolver = Some(resolver);
        self
    }

    /// Run `verifier` on every class node before the default checks.
    pub fn set_verifier(&mut self, verifier: impl Verifier + 'a) -> &mut Self {
        self.verifier = Some(Box::new(verifier));
        self
    }

    pub fn set_class_visitor_factory(
        &mut self,
        factory: impl Fn() -> Box<dyn ClassVisitor> + 'a,
    ) -> &mut Self {
        self.class_visitor_factory = Box::new(factory);
        self
    }

    /// Compile every source, writing class files when the configuration
    /// has a target directory.
    pub fn compile(mut self) -> Result<Vec<CompiledClass>, CompilationFailed> {
        let mut classes = Vec::new();
        for phase in Phase::ALL {
            let start = Instant::now();
            self.run_phase(phase, &mut classes)?;
            if self.errors.has_errors() {
                tracing::debug!(%phase, errors = self.errors.error_count(), "phase failed");
                return Err(MultipleCompilationErrors::new(phase, self.errors).into());
            }
            tracing::trace!(%phase, elapsed = ?start.elapsed(), "phase complete");
        }
        Ok(classes)
    }

    fn run_phase(&mut self, phase: Phase, classes: &mut Vec<CompiledClass>) -> Result<(), CompilationFailed> {
        match phase {
            Phase::Parsing => self.parse_sources(),
            Phase::SemanticAnalysis => self.resolve_sources(),
            Phase::InstructionSelection => self.select_instructions(),
            Phase::ClassGeneration => self.generate_classes(classes),
            Phase::Output => self.write_classes(classes)?,
            _ => {}
        }
        if !self.errors.has_errors() {
            self.run_operations(phase);
        }
        Ok(())
    }

    fn parse_sources(&mut self) {
        for source in &mut self.sources {
            match grove_parser::parse(source.text()) {
                Ok(module) => source.ast = Some(module),
                Err(errors) => {
                    for error in &errors {
                        self.errors.add_syntax_error(SyntaxErrorMessage::new(
                            SyntaxException::from(error),
                            source.name(),
                            source.shared_text(),
                        ));
                    }
                }
            }
            if self.errors.over_tolerance() {
                break;
            }
        }
    }

    fn resolve_sources(&mut self) {
        let base = self.config.script_base_class.clone();
        match self.loader.load_class(&base) {
            Ok(_) => {}
            Err(LoadError::ClassNotFound(_)) => {
                self.errors
                    .add_error(format!("unable to resolve class {}", base), None);
                return;
            }
            Err(err) => {
                self.errors
                    .add_error(format!("could not load script base class {}: {}", base, err), None);
                return;
            }
        }

        let mut resolver: Box<dyn ClassNodeResolver + 'a> = match self.resolver.take() {
            Some(resolver) => resolver,
            None => Box::new(self.default_class_node_resolver()),
        };
        for source in &mut self.sources {
            let Some(module) = source.ast.as_mut() else {
                continue;
            };
            let errors = ResolveVisitor::new(resolver.as_mut()).resolve_module(module);
            for cause in errors {
                self.errors.add_syntax_error(SyntaxErrorMessage::new(
                    cause,
                    source.name(),
                    source.shared_text(),
                ));
            }
        }
        self.resolver = Some(resolver);
    }

    fn select_instructions(&mut self) {
        let base = self.config.script_base_class.as_str();
        for source in &mut self.sources {
            let Some(module) = source.ast.as_ref() else {
                continue;
            };
            let node = ClassNode::script(source.name(), base, module);

            let custom = self.verifier.as_ref().map_or(Ok(()), |v| v.verify(&node));
            if let Err(err) = custom.and_then(|()| DefaultVerifier.verify(&node)) {
                self.errors.add_error(err.to_string(), Some(source.name()));
                continue;
            }
            source.class_nodes = vec![node];
        }
    }

    fn generate_classes(&mut self, classes: &mut Vec<CompiledClass>) {
        let generator = CodeGenerator::new(self.config.debug);
        for source in &self.sources {
            for node in &source.class_nodes {
                let mut file = match generator.generate(node) {
                    Ok(file) => file,
                    Err(err) => {
                        self.errors.add_error(err.to_string(), Some(source.name()));
                        continue;
                    }
                };
                file.source_file = Some(source.name().to_string());

                let mut visitor = (self.class_visitor_factory)();
                accept(&file, visitor.as_mut());
                classes.push(CompiledClass {
                    name: file.name,
                    bytes: visitor.to_byte_array(),
                });
            }
        }
    }

    fn write_classes(&self, classes: &[CompiledClass]) -> Result<(), CompilationFailed> {
        let Some(target) = &self.config.target_directory else {
            return Ok(());
        };
        for class in classes {
            let path = class_file_path(target, &class.name);
            let written = match path.parent() {
                Some(parent) => fs::create_dir_all(parent),
                None => Ok(()),
            }
            .and_then(|()| fs::write(&path, &class.bytes));

            written.map_err(|source| CompilationFailed::Output {
                class_name: class.name.clone(),
                path: path.clone(),
                source,
            })?;
            tracing::trace!(class = class.name.as_str(), path = %path.display(), "wrote class file");
        }
        Ok(())
    }

    fn run_operations(&mut self, phase: Phase) {
        for (op_phase, operation) in &mut self.operations {
            if *op_phase != phase {
                continue;
            }
            for source in &mut self.sources {
                if let Err(err) = operation.call(source) {
                    self.errors.add_error(
                        format!("General error during {}: {}", phase, err),
                        Some(source.name()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CompileError, CompileResult, Message};
    use crate::resource::NoOpResourceLoader;
    use grove_bytecode::ClassFile;
    use grove_runtime::SystemClassLoader;

    fn unit<'a>(config: CompilerConfiguration) -> CompilationUnit<'a> {
        CompilationUnit::new(
            config,
            Arc::new(SystemClassLoader::new()),
            Arc::new(NoOpResourceLoader),
        )
    }

    fn compile(source: &str) -> Result<Vec<CompiledClass>, CompilationFailed> {
        let mut unit = unit(CompilerConfiguration::default());
        unit.add_source(CodeSource::new(source, "Script1", "/grove/script"));
        unit.compile()
    }

    fn multiple(result: Result<Vec<CompiledClass>, CompilationFailed>) -> MultipleCompilationErrors {
        match result {
            Err(CompilationFailed::Multiple(errors)) => errors,
            other => panic!("expected compilation errors, got {:?}", other),
        }
    }

    /// Records the phases it ran in
    struct Recorder<'p>(&'p mut Vec<String>);

    impl SourceUnitOperation for Recorder<'_> {
        fn call(&mut self, unit: &mut SourceUnit) -> CompileResult<()> {
            self.0.push(unit.name().to_string());
            Ok(())
        }
    }

    #[test]
    fn test_compile_in_memory() {
        let classes = compile("def foo() { 1 }\nprintln 'hi'").unwrap();
        assert_eq!(classes.len(), 1);
        let file = ClassFile::decode(&classes[0].bytes).unwrap();
        assert_eq!(file.name, "Script1");
        assert_eq!(file.source_file.as_deref(), Some("Script1"));
        assert!(file.method("foo").is_some());
        assert!(file.method("run").is_some());
    }

    #[test]
    fn test_syntax_errors_fail_parsing() {
        let errors = multiple(compile("def ("));
        assert_eq!(errors.phase(), Phase::Parsing);
        let first = errors.error_collector().first_syntax_error().unwrap();
        assert_eq!(first.source_name(), "Script1");
        assert_eq!(first.line(), 1);
    }

    #[test]
    fn test_unresolved_base_class() {
        let mut unit = unit(CompilerConfiguration::default().with_script_base_class("org.acme.Missing"));
        unit.add_source(CodeSource::new("1", "Script1", "/grove/script"));
        let errors = multiple(unit.compile());
        assert_eq!(errors.phase(), Phase::SemanticAnalysis);
        assert!(errors.to_string().contains("unable to resolve class org.acme.Missing"));
    }

    #[test]
    fn test_operations_run_at_their_phase() {
        let mut seen = Vec::new();
        let mut recorder = Recorder(&mut seen);
        {
            let mut unit = unit(CompilerConfiguration::default());
            unit.add_source(CodeSource::new("1", "A", "/grove/script"));
            unit.add_source(CodeSource::new("2", "B", "/grove/script"));
            unit.add_phase_operation(Box::new(&mut recorder), Phase::Canonicalization);
            unit.compile().unwrap();
        }
        assert_eq!(seen, vec!["A", "B"]);
    }

    #[test]
    fn test_operation_failure_is_reported() {
        struct Fail;
        impl SourceUnitOperation for Fail {
            fn call(&mut self, _unit: &mut SourceUnit) -> CompileResult<()> {
                Err(CompileError::operation("boom"))
            }
        }

        let mut unit = unit(CompilerConfiguration::default());
        unit.add_source(CodeSource::new("1", "Script1", "/grove/script"));
        unit.add_phase_operation(Box::new(Fail), Phase::Canonicalization);
        let errors = multiple(unit.compile());
        assert_eq!(errors.phase(), Phase::Canonicalization);
        assert!(matches!(
            &errors.error_collector().messages()[0],
            Message::Simple(m) if m.message == "General error during canonicalization: boom"
        ));
    }

    #[test]
    fn test_custom_verifier_runs_first() {
        let reject = |node: &ClassNode| -> CompileResult<()> {
            Err(CompileError::verification(&node.name, "no scripts today"))
        };
        let mut unit = unit(CompilerConfiguration::default());
        unit.add_source(CodeSource::new("def run() {}", "Script1", "/grove/script"));
        unit.set_verifier(reject);
        let errors = multiple(unit.compile());
        assert_eq!(errors.phase(), Phase::InstructionSelection);
        assert!(errors.to_string().contains("no scripts today"));
    }

    #[test]
    fn test_writes_to_target_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut unit = unit(CompilerConfiguration::default().with_target_directory(dir.path()));
        unit.add_source(CodeSource::new("println 1", "Script1", "/grove/script"));
        unit.compile().unwrap();
        assert!(dir.path().join("Script1.class").is_file());
    }
}
