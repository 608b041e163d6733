//! AST observers installed at canonicalization

use grove_compiler::{CompileResult, SourceUnit, SourceUnitOperation};
use grove_parser::ast::utils::may_have_an_effect;

/// Records whether the script declared a package
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageStatementDetector {
    has_package_statement: bool,
}

impl PackageStatementDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_package_statement(&self) -> bool {
        self.has_package_statement
    }
}

impl SourceUnitOperation for PackageStatementDetector {
    fn call(&mut self, unit: &mut SourceUnit) -> CompileResult<()> {
        self.has_package_statement = unit.ast().is_some_and(|module| module.has_package());
        Ok(())
    }
}

/// Records whether running the script could do anything, and whether it
/// declares methods
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScriptDetector {
    empty_script: bool,
    has_methods: bool,
}

impl EmptyScriptDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty_script(&self) -> bool {
        self.empty_script
    }

    pub fn has_methods(&self) -> bool {
        self.has_methods
    }
}

impl SourceUnitOperation for EmptyScriptDetector {
    fn call(&mut self, unit: &mut SourceUnit) -> CompileResult<()> {
        let Some(module) = unit.ast() else {
            return Ok(());
        };
        if !module.methods.is_empty() {
            self.has_methods = true;
        }
        self.empty_script = !module.statements.iter().any(may_have_an_effect);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_compiler::{CodeSource, CompilationUnit, CompilerConfiguration, NoOpResourceLoader, Phase};
    use grove_runtime::SystemClassLoader;
    use std::sync::Arc;

    fn detect(text: &str) -> (PackageStatementDetector, EmptyScriptDetector) {
        let mut package = PackageStatementDetector::new();
        let mut empty = EmptyScriptDetector::new();
        let mut unit = CompilationUnit::new(
            CompilerConfiguration::default(),
            Arc::new(SystemClassLoader::new()),
            Arc::new(NoOpResourceLoader),
        );
        unit.add_source(CodeSource::new(text, "Script1", "/grove/script"));
        unit.add_phase_operation(Box::new(&mut package), Phase::Canonicalization);
        unit.add_phase_operation(Box::new(&mut empty), Phase::Canonicalization);
        unit.compile().unwrap();
        (package, empty)
    }

    #[test]
    fn test_empty_sources() {
        for text in ["", "// nothing\n", "1\n'two'\nnull", "def x\ndef y = 2\n{}", "return"] {
            let (package, empty) = detect(text);
            assert!(empty.is_empty_script(), "{:?} should be empty", text);
            assert!(!empty.has_methods());
            assert!(!package.has_package_statement());
        }
    }

    #[test]
    fn test_effects() {
        for text in ["println 'hi'", "x = 1", "def y = x", "if (true) 1", "1 + 2"] {
            let (_, empty) = detect(text);
            assert!(!empty.is_empty_script(), "{:?} should have an effect", text);
        }
    }

    #[test]
    fn test_methods_only() {
        let (_, empty) = detect("def foo() {}");
        assert!(empty.is_empty_script());
        assert!(empty.has_methods());
    }

    #[test]
    fn test_package() {
        let (package, empty) = detect("package foo.bar; 1");
        assert!(package.has_package_statement());
        assert!(empty.is_empty_script());
    }
}
