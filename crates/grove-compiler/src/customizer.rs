//! Phase operations and compilation customizers

use crate::error::CompileResult;
use crate::phase::Phase;
use crate::source::SourceUnit;

/// Work done on every source unit when the unit reaches a given phase
pub trait SourceUnitOperation {
    fn call(&mut self, unit: &mut SourceUnit) -> CompileResult<()>;
}

impl<T: SourceUnitOperation + ?Sized> SourceUnitOperation for &mut T {
    fn call(&mut self, unit: &mut SourceUnit) -> CompileResult<()> {
        (**self).call(unit)
    }
}

impl<T: SourceUnitOperation + ?Sized> SourceUnitOperation for Box<T> {
    fn call(&mut self, unit: &mut SourceUnit) -> CompileResult<()> {
        (**self).call(unit)
    }
}

/// An operation that knows the phase it belongs to
pub trait CompilationCustomizer: SourceUnitOperation {
    fn phase(&self) -> Phase;
}

/// Adds star imports to every module during conversion
#[derive(Debug, Clone, Default)]
pub struct ImportCustomizer {
    star_imports: Vec<String>,
}

impl ImportCustomizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `packages` are package names such as `org.acme.api`
    pub fn add_star_imports<I, S>(&mut self, packages: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.star_imports
            .extend(packages.into_iter().map(|p| p.as_ref().to_string()));
        self
    }

    pub fn star_imports(&self) -> &[String] {
        &self.star_imports
    }
}

impl SourceUnitOperation for ImportCustomizer {
    fn call(&mut self, unit: &mut SourceUnit) -> CompileResult<()> {
        if let Some(module) = unit.ast_mut() {
            for package in &self.star_imports {
                module.add_star_import(package);
            }
        }
        Ok(())
    }
}

impl CompilationCustomizer for ImportCustomizer {
    fn phase(&self) -> Phase {
        Phase::Conversion
    }
}
