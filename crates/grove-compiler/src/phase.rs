//! Compilation phases

use std::fmt;

/// The phases a [`crate::CompilationUnit`] goes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Initialization,
    /// Source text to AST
    Parsing,
    /// AST customisation (imports)
    Conversion,
    /// Class reference resolution
    SemanticAnalysis,
    /// The complete AST is available; nothing has been emitted yet
    Canonicalization,
    /// Class nodes are built and verified
    InstructionSelection,
    /// Bytecode generation
    ClassGeneration,
    /// Class files are written
    Output,
    Finalization,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::Initialization,
        Phase::Parsing,
        Phase::Conversion,
        Phase::SemanticAnalysis,
        Phase::Canonicalization,
        Phase::InstructionSelection,
        Phase::ClassGeneration,
        Phase::Output,
        Phase::Finalization,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Initialization => "initialization",
            Phase::Parsing => "parsing",
            Phase::Conversion => "conversion",
            Phase::SemanticAnalysis => "semantic analysis",
            Phase::Canonicalization => "canonicalization",
            Phase::InstructionSelection => "instruction selection",
            Phase::ClassGeneration => "class generation",
            Phase::Output => "output",
            Phase::Finalization => "finalization",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
