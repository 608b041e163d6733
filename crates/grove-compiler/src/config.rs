//! Compiler configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use grove_runtime::SCRIPT_CLASS;

/// Settings for one compilation. Built once per compile and never mutated
/// while a unit is running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompilerConfiguration {
    /// Binary name of the class every script class extends
    pub script_base_class: String,

    /// Where class files are written. `None` keeps them in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<PathBuf>,

    /// Emit line numbers into class files
    pub debug: bool,

    /// Number of errors tolerated before a phase gives up early
    pub tolerance: usize,
}

impl Default for CompilerConfiguration {
    fn default() -> Self {
        Self {
            script_base_class: SCRIPT_CLASS.to_string(),
            target_directory: None,
            debug: true,
            tolerance: 10,
        }
    }
}

impl CompilerConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML, e.g.
    ///
    /// ```toml
    /// script-base-class = "org.acme.ProjectScript"
    /// target-directory = "build/classes"
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn with_script_base_class(mut self, name: impl Into<String>) -> Self {
        self.script_base_class = name.into();
        self
    }

    pub fn with_target_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.target_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
