//! Errors raised while compiling and loading cached scripts

use std::io;
use std::path::PathBuf;

use grove_compiler::CompilationFailed;
use grove_runtime::LoadError;
use thiserror::Error;

use crate::metadata::MetadataError;

pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, Error)]
pub enum ScriptError {
    /// The compiler rejected the script. `line` is the line of the first
    /// syntax error, when there was one.
    #[error("Could not compile {display_name}.")]
    ScriptCompilationFailed {
        display_name: String,
        line: Option<u32>,
        #[source]
        source: CompilationFailed,
    },

    /// The script's text exists but could not be read
    #[error("Could not read {display_name}.")]
    ScriptSourceUnreadable {
        display_name: String,
        #[source]
        source: io::Error,
    },

    #[error("{} should not contain a package statement.", capitalize(.display_name))]
    IllegalPackageStatement { display_name: String },

    #[error("Failed to serialize script metadata extracted for {display_name}")]
    MetadataIoError {
        display_name: String,
        #[source]
        source: MetadataError,
    },

    #[error("Failed to deserialize script metadata extracted for {display_name}")]
    MetadataUnreadable {
        display_name: String,
        #[source]
        source: MetadataError,
    },

    #[error("Cannot load script that does nothing.")]
    UnloadableEmptyScript,

    #[error(
        "Could not load compiled classes for {display_name} from cache. Expected class file {} does not exist.",
        .path.display()
    )]
    CompiledArtifactMissing {
        display_name: String,
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("Could not load compiled classes for {display_name} from cache.")]
    CompiledArtifactUnloadable {
        display_name: String,
        #[source]
        source: LoadError,
    },

    /// A cache directory could not be cleaned or created
    #[error("Could not prepare directory {}", .path.display())]
    DirectoryIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScriptError {
    /// Source line the error points at, if any
    pub fn line_number(&self) -> Option<u32> {
        match self {
            ScriptError::ScriptCompilationFailed { line, .. } => *line,
            _ => None,
        }
    }

    /// Display name of the script the error is about
    pub fn display_name(&self) -> Option<&str> {
        match self {
            ScriptError::ScriptCompilationFailed { display_name, .. }
            | ScriptError::ScriptSourceUnreadable { display_name, .. }
            | ScriptError::IllegalPackageStatement { display_name }
            | ScriptError::MetadataIoError { display_name, .. }
            | ScriptError::MetadataUnreadable { display_name, .. }
            | ScriptError::CompiledArtifactMissing { display_name, .. }
            | ScriptError::CompiledArtifactUnloadable { display_name, .. } => Some(display_name),
            ScriptError::UnloadableEmptyScript | ScriptError::DirectoryIo { .. } => None,
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ScriptError::IllegalPackageStatement {
            display_name: "build file 'a/build.gradle'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Build file 'a/build.gradle' should not contain a package statement."
        );
        assert_eq!(err.display_name(), Some("build file 'a/build.gradle'"));

        let err = ScriptError::CompiledArtifactMissing {
            display_name: "script 's'".to_string(),
            path: PathBuf::from("/cache/s_1.class"),
            source: LoadError::ClassNotFound("s_1".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Could not load compiled classes for script 's' from cache. Expected class file /cache/s_1.class does not exist."
        );
        assert_eq!(ScriptError::UnloadableEmptyScript.line_number(), None);

        let err = ScriptError::ScriptSourceUnreadable {
            display_name: "build file '/p/build.grv'".to_string(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.to_string(), "Could not read build file '/p/build.grv'.");
        assert_eq!(err.display_name(), Some("build file '/p/build.grv'"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("élan"), "Élan");
        assert_eq!(capitalize("Already"), "Already");
    }
}
