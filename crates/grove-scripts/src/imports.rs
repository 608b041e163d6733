//! Default star imports for compiled scripts
//!
//! The list is kept in TOML:
//!
//! ```toml
//! packages = ["org.gradle.api", "org.gradle.api.tasks"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const EMBEDDED_IMPORTS: &str = include_str!("default-imports.toml");

#[derive(Debug, Error)]
pub enum ImportsError {
    #[error("Failed to read imports file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse imports: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid import package: {0:?}")]
    InvalidPackage(String),
}

/// Supplies the packages every script star-imports
pub trait ImportsReader: Send + Sync {
    fn import_packages(&self) -> &[String];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
struct ImportsFile {
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultImportsReader {
    packages: Vec<String>,
}

impl DefaultImportsReader {
    /// The list shipped with this crate
    pub fn new() -> Result<Self, ImportsError> {
        Self::from_toml_str(EMBEDDED_IMPORTS)
    }

    pub fn from_file(path: &Path) -> Result<Self, ImportsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ImportsError> {
        let file: ImportsFile = toml::from_str(content)?;
        Self::from_packages(file.packages)
    }

    pub fn from_packages<I, S>(packages: I) -> Result<Self, ImportsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages: Vec<String> = packages.into_iter().map(Into::into).collect();
        if let Some(bad) = packages.iter().find(|p| !is_package_name(p)) {
            return Err(ImportsError::InvalidPackage(bad.clone()));
        }
        Ok(Self { packages })
    }
}

impl ImportsReader for DefaultImportsReader {
    fn import_packages(&self) -> &[String] {
        &self.packages
    }
}

fn is_package_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            segment.starts_with(|c: char| c.is_alphabetic() || c == '_')
                && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_list() {
        let reader = DefaultImportsReader::new().unwrap();
        assert!(reader.import_packages().iter().any(|p| p == "org.gradle.api"));
    }

    #[test]
    fn test_from_toml() {
        let reader = DefaultImportsReader::from_toml_str("packages = [\"a.b\", \"c\"]").unwrap();
        assert_eq!(reader.import_packages(), ["a.b", "c"]);

        let empty = DefaultImportsReader::from_toml_str("").unwrap();
        assert!(empty.import_packages().is_empty());
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            DefaultImportsReader::from_toml_str("packages = [\"a..b\"]"),
            Err(ImportsError::InvalidPackage(_))
        ));
        assert!(matches!(
            DefaultImportsReader::from_toml_str("packages = 3"),
            Err(ImportsError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imports.toml");
        std::fs::write(&path, "packages = [\"org.acme\"]").unwrap();
        let reader = DefaultImportsReader::from_file(&path).unwrap();
        assert_eq!(reader.import_packages(), ["org.acme"]);
        assert!(DefaultImportsReader::from_file(&dir.path().join("nope.toml")).is_err());
    }
}
