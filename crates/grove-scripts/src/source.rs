//! Script sources: where text comes from and how a script is named

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Text of a script, fetched on demand
pub trait TextResource: Send + Sync + fmt::Debug {
    /// `Ok(None)` when the resource does not exist. Any other failure to
    /// read it is an error.
    fn text(&self) -> io::Result<Option<String>>;
}

/// A script to compile
pub trait ScriptSource: Send + Sync + fmt::Debug {
    /// Human readable description, e.g. `build file '/p/build.gradle'`
    fn display_name(&self) -> &str;

    /// Binary name of the generated script class
    fn class_name(&self) -> &str;

    /// Name recorded as the `SourceFile` of generated classes
    fn file_name(&self) -> Option<&str>;

    fn resource(&self) -> &dyn TextResource;
}

#[derive(Debug, Clone)]
pub struct StringTextResource {
    text: Option<String>,
}

impl StringTextResource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// A resource that does not exist
    pub fn missing() -> Self {
        Self { text: None }
    }
}

impl TextResource for StringTextResource {
    fn text(&self) -> io::Result<Option<String>> {
        Ok(self.text.clone())
    }
}

/// Reads the file each time its text is requested
#[derive(Debug, Clone)]
pub struct FileTextResource {
    path: PathBuf,
}

impl FileTextResource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextResource for FileTextResource {
    fn text(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "script file does not exist");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// A script held in memory
#[derive(Debug, Clone)]
pub struct StringScriptSource {
    display_name: String,
    class_name: String,
    file_name: Option<String>,
    resource: StringTextResource,
}

impl StringScriptSource {
    pub fn new(display_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            class_name: "script".to_string(),
            file_name: None,
            resource: StringTextResource::new(text),
        }
    }

    /// A source whose text is missing; it compiles as an empty script
    pub fn missing(display_name: impl Into<String>) -> Self {
        Self {
            resource: StringTextResource::missing(),
            ..Self::new(display_name, "")
        }
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

impl ScriptSource for StringScriptSource {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    fn resource(&self) -> &dyn TextResource {
        &self.resource
    }
}

/// A script file on disk
///
/// The class name is the sanitized file stem followed by a hash of the
/// path, so two `build.grv` files in different directories never share a
/// class name.
#[derive(Debug, Clone)]
pub struct FileScriptSource {
    display_name: String,
    class_name: String,
    file_name: String,
    resource: FileTextResource,
}

impl FileScriptSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_description("script", path)
    }

    /// `description` prefixes the display name, e.g. `build file`
    pub fn with_description(description: &str, path: impl AsRef<Path>) -> Self {
        let path = absolute(path.as_ref());
        let display = path.display().to_string();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let hash = crc32fast::hash(display.as_bytes());

        Self {
            display_name: format!("{} '{}'", description, display),
            class_name: format!("{}_{:08x}", class_name_for(&stem), hash),
            file_name: display,
            resource: FileTextResource::new(&path),
        }
    }
}

impl ScriptSource for FileScriptSource {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn file_name(&self) -> Option<&str> {
        Some(&self.file_name)
    }

    fn resource(&self) -> &dyn TextResource {
        &self.resource
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Replace everything that cannot appear in an identifier
pub fn class_name_for(stem: &str) -> String {
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
