//! Class file format

use std::path::{Path, PathBuf};

use crate::constants::ConstantPool;
use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use thiserror::Error;

/// Magic number for Grove class files: "GRVC"
pub const MAGIC: [u8; 4] = *b"GRVC";

/// Current class file version
pub const VERSION: u32 = 1;

/// Size of the fixed header: magic + version + flags + checksum
const HEADER_SIZE: usize = 16;

/// Class file encoding/decoding errors
#[derive(Debug, Error)]
pub enum ClassFileError {
    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected GRVC, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Checksum stored in the header
        expected: u32,
        /// Checksum of the payload as read
        actual: u32,
    },
}

/// Class flags
pub mod flags {
    /// Class carries debug information (line numbers)
    pub const HAS_DEBUG_INFO: u32 = 1 << 0;
    /// Class was compiled from a script body
    pub const SCRIPT: u32 = 1 << 1;
}

/// A compiled class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Magic number (must be "GRVC")
    pub magic: [u8; 4],
    /// Format version
    pub version: u32,
    /// Class flags
    pub flags: u32,
    /// Binary class name, e.g. `build_3x9a` or `org.acme.Helper`
    pub name: String,
    /// Binary name of the superclass
    pub super_name: Option<String>,
    /// The `SourceFile` attribute
    pub source_file: Option<String>,
    /// Constant pool shared by all methods
    pub constants: ConstantPool,
    /// Method definitions
    pub methods: Vec<Method>,
}

/// Method definition
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Number of parameters, stored in the first locals
    pub param_count: u16,
    /// Number of local variable slots, parameters included
    pub local_count: u16,
    /// Line of the declaration in the source
    pub line: u32,
    /// Bytecode instructions
    pub code: Vec<u8>,
}

impl Method {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_u16(self.param_count);
        writer.emit_u16(self.local_count);
        writer.emit_u32(self.line);
        writer.emit_u32(self.code.len() as u32);
        writer.emit_bytes(&self.code);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let param_count = reader.read_u16()?;
        let local_count = reader.read_u16()?;
        let line = reader.read_u32()?;
        let code_len = reader.read_u32()? as usize;
        let code = reader.read_bytes(code_len)?;

        Ok(Self {
            name,
            param_count,
            local_count,
            line,
            code,
        })
    }
}

impl ClassFile {
    /// Create a new class with no methods
    pub fn new(name: impl Into<String>, super_name: Option<String>) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            name: name.into(),
            super_name,
            source_file: None,
            constants: ConstantPool::new(),
            methods: Vec::new(),
        }
    }

    /// Find a method by name
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Encode the class to binary format
    ///
    /// Format:
    /// - Header: magic (4 bytes) + version (u32) + flags (u32) + checksum (u32)
    /// - Name, superclass name, source file
    /// - Constant pool
    /// - Method table
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();

        writer.emit_bytes(&self.magic);
        writer.emit_u32(self.version);
        writer.emit_u32(self.flags);
        let checksum_offset = writer.offset();
        writer.emit_u32(0);

        writer.emit_string(&self.name);
        writer.emit_optional_string(self.super_name.as_deref());
        writer.emit_optional_string(self.source_file.as_deref());

        self.constants.encode(&mut writer);

        writer.emit_u32(self.methods.len() as u32);
        for method in &self.methods {
            method.encode(&mut writer);
        }

        // CRC32 of everything after the header
        let checksum = crc32fast::hash(&writer.buffer()[HEADER_SIZE..]);
        writer.patch_u32(checksum_offset, checksum);

        writer.into_bytes()
    }

    /// Decode a class from binary format
    pub fn decode(data: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = BytecodeReader::new(data);

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&reader.read_bytes(4)?);
        if magic != MAGIC {
            return Err(ClassFileError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ClassFileError::UnsupportedVersion(version));
        }

        let flags = reader.read_u32()?;
        let stored_checksum = reader.read_u32()?;

        let calculated_checksum = crc32fast::hash(&data[HEADER_SIZE..]);
        if stored_checksum != calculated_checksum {
            return Err(ClassFileError::ChecksumMismatch {
                expected: stored_checksum,
                actual: calculated_checksum,
            });
        }

        let name = reader.read_string()?;
        let super_name = reader.read_optional_string()?;
        let source_file = reader.read_optional_string()?;

        let constants = ConstantPool::decode(&mut reader)?;

        let method_count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            methods.push(Method::decode(&mut reader)?);
        }

        Ok(Self {
            magic,
            version,
            flags,
            name,
            super_name,
            source_file,
            constants,
            methods,
        })
    }
}

/// Location of the class file for `class_name` below `root`
///
/// Package segments become directories: `org.acme.Helper` maps to
/// `root/org/acme/Helper.class`.
pub fn class_file_path(root: &Path, class_name: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    let mut segments = class_name.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_some() {
            path.push(segment);
        } else {
            path.push(format!("{}.class", segment));
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    fn sample_class() -> ClassFile {
        let mut class = ClassFile::new("build_1a2b", Some("groovy.lang.Script".to_string()));
        class.flags = flags::SCRIPT;
        class.source_file = Some("/work/build.gradle".to_string());
        let hi = class.constants.add_string("hi");
        let println = class.constants.add_string("println");

        let mut writer = BytecodeWriter::new();
        writer.emit_indexed(Opcode::ConstStr, hi);
        writer.emit_invoke(Opcode::InvokeMethod, println, 1);
        writer.emit_opcode(Opcode::Return);
        class.methods.push(Method {
            name: "run".to_string(),
            param_count: 0,
            local_count: 0,
            line: 1,
            code: writer.into_bytes(),
        });
        class
    }

    #[test]
    fn test_class_encoding() {
        let class = sample_class();
        let decoded = ClassFile::decode(&class.encode()).unwrap();

        assert_eq!(decoded, class);
        assert_eq!(decoded.method("run").map(|m| m.line), Some(1));
        assert!(decoded.method("missing").is_none());
    }

    #[test]
    fn test_class_checksum_validation() {
        let mut bytes = sample_class().encode();
        bytes[HEADER_SIZE + 2] ^= 0xFF;

        let result = ClassFile::decode(&bytes);
        assert!(matches!(result, Err(ClassFileError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_invalid_magic_number() {
        let mut bytes = vec![b'X', b'X', b'X', b'X'];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let result = ClassFile::decode(&bytes);
        assert!(matches!(result, Err(ClassFileError::InvalidMagic(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"GRVC");
        bytes.extend_from_slice(&999u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let result = ClassFile::decode(&bytes);
        assert!(matches!(result, Err(ClassFileError::UnsupportedVersion(999))));
    }

    #[test]
    fn test_truncated_class() {
        let bytes = sample_class().encode();
        let result = ClassFile::decode(&bytes[..3]);
        assert!(matches!(result, Err(ClassFileError::DecodeError(_))));
    }

    #[test]
    fn test_class_file_path() {
        let root = Path::new("/cache/classes");
        assert_eq!(
            class_file_path(root, "build_1a2b"),
            PathBuf::from("/cache/classes/build_1a2b.class")
        );
        assert_eq!(
            class_file_path(root, "org.acme.Helper"),
            PathBuf::from("/cache/classes/org/acme/Helper.class")
        );
    }
}
