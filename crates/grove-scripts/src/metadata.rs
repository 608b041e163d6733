//! The metadata record stored beside compiled script classes
//!
//! `metadata.bin` holds one flag byte and, when the compile operation has a
//! serializer, the payload it wrote. There is no version byte: a reader of
//! a different flag layout misreads the record instead of rejecting it, so
//! cache directories must be keyed by the writer's version.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::serialize::{Decoder, Encoder, SerializeError, Serializer, StreamDecoder, StreamEncoder};

pub const METADATA_FILE_NAME: &str = "metadata.bin";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Could not access metadata file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not encode or decode the metadata record")]
    Serialization(#[from] SerializeError),
}

/// What the compiler learned about a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ScriptFlags {
    /// No top-level statement has an effect
    pub is_empty: bool,
    /// The script declares at least one method
    pub has_methods: bool,
}

impl ScriptFlags {
    pub const EMPTY: u8 = 1;
    pub const HAS_METHODS: u8 = 2;

    pub fn new(is_empty: bool, has_methods: bool) -> Self {
        Self { is_empty, has_methods }
    }

    pub fn to_byte(self) -> u8 {
        (if self.is_empty { Self::EMPTY } else { 0 })
            | (if self.has_methods { Self::HAS_METHODS } else { 0 })
    }

    /// Reserved bits are ignored
    pub fn from_byte(byte: u8) -> Self {
        Self {
            is_empty: byte & Self::EMPTY != 0,
            has_methods: byte & Self::HAS_METHODS != 0,
        }
    }
}

pub fn metadata_file(dir: &Path) -> PathBuf {
    dir.join(METADATA_FILE_NAME)
}

/// Create `dir` if needed and write the record. The payload is written
/// only when both `data` and `serializer` are present.
pub fn write_metadata<M>(
    dir: &Path,
    flags: ScriptFlags,
    data: Option<&M>,
    serializer: Option<&dyn Serializer<M>>,
) -> Result<(), MetadataError> {
    let path = metadata_file(dir);
    let io_error = |source| MetadataError::Io {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(dir).map_err(io_error)?;
    let file = File::create(&path).map_err(io_error)?;
    let mut encoder = StreamEncoder::new(BufWriter::new(file));

    encoder.write_byte(flags.to_byte())?;
    if let (Some(serializer), Some(data)) = (serializer, data) {
        serializer.write(&mut encoder, data)?;
    }
    encoder.flush()?;
    Ok(())
}

/// Reads a record in two steps so callers can act on the flags before the
/// payload is decoded.
#[derive(Debug)]
pub struct MetadataReader {
    path: PathBuf,
    input: BufReader<File>,
}

impl MetadataReader {
    pub fn open(dir: &Path) -> Result<Self, MetadataError> {
        let path = metadata_file(dir);
        let file = File::open(&path).map_err(|source| MetadataError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            input: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_flags(&mut self) -> Result<ScriptFlags, MetadataError> {
        let byte = StreamDecoder::new(&mut self.input).read_byte()?;
        Ok(ScriptFlags::from_byte(byte))
    }

    /// Decode the payload. A record that ends after the flag byte has no
    /// payload, and `serializer` is not consulted.
    pub fn read_data<M>(&mut self, serializer: &dyn Serializer<M>) -> Result<Option<M>, MetadataError> {
        let at_end = self
            .input
            .fill_buf()
            .map_err(|source| MetadataError::Io {
                path: self.path.clone(),
                source,
            })?
            .is_empty();
        if at_end {
            return Ok(None);
        }
        let mut decoder = StreamDecoder::new(&mut self.input);
        Ok(Some(serializer.read(&mut decoder)?))
    }
}

/// Read flags and payload in one go
pub fn read_metadata<M>(
    dir: &Path,
    serializer: Option<&dyn Serializer<M>>,
) -> Result<(ScriptFlags, Option<M>), MetadataError> {
    let mut reader = MetadataReader::open(dir)?;
    let flags = reader.read_flags()?;
    let data = match serializer {
        Some(serializer) => reader.read_data(serializer)?,
        None => None,
    };
    Ok((flags, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{BooleanSerializer, StringSerializer};

    #[test]
    fn test_flag_bytes() {
        assert_eq!(ScriptFlags::new(true, false).to_byte(), 0b01);
        assert_eq!(ScriptFlags::new(true, true).to_byte(), 0b11);
        assert_eq!(ScriptFlags::new(false, true).to_byte(), 0b10);
        assert_eq!(ScriptFlags::new(false, false).to_byte(), 0b00);
        assert_eq!(ScriptFlags::from_byte(0b1111_1100), ScriptFlags::default());
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        write_metadata::<String>(&nested, ScriptFlags::new(true, false), None, None).unwrap();
        assert_eq!(fs::read(metadata_file(&nested)).unwrap(), vec![0b01]);
    }

    #[test]
    fn test_payload_follows_flag_byte() {
        let dir = tempfile::tempdir().unwrap();
        let data = "plugins".to_string();
        let serializer: &dyn Serializer<String> = &StringSerializer;
        write_metadata(dir.path(), ScriptFlags::new(false, true), Some(&data), Some(serializer)).unwrap();

        let bytes = fs::read(metadata_file(dir.path())).unwrap();
        assert_eq!(bytes[0], 0b10);
        assert_eq!(&bytes[1..], b"\x07plugins");

        let (flags, read) = read_metadata(dir.path(), Some(serializer)).unwrap();
        assert!(flags.has_methods);
        assert_eq!(read.as_deref(), Some("plugins"));
    }

    #[test]
    fn test_missing_payload_is_not_decoded() {
        let dir = tempfile::tempdir().unwrap();
        write_metadata::<bool>(dir.path(), ScriptFlags::new(false, false), None, None).unwrap();

        let mut reader = MetadataReader::open(dir.path()).unwrap();
        assert_eq!(reader.read_flags().unwrap(), ScriptFlags::default());
        let serializer: &dyn Serializer<bool> = &BooleanSerializer;
        assert_eq!(reader.read_data(serializer).unwrap(), None);
    }

    #[test]
    fn test_missing_file_and_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(MetadataReader::open(dir.path()), Err(MetadataError::Io { .. })));

        fs::write(metadata_file(dir.path()), [0u8, 5, b'a']).unwrap();
        let serializer: &dyn Serializer<String> = &StringSerializer;
        let err = read_metadata(dir.path(), Some(serializer)).unwrap_err();
        assert!(matches!(err, MetadataError::Serialization(SerializeError::UnexpectedEof)));

        fs::write(metadata_file(dir.path()), b"").unwrap();
        assert!(read_metadata::<String>(dir.path(), None).is_err());
    }

    struct Nothing;

    impl Serializer<()> for Nothing {
        fn read(&self, _decoder: &mut dyn Decoder) -> crate::serialize::SerializeResult<()> {
            Ok(())
        }

        fn write(&self, _encoder: &mut dyn Encoder, _value: &()) -> crate::serialize::SerializeResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_zero_byte_payload_reads_back_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let serializer: &dyn Serializer<()> = &Nothing;
        write_metadata(dir.path(), ScriptFlags::default(), Some(&()), Some(serializer)).unwrap();

        assert_eq!(fs::read(metadata_file(dir.path())).unwrap(), vec![0]);
        let (_, data) = read_metadata(dir.path(), Some(serializer)).unwrap();
        assert_eq!(data, None);
    }
}
