//! Binary encoding for script metadata payloads
//!
//! Values are written little-endian. Lengths and small counts use an
//! unsigned LEB128 varint (`write_small_int`), strings are a varint byte
//! length followed by UTF-8.

use std::io::{self, Read, Write};
use std::marker::PhantomData;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Varint overflow")]
    VarintOverflow,

    #[error("Invalid UTF-8 in string")]
    InvalidUtf8,

    #[error("Invalid data: {0}")]
    Invalid(String),
}

pub type SerializeResult<T> = Result<T, SerializeError>;

/// Writes primitive values
pub trait Encoder {
    fn write_bytes(&mut self, bytes: &[u8]) -> SerializeResult<()>;

    fn write_byte(&mut self, value: u8) -> SerializeResult<()> {
        self.write_bytes(&[value])
    }

    fn write_boolean(&mut self, value: bool) -> SerializeResult<()> {
        self.write_byte(u8::from(value))
    }

    fn write_int(&mut self, value: i32) -> SerializeResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Unsigned LEB128; one byte for values below 128
    fn write_small_int(&mut self, value: u32) -> SerializeResult<()> {
        let mut value = value;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                return self.write_byte(byte);
            }
            self.write_byte(byte | 0x80)?;
        }
    }

    fn write_long(&mut self, value: i64) -> SerializeResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_string(&mut self, value: &str) -> SerializeResult<()> {
        self.write_binary(value.as_bytes())
    }

    fn write_nullable_string(&mut self, value: Option<&str>) -> SerializeResult<()> {
        match value {
            Some(value) => {
                self.write_boolean(true)?;
                self.write_string(value)
            }
            None => self.write_boolean(false),
        }
    }

    /// Length-prefixed bytes
    fn write_binary(&mut self, bytes: &[u8]) -> SerializeResult<()> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| SerializeError::Invalid(format!("{} bytes is too long", bytes.len())))?;
        self.write_small_int(len)?;
        self.write_bytes(bytes)
    }
}

/// Reads what an [`Encoder`] wrote
pub trait Decoder {
    /// Fill `buf` completely
    fn read_bytes(&mut self, buf: &mut [u8]) -> SerializeResult<()>;

    fn read_byte(&mut self) -> SerializeResult<u8> {
        let mut buf = [0u8; 1];
        self.read_bytes(&mut buf)?;
        Ok(buf[0])
    }

    fn read_boolean(&mut self) -> SerializeResult<bool> {
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerializeError::Invalid(format!("{} is not a boolean", other))),
        }
    }

    fn read_int(&mut self) -> SerializeResult<i32> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_small_int(&mut self) -> SerializeResult<u32> {
        let mut value: u32 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_byte()?;
            value |= u32::from(byte & 0x7F)
                .checked_shl(shift)
                .ok_or(SerializeError::VarintOverflow)?;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 32 {
                return Err(SerializeError::VarintOverflow);
            }
        }
    }

    fn read_long(&mut self) -> SerializeResult<i64> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    fn read_string(&mut self) -> SerializeResult<String> {
        String::from_utf8(self.read_binary()?).map_err(|_| SerializeError::InvalidUtf8)
    }

    fn read_nullable_string(&mut self) -> SerializeResult<Option<String>> {
        if self.read_boolean()? {
            self.read_string().map(Some)
        } else {
            Ok(None)
        }
    }

    fn read_binary(&mut self) -> SerializeResult<Vec<u8>> {
        let len = self.read_small_int()? as usize;
        let mut buf = vec![0u8; len];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }
}

/// [`Encoder`] over any [`Write`]
#[derive(Debug)]
pub struct StreamEncoder<W> {
    out: W,
}

impl<W: Write> StreamEncoder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn flush(&mut self) -> SerializeResult<()> {
        self.out.flush().map_err(SerializeError::from)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Encoder for StreamEncoder<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> SerializeResult<()> {
        self.out.write_all(bytes).map_err(SerializeError::from)
    }
}

/// [`Decoder`] over any [`Read`]
#[derive(Debug)]
pub struct StreamDecoder<R> {
    input: R,
}

impl<R: Read> StreamDecoder<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: Read> Decoder for StreamDecoder<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> SerializeResult<()> {
        self.input.read_exact(buf).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => SerializeError::UnexpectedEof,
            _ => SerializeError::Io(err),
        })
    }
}

/// Reads and writes values of one type
///
/// A serializer used for a metadata payload must write at least one byte.
/// A record that ends after its flag byte reads back as no payload, so a
/// value encoded as nothing is lost.
pub trait Serializer<T>: Send + Sync {
    fn read(&self, decoder: &mut dyn Decoder) -> SerializeResult<T>;

    fn write(&self, encoder: &mut dyn Encoder, value: &T) -> SerializeResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl Serializer<String> for StringSerializer {
    fn read(&self, decoder: &mut dyn Decoder) -> SerializeResult<String> {
        decoder.read_string()
    }

    fn write(&self, encoder: &mut dyn Encoder, value: &String) -> SerializeResult<()> {
        encoder.write_string(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanSerializer;

impl Serializer<bool> for BooleanSerializer {
    fn read(&self, decoder: &mut dyn Decoder) -> SerializeResult<bool> {
        decoder.read_boolean()
    }

    fn write(&self, encoder: &mut dyn Encoder, value: &bool) -> SerializeResult<()> {
        encoder.write_boolean(*value)
    }
}

/// A count followed by each element
#[derive(Debug, Clone, Copy, Default)]
pub struct ListSerializer<S, T> {
    element: S,
    _marker: PhantomData<fn() -> T>,
}

impl<S, T> ListSerializer<S, T> {
    pub fn new(element: S) -> Self {
        Self {
            element,
            _marker: PhantomData,
        }
    }
}

impl<S: Serializer<T>, T> Serializer<Vec<T>> for ListSerializer<S, T> {
    fn read(&self, decoder: &mut dyn Decoder) -> SerializeResult<Vec<T>> {
        let len = decoder.read_small_int()? as usize;
        (0..len).map(|_| self.element.read(decoder)).collect()
    }

    fn write(&self, encoder: &mut dyn Encoder, value: &Vec<T>) -> SerializeResult<()> {
        let len = u32::try_from(value.len())
            .map_err(|_| SerializeError::Invalid(format!("{} elements is too many", value.len())))?;
        encoder.write_small_int(len)?;
        for element in value {
            self.element.write(encoder, element)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(f: impl FnOnce(&mut StreamEncoder<Vec<u8>>) -> SerializeResult<()>) -> Vec<u8> {
        let mut encoder = StreamEncoder::new(Vec::new());
        f(&mut encoder).unwrap();
        encoder.into_inner()
    }

    #[test]
    fn test_small_int_encoding() {
        assert_eq!(encode(|e| e.write_small_int(0)), vec![0x00]);
        assert_eq!(encode(|e| e.write_small_int(127)), vec![0x7F]);
        assert_eq!(encode(|e| e.write_small_int(300)), vec![0xAC, 0x02]);

        let bytes = encode(|e| e.write_small_int(u32::MAX));
        assert_eq!(bytes.len(), 5);
        let mut decoder = StreamDecoder::new(bytes.as_slice());
        assert_eq!(decoder.read_small_int().unwrap(), u32::MAX);
    }

    #[test]
    fn test_varint_overflow() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let mut decoder = StreamDecoder::new(&bytes[..]);
        assert!(matches!(decoder.read_small_int(), Err(SerializeError::VarintOverflow)));
    }

    #[test]
    fn test_mixed_values() {
        let bytes = encode(|e| {
            e.write_int(-7)?;
            e.write_long(1 << 40)?;
            e.write_nullable_string(None)?;
            e.write_nullable_string(Some("grove"))
        });

        let mut decoder = StreamDecoder::new(bytes.as_slice());
        assert_eq!(decoder.read_int().unwrap(), -7);
        assert_eq!(decoder.read_long().unwrap(), 1 << 40);
        assert_eq!(decoder.read_nullable_string().unwrap(), None);
        assert_eq!(decoder.read_nullable_string().unwrap().as_deref(), Some("grove"));
        assert!(matches!(decoder.read_byte(), Err(SerializeError::UnexpectedEof)));
    }

    #[test]
    fn test_list_serializer() {
        let serializer = ListSerializer::new(StringSerializer);
        let value = vec!["a".to_string(), "bc".to_string()];
        let bytes = encode(|e| serializer.write(e, &value));
        assert_eq!(bytes, vec![2, 1, b'a', 2, b'b', b'c']);

        let mut decoder = StreamDecoder::new(bytes.as_slice());
        assert_eq!(serializer.read(&mut decoder).unwrap(), value);
    }

    #[test]
    fn test_invalid_boolean() {
        let mut decoder = StreamDecoder::new(&[2u8][..]);
        assert!(matches!(decoder.read_boolean(), Err(SerializeError::Invalid(_))));
    }
}
