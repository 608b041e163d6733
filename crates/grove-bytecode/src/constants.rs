//! Constant pool for class files

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};

/// Constant pool containing literal values
///
/// Strings double as names: method names, binding variable names and class
/// references all point into `strings`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    /// String constants
    pub strings: Vec<String>,
    /// Integer constants
    pub integers: Vec<i64>,
    /// Float constants
    pub floats: Vec<f64>,
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string constant and return its index, reusing an equal entry
    pub fn add_string(&mut self, s: &str) -> u32 {
        if let Some(index) = self.strings.iter().position(|existing| existing == s) {
            return index as u32;
        }
        self.strings.push(s.to_string());
        (self.strings.len() - 1) as u32
    }

    /// Add an integer constant and return its index, reusing an equal entry
    pub fn add_integer(&mut self, i: i64) -> u32 {
        if let Some(index) = self.integers.iter().position(|&existing| existing == i) {
            return index as u32;
        }
        self.integers.push(i);
        (self.integers.len() - 1) as u32
    }

    /// Add a float constant and return its index
    pub fn add_float(&mut self, f: f64) -> u32 {
        self.floats.push(f);
        (self.floats.len() - 1) as u32
    }

    /// Get a string constant by index
    pub fn get_string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(|s| s.as_str())
    }

    /// Get an integer constant by index
    pub fn get_integer(&self, index: u32) -> Option<i64> {
        self.integers.get(index as usize).copied()
    }

    /// Get a float constant by index
    pub fn get_float(&self, index: u32) -> Option<f64> {
        self.floats.get(index as usize).copied()
    }

    /// Encode the constant pool to binary format
    ///
    /// Format:
    /// - String count (u32), then each string as length (u32) + UTF-8 bytes
    /// - Integer count (u32), then each integer as i64
    /// - Float count (u32), then each float as f64
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.strings.len() as u32);
        for s in &self.strings {
            writer.emit_string(s);
        }

        writer.emit_u32(self.integers.len() as u32);
        for &i in &self.integers {
            writer.emit_i64(i);
        }

        writer.emit_u32(self.floats.len() as u32);
        for &f in &self.floats {
            writer.emit_f64(f);
        }
    }

    /// Decode the constant pool from binary format
    pub fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let mut pool = ConstantPool::new();

        let string_count = reader.read_u32()? as usize;
        for _ in 0..string_count {
            pool.strings.push(reader.read_string()?);
        }

        let int_count = reader.read_u32()? as usize;
        for _ in 0..int_count {
            pool.integers.push(reader.read_i64()?);
        }

        let float_count = reader.read_u32()? as usize;
        for _ in 0..float_count {
            pool.floats.push(reader.read_f64()?);
        }

        Ok(pool)
    }
}
