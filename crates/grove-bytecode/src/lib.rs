//! Grove class file definitions
//!
//! This crate provides the instruction set, class file format and
//! constant pool used by compiled Grove scripts. A compiled script is one
//! class file per class, stored as `<ClassName>.class` below a classes
//! directory.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class_file;
pub mod constants;
pub mod encoder;
pub mod opcode;
pub mod verify;

pub use class_file::{class_file_path, ClassFile, ClassFileError, Method};
pub use constants::ConstantPool;
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use opcode::Opcode;
pub use verify::{verify_class, VerifyError};
