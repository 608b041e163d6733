//! Class file verification

use std::collections::HashSet;

use crate::class_file::{ClassFile, Method, MAGIC, VERSION};
use crate::encoder::BytecodeReader;
use crate::opcode::Opcode;

/// Bytecode verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Invalid opcode
    #[error("Invalid opcode {opcode:#x} in {method} at offset {offset}")]
    InvalidOpcode {
        /// Method being verified
        method: String,
        /// Offending byte
        opcode: u8,
        /// Offset of the byte
        offset: usize,
    },

    /// Operands run past the end of the code
    #[error("Truncated instruction {opcode} in {method} at offset {offset}")]
    TruncatedInstruction {
        /// Method being verified
        method: String,
        /// Instruction whose operands are cut off
        opcode: Opcode,
        /// Offset of the instruction
        offset: usize,
    },

    /// Invalid jump target
    #[error("Invalid jump target {target} in {method} at offset {offset}")]
    InvalidJumpTarget {
        /// Method being verified
        method: String,
        /// Target offset
        target: i64,
        /// Offset of the jump
        offset: usize,
    },

    /// Invalid constant pool reference
    #[error("Invalid constant pool reference: index {index} in {method} at offset {offset}")]
    InvalidConstantRef {
        /// Method being verified
        method: String,
        /// Referenced index
        index: u32,
        /// Offset of the instruction
        offset: usize,
    },

    /// Invalid local variable reference
    #[error("Invalid local variable reference: index {index} (max {max}) in {method} at offset {offset}")]
    InvalidLocalRef {
        /// Method being verified
        method: String,
        /// Referenced slot
        index: u16,
        /// Number of slots
        max: u16,
        /// Offset of the instruction
        offset: usize,
    },

    /// Execution falls off end
    #[error("Execution falls off end of {0}")]
    FallOffEnd(String),

    /// More parameters than local slots
    #[error("Method {0} declares more parameters than locals")]
    ParamsExceedLocals(String),

    /// Two methods share a name
    #[error("Duplicate method {0}")]
    DuplicateMethod(String),

    /// Header validation error
    #[error("Class validation error: {0}")]
    ClassValidation(String),
}

/// Verify a class file's structure and bytecode
pub fn verify_class(class: &ClassFile) -> Result<(), VerifyError> {
    if class.magic != MAGIC {
        return Err(VerifyError::ClassValidation("invalid magic number".to_string()));
    }
    if class.version != VERSION {
        return Err(VerifyError::ClassValidation(format!(
            "unsupported version {}",
            class.version
        )));
    }
    if class.name.is_empty() {
        return Err(VerifyError::ClassValidation("empty class name".to_string()));
    }

    let mut seen = HashSet::new();
    for method in &class.methods {
        if !seen.insert(method.name.as_str()) {
            return Err(VerifyError::DuplicateMethod(method.name.clone()));
        }
        verify_method(method, class)?;
    }

    Ok(())
}

/// Parsed instruction
#[derive(Debug, Clone, Copy)]
struct Instruction {
    offset: usize,
    opcode: Opcode,
    /// Offset of the first byte after the operands
    next: usize,
}

fn verify_method(method: &Method, class: &ClassFile) -> Result<(), VerifyError> {
    if method.param_count > method.local_count {
        return Err(VerifyError::ParamsExceedLocals(method.name.clone()));
    }

    let instructions = parse_instructions(method)?;
    let boundaries: HashSet<usize> = instructions.iter().map(|i| i.offset).collect();

    for instruction in &instructions {
        let mut reader = BytecodeReader::new(&method.code);
        reader.seek(instruction.offset + 1);
        // operand widths were checked by parse_instructions
        match instruction.opcode {
            Opcode::ConstInt => {
                let index = reader.read_u32().unwrap_or_default();
                check_constant(method, instruction, index, class.constants.integers.len())?;
            }
            Opcode::ConstFloat => {
                let index = reader.read_u32().unwrap_or_default();
                check_constant(method, instruction, index, class.constants.floats.len())?;
            }
            Opcode::ConstStr
            | Opcode::ConstClass
            | Opcode::LoadVar
            | Opcode::StoreVar
            | Opcode::GetProperty
            | Opcode::InvokeMethod
            | Opcode::InvokeVirtual => {
                let index = reader.read_u32().unwrap_or_default();
                check_constant(method, instruction, index, class.constants.strings.len())?;
            }
            Opcode::LoadLocal | Opcode::StoreLocal => {
                let index = reader.read_u16().unwrap_or_default();
                if index >= method.local_count {
                    return Err(VerifyError::InvalidLocalRef {
                        method: method.name.clone(),
                        index,
                        max: method.local_count,
                        offset: instruction.offset,
                    });
                }
            }
            op if op.is_jump() => {
                let delta = reader.read_i32().unwrap_or_default();
                let target = instruction.next as i64 + delta as i64;
                let valid = target >= 0 && boundaries.contains(&(target as usize));
                if !valid {
                    return Err(VerifyError::InvalidJumpTarget {
                        method: method.name.clone(),
                        target,
                        offset: instruction.offset,
                    });
                }
            }
            _ => {}
        }
    }

    match instructions.last() {
        Some(last) if last.opcode.is_terminator() => Ok(()),
        _ => Err(VerifyError::FallOffEnd(method.name.clone())),
    }
}

fn check_constant(
    method: &Method,
    instruction: &Instruction,
    index: u32,
    len: usize,
) -> Result<(), VerifyError> {
    if (index as usize) < len {
        Ok(())
    } else {
        Err(VerifyError::InvalidConstantRef {
            method: method.name.clone(),
            index,
            offset: instruction.offset,
        })
    }
}

/// Parse all instructions from a method body
fn parse_instructions(method: &Method) -> Result<Vec<Instruction>, VerifyError> {
    let mut instructions = Vec::new();
    let mut reader = BytecodeReader::new(&method.code);

    while reader.has_more() {
        let offset = reader.position();
        let byte = reader.read_u8().unwrap_or_default();
        let opcode = Opcode::from_u8(byte).ok_or_else(|| VerifyError::InvalidOpcode {
            method: method.name.clone(),
            opcode: byte,
            offset,
        })?;

        let next = offset + 1 + opcode.operand_size();
        if next > method.code.len() {
            return Err(VerifyError::TruncatedInstruction {
                method: method.name.clone(),
                opcode,
                offset,
            });
        }
        reader.seek(next);

        instructions.push(Instruction {
            offset,
            opcode,
            next,
        });
    }

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::BytecodeWriter;

    fn class_with(code: Vec<u8>, local_count: u16) -> ClassFile {
        let mut class = ClassFile::new("Test", None);
        class.constants.add_string("x");
        class.methods.push(Method {
            name: "run".to_string(),
            param_count: 0,
            local_count,
            line: 1,
            code,
        });
        class
    }

    #[test]
    fn test_valid_method() {
        let mut writer = BytecodeWriter::new();
        writer.emit_indexed(Opcode::ConstStr, 0);
        writer.emit_store_local(0);
        let exit = writer.emit_jump(Opcode::Jmp);
        writer.emit_opcode(Opcode::Nop);
        writer.patch_jump(exit);
        writer.emit_opcode(Opcode::ReturnNull);

        verify_class(&class_with(writer.into_bytes(), 1)).unwrap();
    }

    #[test]
    fn test_falls_off_end() {
        let code = vec![Opcode::ConstNull.to_u8()];
        assert!(matches!(
            verify_class(&class_with(code, 0)),
            Err(VerifyError::FallOffEnd(_))
        ));
    }

    #[test]
    fn test_empty_method_falls_off_end() {
        assert!(matches!(
            verify_class(&class_with(Vec::new(), 0)),
            Err(VerifyError::FallOffEnd(_))
        ));
    }

    #[test]
    fn test_invalid_constant_ref() {
        let mut writer = BytecodeWriter::new();
        writer.emit_indexed(Opcode::ConstStr, 7);
        writer.emit_opcode(Opcode::Return);
        assert!(matches!(
            verify_class(&class_with(writer.into_bytes(), 0)),
            Err(VerifyError::InvalidConstantRef { index: 7, .. })
        ));
    }

    #[test]
    fn test_invalid_local_ref() {
        let mut writer = BytecodeWriter::new();
        writer.emit_load_local(3);
        writer.emit_opcode(Opcode::Return);
        assert!(matches!(
            verify_class(&class_with(writer.into_bytes(), 1)),
            Err(VerifyError::InvalidLocalRef { index: 3, max: 1, .. })
        ));
    }

    #[test]
    fn test_jump_into_operand() {
        let mut writer = BytecodeWriter::new();
        writer.emit_opcode(Opcode::Jmp);
        writer.emit_i32(-3);
        writer.emit_opcode(Opcode::ReturnNull);
        assert!(matches!(
            verify_class(&class_with(writer.into_bytes(), 0)),
            Err(VerifyError::InvalidJumpTarget { .. })
        ));
    }

    #[test]
    fn test_truncated_instruction() {
        let code = vec![Opcode::ConstStr.to_u8(), 0, 0];
        assert!(matches!(
            verify_class(&class_with(code, 0)),
            Err(VerifyError::TruncatedInstruction { .. })
        ));
    }

    #[test]
    fn test_duplicate_method() {
        let mut class = class_with(vec![Opcode::ReturnNull.to_u8()], 0);
        let copy = class.methods[0].clone();
        class.methods.push(copy);
        assert!(matches!(
            verify_class(&class),
            Err(VerifyError::DuplicateMethod(name)) if name == "run"
        ));
    }
}
