//! Instruction set for compiled Grove scripts
//!
//! All opcodes are single-byte instructions. Some opcodes take operands that
//! follow the opcode byte in the instruction stream; [`Opcode::operand_size`]
//! gives their width.
//!
//! Opcodes are organized into categories:
//! - 0x00-0x0F: Stack manipulation & constants
//! - 0x10-0x1F: Locals, binding variables and properties
//! - 0x20-0x2F: Arithmetic
//! - 0x30-0x3F: Comparison & logical
//! - 0x40-0x4F: Control flow
//! - 0x50-0x5F: Method invocation
//! - 0x60-0x6F: Lists
//! - 0x70-0x7F: Returns

/// Bytecode opcode enumeration
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack Manipulation & Constants (0x00-0x0F) =====
    /// No operation
    Nop = 0x00,
    /// Pop top value from stack
    Pop = 0x01,
    /// Duplicate top stack value
    Dup = 0x02,

    /// Push null constant
    ConstNull = 0x04,
    /// Push true constant
    ConstTrue = 0x05,
    /// Push false constant
    ConstFalse = 0x06,
    /// Push integer constant from pool (operand: u32 index)
    ConstInt = 0x07,
    /// Push float constant from pool (operand: u32 index)
    ConstFloat = 0x08,
    /// Push string constant from pool (operand: u32 index)
    ConstStr = 0x09,
    /// Push a class reference named by a string constant (operand: u32 index)
    ConstClass = 0x0A,

    // ===== Locals, Variables & Properties (0x10-0x1F) =====
    /// Load local variable onto stack (operand: u16 index)
    LoadLocal = 0x10,
    /// Store top of stack into local variable (operand: u16 index)
    StoreLocal = 0x11,
    /// Load a binding variable by name (operand: u32 string index)
    LoadVar = 0x12,
    /// Store top of stack into a binding variable (operand: u32 string index)
    StoreVar = 0x13,
    /// Read a property of the value on top of the stack (operand: u32 string index)
    GetProperty = 0x14,

    // ===== Arithmetic (0x20-0x2F) =====
    /// Add (numbers) or concatenate (strings, lists)
    Add = 0x20,
    /// Subtract
    Sub = 0x21,
    /// Multiply
    Mul = 0x22,
    /// Divide
    Div = 0x23,
    /// Remainder
    Mod = 0x24,
    /// Negate
    Neg = 0x25,

    // ===== Comparison & Logical (0x30-0x3F) =====
    /// Equality
    Eq = 0x30,
    /// Inequality
    Ne = 0x31,
    /// Less than
    Lt = 0x32,
    /// Less than or equal
    Le = 0x33,
    /// Greater than
    Gt = 0x34,
    /// Greater than or equal
    Ge = 0x35,
    /// Logical not of the value's truthiness
    Not = 0x36,

    // ===== Control Flow (0x40-0x4F) =====
    /// Unconditional jump (operand: i32 offset relative to the next instruction)
    Jmp = 0x40,
    /// Jump if top of stack is falsy (operand: i32 offset)
    JmpIfFalse = 0x41,
    /// Jump if top of stack is truthy (operand: i32 offset)
    JmpIfTrue = 0x42,

    // ===== Method Invocation (0x50-0x5F) =====
    /// Invoke a method on the running script (operands: u32 name index, u16 arg count)
    InvokeMethod = 0x50,
    /// Invoke a method on a receiver below the arguments (operands: u32 name index, u16 arg count)
    InvokeVirtual = 0x51,

    // ===== Lists (0x60-0x6F) =====
    /// Build a list from the top N stack values (operand: u16 count)
    NewList = 0x60,

    // ===== Returns (0x70-0x7F) =====
    /// Return top of stack
    Return = 0x70,
    /// Return null
    ReturnNull = 0x71,
}

impl Opcode {
    /// Convert a byte to an opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Pop),
            0x02 => Some(Self::Dup),
            0x04 => Some(Self::ConstNull),
            0x05 => Some(Self::ConstTrue),
            0x06 => Some(Self::ConstFalse),
            0x07 => Some(Self::ConstInt),
            0x08 => Some(Self::ConstFloat),
            0x09 => Some(Self::ConstStr),
            0x0A => Some(Self::ConstClass),

            0x10 => Some(Self::LoadLocal),
            0x11 => Some(Self::StoreLocal),
            0x12 => Some(Self::LoadVar),
            0x13 => Some(Self::StoreVar),
            0x14 => Some(Self::GetProperty),

            0x20 => Some(Self::Add),
            0x21 => Some(Self::Sub),
            0x22 => Some(Self::Mul),
            0x23 => Some(Self::Div),
            0x24 => Some(Self::Mod),
            0x25 => Some(Self::Neg),

            0x30 => Some(Self::Eq),
            0x31 => Some(Self::Ne),
            0x32 => Some(Self::Lt),
            0x33 => Some(Self::Le),
            0x34 => Some(Self::Gt),
            0x35 => Some(Self::Ge),
            0x36 => Some(Self::Not),

            0x40 => Some(Self::Jmp),
            0x41 => Some(Self::JmpIfFalse),
            0x42 => Some(Self::JmpIfTrue),

            0x50 => Some(Self::InvokeMethod),
            0x51 => Some(Self::InvokeVirtual),

            0x60 => Some(Self::NewList),

            0x70 => Some(Self::Return),
            0x71 => Some(Self::ReturnNull),

            _ => None,
        }
    }

    /// Convert opcode to byte
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get the human-readable name of the opcode
    pub fn name(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Pop => "POP",
            Self::Dup => "DUP",
            Self::ConstNull => "CONST_NULL",
            Self::ConstTrue => "CONST_TRUE",
            Self::ConstFalse => "CONST_FALSE",
            Self::ConstInt => "CONST_INT",
            Self::ConstFloat => "CONST_FLOAT",
            Self::ConstStr => "CONST_STR",
            Self::ConstClass => "CONST_CLASS",
            Self::LoadLocal => "LOAD_LOCAL",
            Self::StoreLocal => "STORE_LOCAL",
            Self::LoadVar => "LOAD_VAR",
            Self::StoreVar => "STORE_VAR",
            Self::GetProperty => "GET_PROPERTY",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Neg => "NEG",
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::Not => "NOT",
            Self::Jmp => "JMP",
            Self::JmpIfFalse => "JMP_IF_FALSE",
            Self::JmpIfTrue => "JMP_IF_TRUE",
            Self::InvokeMethod => "INVOKE_METHOD",
            Self::InvokeVirtual => "INVOKE_VIRTUAL",
            Self::NewList => "NEW_LIST",
            Self::Return => "RETURN",
            Self::ReturnNull => "RETURN_NULL",
        }
    }

    /// Number of operand bytes following the opcode
    pub fn operand_size(self) -> usize {
        match self {
            Self::ConstInt
            | Self::ConstFloat
            | Self::ConstStr
            | Self::ConstClass
            | Self::LoadVar
            | Self::StoreVar
            | Self::GetProperty
            | Self::Jmp
            | Self::JmpIfFalse
            | Self::JmpIfTrue => 4,
            Self::LoadLocal | Self::StoreLocal | Self::NewList => 2,
            Self::InvokeMethod | Self::InvokeVirtual => 6,
            _ => 0,
        }
    }

    /// Check if this opcode is a jump
    pub fn is_jump(self) -> bool {
        matches!(self, Self::Jmp | Self::JmpIfFalse | Self::JmpIfTrue)
    }

    /// Check if this opcode returns from the current method
    pub fn is_return(self) -> bool {
        matches!(self, Self::Return | Self::ReturnNull)
    }

    /// Check if control never falls through to the next instruction
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Jmp) || self.is_return()
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip_through_byte() {
        for byte in 0..=u8::MAX {
            if let Some(op) = Opcode::from_u8(byte) {
                assert_eq!(op.to_u8(), byte, "{} decoded from {:#x}", op, byte);
            }
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert_eq!(Opcode::from_u8(0x03), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn test_terminators() {
        assert!(Opcode::Return.is_terminator());
        assert!(Opcode::ReturnNull.is_terminator());
        assert!(Opcode::Jmp.is_terminator());
        assert!(!Opcode::JmpIfFalse.is_terminator());
        assert!(!Opcode::Add.is_terminator());
    }

    #[test]
    fn test_operand_sizes() {
        assert_eq!(Opcode::InvokeMethod.operand_size(), 6);
        assert_eq!(Opcode::LoadLocal.operand_size(), 2);
        assert_eq!(Opcode::ConstStr.operand_size(), 4);
        assert_eq!(Opcode::Pop.operand_size(), 0);
    }
}
