//! The closed opcode set shared by the compiler and the process VM.
//!
//! An [`Instruction`] is a tagged opcode plus an optional numeric argument
//! (an address, a jump target, a literal, or an I/O argument count). The
//! set is closed at compile time, so the VM's dispatch is an exhaustive
//! match with no unknown-opcode case to handle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    // Control
    Halt,
    Jmp,
    Jz,
    // Stack
    Lit,
    Pop,
    Dup,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    // Locals, 32-bit
    Load,
    Store,
    // Locals, 64-bit
    Load64,
    Store64,
    // Addressing
    PPush,
    // Indirect, 32-bit
    LInd,
    SInd,
    // Indirect, 64-bit
    LInd64,
    SInd64,
    // Heap
    Malloc,
    Free,
    // Math
    Sin,
    Cos,
    Tan,
    Sqrt,
    Pow,
    Abs,
    // I/O
    Print,
    Scanf,
}

/// `(opcode, arg)` where `arg` holds an address, offset, literal, or
/// argument count depending on the opcode. Stored as `f64` since the
/// evaluation stack is uniformly numeric (see `vm::Value`) and literals
/// may be floats, addresses, or counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Opcode,
    pub arg: f64,
}

impl Instruction {
    pub fn new(op: Opcode, arg: f64) -> Self {
        Self { op, arg }
    }

    /// Convenience for opcodes that carry no argument.
    pub fn bare(op: Opcode) -> Self {
        Self { op, arg: 0.0 }
    }

    pub fn arg_usize(&self) -> usize {
        self.arg as usize
    }
}
