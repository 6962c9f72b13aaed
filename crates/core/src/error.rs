//! Compile-time error and warning types.
//!
//! Runtime faults (divide by zero, out-of-bounds memory access, heap
//! exhaustion) are deliberately *not* modeled here: they degrade the
//! process to `Terminated` with a diagnostic line on stdout and never
//! propagate past `Process::step`. See `vm::Fault`.

use thiserror::Error;

/// A fatal compile-time error. Always carries the 1-based source line the
/// condition was detected on, rendered as `Line <n>: <message>`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Line {line}: {message}")]
pub struct CompileError {
    pub line: usize,
    pub message: String,
}

impl CompileError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// A non-fatal compile-time diagnostic, collected and returned alongside
/// the bytecode rather than aborting compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub line: usize,
    pub message: String,
}

impl Warning {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}
