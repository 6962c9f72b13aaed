//! Compile-time symbol table: flat per-function scope mapping an
//! identifier to its frame offset and type info.
//!
//! The table itself has no notion of functions or scoping beyond what its
//! owner gives it; the parser builds a fresh one per function so that two
//! functions' local names never collide.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Int,
    Char,
    Float,
    Double,
    Void,
}

impl VarType {
    pub fn element_size(self) -> usize {
        match self {
            VarType::Double => 8,
            _ => 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Symbol {
    pub offset: i64,
    pub ty: VarType,
    pub is_array: bool,
    pub array_size: usize,
    pub element_size: usize,
    pub is_pointer: bool,
}

pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    local_bump: i64,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { symbols: HashMap::new(), local_bump: 0 }
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Declares a variable, bumping the local frame cursor, and returns the
    /// symbol's frame offset.
    pub fn declare(&mut self, name: &str, ty: VarType, is_pointer: bool, array_size: Option<usize>) -> i64 {
        let element_size = if is_pointer { 4 } else { ty.element_size() };
        let count = array_size.unwrap_or(1);
        let offset = self.local_bump;
        self.local_bump += (element_size * count) as i64;
        self.symbols.insert(
            name.to_string(),
            Symbol {
                offset,
                ty,
                is_array: array_size.is_some(),
                array_size: array_size.unwrap_or(0),
                element_size,
                is_pointer,
            },
        );
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_bumps_by_element_size() {
        let mut t = SymbolTable::new();
        let a = t.declare("a", VarType::Int, false, None);
        let b = t.declare("b", VarType::Double, false, None);
        assert_eq!(a, 0);
        assert_eq!(b, 4);
    }

    #[test]
    fn array_declare_reserves_full_span() {
        let mut t = SymbolTable::new();
        t.declare("arr", VarType::Int, false, Some(10));
        let next = t.declare("y", VarType::Int, false, None);
        assert_eq!(next, 40);
    }
}
