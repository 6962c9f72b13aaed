//! Compiler pipeline: preprocess → lex → macro-expand → parse/codegen.
//! `compile` is the single entry point used by the rest of the crate and
//! by the host daemon.

pub mod control_stack;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod preprocessor;
pub mod symtab;
pub mod token;

use crate::error::CompileResult;
use parser::{CompileOutput, Parser};

/// Compiles a source string into bytecode plus its data segment. A fresh
/// [`Parser`] (and therefore a fresh symbol table, fresh control stack)
/// is built for this call; none of it is reused across calls.
pub fn compile(source: &str) -> CompileResult<CompileOutput> {
    let preprocessed = preprocessor::preprocess(source)?;
    let tokens = lexer::lex(&preprocessed.text, 1)?;
    let tokens = macros::expand(tokens, &preprocessed.macros)?;
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;

    #[test]
    fn compiles_empty_main() {
        let out = compile("int main() { return 0; }").unwrap();
        assert!(out.instructions.iter().any(|i| i.op == Opcode::Halt));
    }

    #[test]
    fn compiles_hello_world_printf() {
        let out = compile(r#"int main() { printf("Hello, Optimus-OS!\n"); return 0; }"#).unwrap();
        assert!(out.instructions.iter().any(|i| i.op == Opcode::Print));
        assert!(!out.data.is_empty());
    }

    #[test]
    fn reports_undefined_identifier_with_line() {
        let err = compile("int main() {\n  x = 1;\n}").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn macro_expansion_feeds_the_parser() {
        let out = compile("#define LIMIT 10\nint main() { int i; i = LIMIT; return 0; }").unwrap();
        assert!(out.instructions.iter().any(|i| i.op == Opcode::Lit && i.arg == 10.0));
    }

    #[test]
    fn for_loop_emits_conditional_and_back_jump() {
        let out = compile(
            "int main() { int i; for (i = 0; i < 10; i = i + 1) { printf(\"%d\\n\", i); } return 0; }",
        )
        .unwrap();
        assert!(out.instructions.iter().any(|i| i.op == Opcode::Jz));
        assert!(out.instructions.iter().any(|i| i.op == Opcode::Jmp));
    }

    #[test]
    fn switch_emits_dispatch_sequence() {
        let out = compile(
            "int main() { int x; x = 1; switch (x) { case 1: printf(\"one\\n\"); break; default: printf(\"other\\n\"); } return 0; }",
        )
        .unwrap();
        assert!(out.instructions.iter().any(|i| i.op == Opcode::Dup));
    }

    #[test]
    fn missing_semicolon_reports_hygiene_message() {
        let err = compile("int main() { int x\n  return 0; }").unwrap_err();
        assert!(err.message.contains("semicolon") || err.message.contains("';'"));
    }
}
