//! Single-pass recursive-descent parser / code generator.
//!
//! There is no AST: every production emits directly into an append-only
//! instruction vector, patching forward jumps by remembering their index.
//! A fresh `Parser` is built per `compile()` call and per function within
//! it; it is never reused or reset across calls.

use super::control_stack::{ControlContext, ControlStack};
use super::symtab::{SymbolTable, VarType};
use super::token::{Token, TokenKind};
use crate::error::{CompileError, CompileResult, Warning};
use crate::instruction::{Instruction, Opcode};
use std::collections::HashMap;

pub struct CompileOutput {
    pub instructions: Vec<Instruction>,
    pub data: Vec<u8>,
    pub warnings: Vec<Warning>,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    instructions: Vec<Instruction>,
    data: Vec<u8>,
    string_cache: HashMap<String, usize>,
    symtab: SymbolTable,
    control: ControlStack,
    warnings: Vec<Warning>,
}

type PResult<T> = CompileResult<T>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            instructions: Vec::new(),
            data: Vec::new(),
            string_cache: HashMap::new(),
            symtab: SymbolTable::new(),
            control: ControlStack::new(),
            warnings: Vec::new(),
        }
    }

    pub fn parse_program(mut self) -> PResult<CompileOutput> {
        while !self.at_eof() {
            self.parse_function()?;
        }
        Ok(CompileOutput { instructions: self.instructions, data: self.data, warnings: self.warnings })
    }

    // ---- token stream helpers ----------------------------------------

    fn at_eof(&self) -> bool {
        self.tokens[self.pos].kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.tokens[self.tokens.len() - 1])
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn line(&self) -> usize {
        self.peek().line
    }

    fn expect_symbol(&mut self, sym: &str) -> PResult<()> {
        if self.peek().is_symbol(sym) {
            self.advance();
            Ok(())
        } else if sym == ";" {
            self.semicolon_hygiene_error()
        } else {
            Err(CompileError::new(self.line(), format!("expected '{}'", sym)))
        }
    }

    fn semicolon_hygiene_error(&self) -> PResult<()> {
        let tok = self.peek();
        if tok.kind == TokenKind::Keyword {
            Err(CompileError::new(tok.line, format!("missing semicolon before {}", tok.value)))
        } else {
            Err(CompileError::new(tok.line, "expected ';'"))
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> PResult<()> {
        if self.peek().is_keyword(kw) {
            self.advance();
            Ok(())
        } else {
            Err(CompileError::new(self.line(), format!("expected '{}'", kw)))
        }
    }

    fn is_type_keyword(tok: &Token) -> bool {
        tok.kind == TokenKind::Keyword
            && matches!(tok.value.as_str(), "int" | "void" | "char" | "float" | "double")
    }

    // ---- emission helpers ----------------------------------------------

    fn emit(&mut self, op: Opcode, arg: f64) -> usize {
        self.instructions.push(Instruction::new(op, arg));
        self.instructions.len() - 1
    }

    fn emit_bare(&mut self, op: Opcode) -> usize {
        self.emit(op, 0.0)
    }

    fn here(&self) -> usize {
        self.instructions.len()
    }

    fn patch(&mut self, idx: usize, target: usize) {
        self.instructions[idx].arg = target as f64;
    }

    fn intern_string(&mut self, s: &str) -> usize {
        if let Some(&addr) = self.string_cache.get(s) {
            return addr;
        }
        let addr = self.data.len();
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.string_cache.insert(s.to_string(), addr);
        addr
    }

    // ---- top level ------------------------------------------------------

    fn parse_function(&mut self) -> PResult<()> {
        // Return type keyword.
        if !Self::is_type_keyword(self.peek()) {
            return Err(CompileError::new(self.line(), "expected function return type"));
        }
        self.advance();

        // Name.
        if self.peek().kind != TokenKind::Identifier {
            return Err(CompileError::new(self.line(), "expected function name"));
        }
        self.advance();

        // Parameter list: deliberately ignored.
        self.expect_symbol("(")?;
        let mut depth = 1;
        while depth > 0 {
            if self.at_eof() {
                return Err(CompileError::new(self.line(), "unterminated parameter list"));
            }
            if self.peek().is_symbol("(") {
                depth += 1;
            } else if self.peek().is_symbol(")") {
                depth -= 1;
            }
            self.advance();
        }

        // Each function gets a fresh local frame, so two functions' locals
        // never collide regardless of how similarly they're named.
        self.symtab = SymbolTable::new();

        self.expect_symbol("{")?;
        self.parse_block_statements()?;
        self.expect_symbol("}")?;

        self.emit_bare(Opcode::Halt);
        Ok(())
    }

    fn parse_block_statements(&mut self) -> PResult<()> {
        while !self.peek().is_symbol("}") && !self.at_eof() {
            self.parse_statement()?;
        }
        Ok(())
    }

    // ---- statements -------------------------------------------------------

    fn parse_statement(&mut self) -> PResult<()> {
        let tok = self.peek().clone();

        if tok.is_symbol("{") {
            self.advance();
            self.parse_block_statements()?;
            self.expect_symbol("}")?;
            return Ok(());
        }

        if Self::is_type_keyword(&tok) {
            return self.parse_declaration();
        }

        match tok.value.as_str() {
            "if" if tok.kind == TokenKind::Keyword => self.parse_if(),
            "while" if tok.kind == TokenKind::Keyword => self.parse_while(),
            "do" if tok.kind == TokenKind::Keyword => self.parse_do_while(),
            "for" if tok.kind == TokenKind::Keyword => self.parse_for(),
            "switch" if tok.kind == TokenKind::Keyword => self.parse_switch(),
            "break" if tok.kind == TokenKind::Keyword => self.parse_break(),
            "continue" if tok.kind == TokenKind::Keyword => self.parse_continue(),
            "return" if tok.kind == TokenKind::Keyword => self.parse_return(),
            "printf" if tok.kind == TokenKind::Keyword => self.parse_print_or_scan(true),
            "scanf" if tok.kind == TokenKind::Keyword => self.parse_print_or_scan(false),
            "free" if tok.kind == TokenKind::Keyword => self.parse_free_stmt(),
            ";" => {
                self.advance();
                Ok(())
            }
            _ => {
                self.parse_expression()?;
                self.expect_symbol(";")?;
                self.emit_bare(Opcode::Pop);
                Ok(())
            }
        }
    }

    fn parse_declaration(&mut self) -> PResult<()> {
        let ty_tok = self.advance();
        let ty = match ty_tok.value.as_str() {
            "int" => VarType::Int,
            "char" => VarType::Char,
            "float" => VarType::Float,
            "double" => VarType::Double,
            "void" => VarType::Void,
            _ => VarType::Int,
        };

        loop {
            let mut is_pointer = false;
            while self.peek().is_symbol("*") {
                self.advance();
                is_pointer = true;
            }

            let name_tok = self.advance();
            if name_tok.kind != TokenKind::Identifier {
                return Err(CompileError::new(name_tok.line, "expected identifier in declaration"));
            }

            if self.peek().is_symbol("[") {
                self.advance();
                let size_tok = self.advance();
                let size: usize = size_tok.value.parse().unwrap_or(0);
                self.expect_symbol("]")?;
                self.symtab.declare(&name_tok.value, ty, is_pointer, Some(size));
                if self.peek().is_symbol("=") {
                    return Err(CompileError::new(self.line(), "array initializers are not supported"));
                }
            } else {
                let offset = self.symtab.declare(&name_tok.value, ty, is_pointer, None);
                if self.peek().is_symbol("=") {
                    self.advance();
                    self.parse_assignment_rhs()?;
                    self.store_to_offset(offset, ty, is_pointer);
                }
            }

            if self.peek().is_symbol(",") {
                self.advance();
                continue;
            }
            break;
        }

        self.expect_symbol(";")
    }

    fn store_to_offset(&mut self, offset: i64, ty: VarType, is_pointer: bool) {
        let op = if !is_pointer && ty == VarType::Double { Opcode::Store64 } else { Opcode::Store };
        self.emit(op, offset as f64);
    }

    fn load_from_offset(&mut self, offset: i64, ty: VarType, is_pointer: bool) {
        let op = if !is_pointer && ty == VarType::Double { Opcode::Load64 } else { Opcode::Load };
        self.emit(op, offset as f64);
    }

    fn parse_if(&mut self) -> PResult<()> {
        self.advance(); // if
        self.expect_symbol("(")?;
        self.parse_expression()?;
        self.expect_symbol(")")?;
        let jz = self.emit(Opcode::Jz, 0.0);
        self.parse_braced_or_single()?;

        if self.peek().is_keyword("else") {
            self.advance();
            let jmp_end = self.emit(Opcode::Jmp, 0.0);
            self.patch(jz, self.here());
            self.parse_braced_or_single()?;
            self.patch(jmp_end, self.here());
        } else {
            self.patch(jz, self.here());
        }
        Ok(())
    }

    fn parse_braced_or_single(&mut self) -> PResult<()> {
        if self.peek().is_symbol("{") {
            self.advance();
            self.parse_block_statements()?;
            self.expect_symbol("}")
        } else {
            self.parse_statement()
        }
    }

    fn parse_while(&mut self) -> PResult<()> {
        self.advance(); // while
        let cond = self.here();
        self.expect_symbol("(")?;
        self.parse_expression()?;
        self.expect_symbol(")")?;
        let jz_end = self.emit(Opcode::Jz, 0.0);

        self.control.push(ControlContext::Loop {
            break_patches: Vec::new(),
            continue_target: Some(cond),
            pending_continues: Vec::new(),
        });

        self.parse_braced_or_single()?;
        self.emit(Opcode::Jmp, cond as f64);
        let end = self.here();
        self.patch(jz_end, end);
        self.finish_loop(end);
        Ok(())
    }

    fn parse_do_while(&mut self) -> PResult<()> {
        self.advance(); // do
        let body = self.here();
        self.control.push(ControlContext::new_loop());
        self.parse_braced_or_single()?;
        self.expect_keyword("while")?;
        let cond = self.here();
        self.patch_pending_continues(cond);
        self.expect_symbol("(")?;
        self.parse_expression()?;
        self.expect_symbol(")")?;
        self.expect_symbol(";")?;
        let jz_end = self.emit(Opcode::Jz, 0.0);
        self.emit(Opcode::Jmp, body as f64);
        let end = self.here();
        self.patch(jz_end, end);
        self.finish_loop(end);
        Ok(())
    }

    fn parse_for(&mut self) -> PResult<()> {
        self.advance(); // for
        self.expect_symbol("(")?;

        // init: declaration or expression (result popped), or empty.
        if self.peek().is_symbol(";") {
            self.advance();
        } else if Self::is_type_keyword(self.peek()) {
            self.parse_declaration()?;
        } else {
            self.parse_expression()?;
            self.expect_symbol(";")?;
            self.emit_bare(Opcode::Pop);
        }

        let cond = self.here();
        if self.peek().is_symbol(";") {
            self.emit(Opcode::Lit, 1.0);
        } else {
            self.parse_expression()?;
        }
        self.expect_symbol(";")?;
        let jz_end = self.emit(Opcode::Jz, 0.0);
        let jmp_body = self.emit(Opcode::Jmp, 0.0);

        let inc = self.here();
        if !self.peek().is_symbol(")") {
            self.parse_expression()?;
            self.emit_bare(Opcode::Pop);
        }
        self.expect_symbol(")")?;
        self.emit(Opcode::Jmp, cond as f64);

        let body = self.here();
        self.patch(jmp_body, body);

        self.control.push(ControlContext::Loop {
            break_patches: Vec::new(),
            continue_target: Some(inc),
            pending_continues: Vec::new(),
        });

        self.parse_braced_or_single()?;
        self.emit(Opcode::Jmp, inc as f64);
        let end = self.here();
        self.patch(jz_end, end);
        self.finish_loop(end);
        Ok(())
    }

    fn patch_pending_continues(&mut self, target: usize) {
        if let Some(ControlContext::Loop { continue_target, pending_continues, .. }) =
            self.control.innermost_loop()
        {
            *continue_target = Some(target);
            let pending = std::mem::take(pending_continues);
            for idx in pending {
                self.instructions[idx].arg = target as f64;
            }
        }
    }

    fn finish_loop(&mut self, end: usize) {
        if let Some(ctx) = self.control.pop() {
            for idx in ctx.break_patches() {
                self.instructions[*idx].arg = end as f64;
            }
        }
    }

    fn parse_switch(&mut self) -> PResult<()> {
        self.advance(); // switch
        self.expect_symbol("(")?;
        self.parse_expression()?;
        self.expect_symbol(")")?;

        let jmp_dispatch = self.emit(Opcode::Jmp, 0.0);
        self.expect_symbol("{")?;

        self.control.push(ControlContext::new_switch());

        let mut cases: Vec<(f64, usize)> = Vec::new();
        let mut default_target: Option<usize> = None;

        while !self.peek().is_symbol("}") && !self.at_eof() {
            if self.peek().is_keyword("case") {
                self.advance();
                let value = self.parse_case_constant()?;
                self.expect_symbol(":")?;
                cases.push((value, self.here()));
            } else if self.peek().is_keyword("default") {
                self.advance();
                self.expect_symbol(":")?;
                default_target = Some(self.here());
            } else {
                self.parse_statement()?;
            }
        }
        self.expect_symbol("}")?;

        let jmp_exit = self.emit(Opcode::Jmp, 0.0);
        let dispatch = self.here();
        self.patch(jmp_dispatch, dispatch);

        for (value, target) in &cases {
            self.emit_bare(Opcode::Dup);
            self.emit(Opcode::Lit, *value);
            self.emit_bare(Opcode::Eq);
            let jz = self.emit(Opcode::Jz, 0.0);
            self.emit_bare(Opcode::Pop);
            self.emit(Opcode::Jmp, *target as f64);
            self.patch(jz, self.here());
        }

        self.emit_bare(Opcode::Pop);
        if let Some(target) = default_target {
            self.emit(Opcode::Jmp, target as f64);
        }

        let exit = self.here();
        self.patch(jmp_exit, exit);
        self.finish_loop(exit);
        Ok(())
    }

    fn parse_case_constant(&mut self) -> PResult<f64> {
        let negative = if self.peek().is_symbol("-") {
            self.advance();
            true
        } else {
            false
        };
        let tok = self.advance();
        let value = match tok.kind {
            TokenKind::Number => tok.value.parse::<f64>().unwrap_or(0.0),
            TokenKind::Char => tok.value.chars().next().map(|c| c as u32 as f64).unwrap_or(0.0),
            _ => return Err(CompileError::new(tok.line, "expected case constant")),
        };
        Ok(if negative { -value } else { value })
    }

    fn parse_break(&mut self) -> PResult<()> {
        let line = self.line();
        self.advance();
        self.expect_symbol(";")?;
        let idx = self.emit(Opcode::Jmp, 0.0);
        match self.control.innermost_breakable() {
            Some(ctx) => ctx.push_break(idx),
            None => return Err(CompileError::new(line, "'break' outside loop or switch")),
        }
        Ok(())
    }

    fn parse_continue(&mut self) -> PResult<()> {
        let line = self.line();
        self.advance();
        self.expect_symbol(";")?;
        match self.control.innermost_loop() {
            Some(ControlContext::Loop { continue_target: Some(target), .. }) => {
                let target = *target;
                self.emit(Opcode::Jmp, target as f64);
            }
            Some(ControlContext::Loop { pending_continues, .. }) => {
                let idx = self.instructions.len();
                self.instructions.push(Instruction::new(Opcode::Jmp, 0.0));
                pending_continues.push(idx);
            }
            _ => return Err(CompileError::new(line, "'continue' outside loop")),
        }
        Ok(())
    }

    fn parse_return(&mut self) -> PResult<()> {
        self.advance(); // return
        if !self.peek().is_symbol(";") {
            self.parse_expression()?;
        }
        self.expect_symbol(";")?;
        self.emit_bare(Opcode::Halt);
        Ok(())
    }

    fn parse_free_stmt(&mut self) -> PResult<()> {
        self.advance(); // free
        self.expect_symbol("(")?;
        self.parse_expression()?;
        self.expect_symbol(")")?;
        self.expect_symbol(";")?;
        self.emit_bare(Opcode::Free);
        Ok(())
    }

    /// Counts `%[flags][.precision]<type>` conversion specifiers in a
    /// format string.
    fn count_conversions(fmt: &str) -> usize {
        let chars: Vec<char> = fmt.chars().collect();
        let mut i = 0;
        let mut count = 0;
        while i < chars.len() {
            if chars[i] == '%' {
                let mut j = i + 1;
                while j < chars.len() && "-+ #0123456789.".contains(chars[j]) {
                    j += 1;
                }
                if j < chars.len() && chars[j] == 'l' {
                    j += 1;
                }
                if j < chars.len() && "dfcsxX".contains(chars[j]) {
                    count += 1;
                    i = j + 1;
                    continue;
                }
            }
            i += 1;
        }
        count
    }

    fn parse_print_or_scan(&mut self, is_print: bool) -> PResult<()> {
        let kw_line = self.line();
        self.advance(); // printf | scanf
        self.expect_symbol("(")?;
        let fmt_tok = self.advance();
        if fmt_tok.kind != TokenKind::String {
            return Err(CompileError::new(kw_line, "expected format string literal"));
        }
        let n = Self::count_conversions(&fmt_tok.value);

        let mut arg_count = 0;
        while self.peek().is_symbol(",") {
            self.advance();
            if is_print {
                self.parse_expression()?;
            } else {
                // scanf args are `&expr` (or a raw array/pointer expression).
                self.parse_expression()?;
            }
            arg_count += 1;
        }
        self.expect_symbol(")")?;
        self.expect_symbol(";")?;

        if arg_count != n {
            self.warnings.push(Warning::new(
                kw_line,
                format!("format string expects {} argument(s) but {} were given", n, arg_count),
            ));
        }

        let addr = self.intern_string(&fmt_tok.value);
        self.emit(Opcode::Lit, addr as f64);
        self.emit(if is_print { Opcode::Print } else { Opcode::Scanf }, n as f64);
        Ok(())
    }

    // ---- expressions --------------------------------------------------

    fn parse_expression(&mut self) -> PResult<()> {
        self.parse_assignment()
    }

    fn is_simple_assign_target(&self) -> bool {
        self.peek().kind == TokenKind::Identifier && self.peek_at(1).is_symbol("=")
    }

    fn parse_assignment(&mut self) -> PResult<()> {
        if self.is_simple_assign_target() {
            let name_tok = self.advance();
            self.advance(); // '='
            self.parse_assignment()?;
            let sym = *self
                .symtab
                .lookup(&name_tok.value)
                .ok_or_else(|| CompileError::new(name_tok.line, format!("undefined identifier '{}'", name_tok.value)))?;
            self.store_to_offset(sym.offset, sym.ty, sym.is_pointer);
            self.load_from_offset(sym.offset, sym.ty, sym.is_pointer);
            return Ok(());
        }
        self.parse_equality()
    }

    /// Helper used by declaration initializers — identical to an
    /// assignment RHS, just without an existing lvalue to store into.
    fn parse_assignment_rhs(&mut self) -> PResult<()> {
        self.parse_assignment()
    }

    fn parse_equality(&mut self) -> PResult<()> {
        self.parse_relational()?;
        loop {
            if self.peek().is_symbol("==") {
                self.advance();
                self.parse_relational()?;
                self.emit_bare(Opcode::Eq);
            } else if self.peek().is_symbol("!=") {
                self.advance();
                self.parse_relational()?;
                self.emit_bare(Opcode::Neq);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn parse_relational(&mut self) -> PResult<()> {
        self.parse_additive()?;
        loop {
            let op = if self.peek().is_symbol("<") {
                Some(Opcode::Lt)
            } else if self.peek().is_symbol(">") {
                Some(Opcode::Gt)
            } else if self.peek().is_symbol("<=") {
                Some(Opcode::Le)
            } else if self.peek().is_symbol(">=") {
                Some(Opcode::Ge)
            } else {
                None
            };
            match op {
                Some(op) => {
                    self.advance();
                    self.parse_additive()?;
                    self.emit_bare(op);
                }
                None => break,
            }
        }
        Ok(())
    }

    fn parse_additive(&mut self) -> PResult<()> {
        self.parse_multiplicative()?;
        loop {
            if self.peek().is_symbol("+") {
                self.advance();
                self.parse_multiplicative()?;
                self.emit_bare(Opcode::Add);
            } else if self.peek().is_symbol("-") {
                self.advance();
                self.parse_multiplicative()?;
                self.emit_bare(Opcode::Sub);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn parse_multiplicative(&mut self) -> PResult<()> {
        self.parse_unary()?;
        loop {
            if self.peek().is_symbol("*") {
                self.advance();
                self.parse_unary()?;
                self.emit_bare(Opcode::Mul);
            } else if self.peek().is_symbol("/") {
                self.advance();
                self.parse_unary()?;
                self.emit_bare(Opcode::Div);
            } else if self.peek().is_symbol("%") {
                self.advance();
                self.parse_unary()?;
                self.emit_bare(Opcode::Mod);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn parse_unary(&mut self) -> PResult<()> {
        if self.peek().is_symbol("!") {
            self.advance();
            self.parse_unary()?;
            self.emit(Opcode::Lit, 0.0);
            self.emit_bare(Opcode::Eq);
            return Ok(());
        }
        if self.peek().is_symbol("-") {
            self.advance();
            self.parse_unary()?;
            self.emit(Opcode::Lit, -1.0);
            self.emit_bare(Opcode::Mul);
            return Ok(());
        }
        if self.peek().is_symbol("+") {
            self.advance();
            return self.parse_unary();
        }
        if self.peek().is_symbol("*") {
            // Pointer dereference: `*e` (read) or `*e = expr` (write).
            self.advance();
            return self.parse_deref();
        }
        if self.peek().is_symbol("&") {
            self.advance();
            let tok = self.advance();
            if tok.kind != TokenKind::Identifier {
                return Err(CompileError::new(tok.line, "expected identifier after '&'"));
            }
            let sym = *self
                .symtab
                .lookup(&tok.value)
                .ok_or_else(|| CompileError::new(tok.line, format!("undefined identifier '{}'", tok.value)))?;
            self.emit(Opcode::PPush, sym.offset as f64);
            return Ok(());
        }
        self.parse_primary()
    }

    fn parse_deref(&mut self) -> PResult<()> {
        // Evaluate the pointer-valued sub-expression (unary precedence, so
        // `**p` and `*p + 1` both parse sensibly) — leaves the address.
        self.parse_unary()?;
        if self.peek().is_symbol("=") {
            self.advance();
            // addr is already on the stack; push the value on top. S_IND
            // pops value then addr, writes, and pushes the value back as
            // the expression's result.
            self.parse_assignment()?;
            self.emit_bare(Opcode::SInd);
            Ok(())
        } else {
            self.emit_bare(Opcode::LInd);
            Ok(())
        }
    }

    fn parse_primary(&mut self) -> PResult<()> {
        let tok = self.peek().clone();

        if tok.is_symbol("(") {
            self.advance();
            self.parse_expression()?;
            self.expect_symbol(")")?;
            return Ok(());
        }

        if tok.kind == TokenKind::Number {
            self.advance();
            let v: f64 = tok.value.parse().unwrap_or(0.0);
            self.emit(Opcode::Lit, v);
            return Ok(());
        }

        if tok.kind == TokenKind::Char {
            self.advance();
            let v = tok.value.chars().next().map(|c| c as u32 as f64).unwrap_or(0.0);
            self.emit(Opcode::Lit, v);
            return Ok(());
        }

        if tok.kind == TokenKind::String {
            self.advance();
            let addr = self.intern_string(&tok.value);
            self.emit(Opcode::Lit, addr as f64);
            return Ok(());
        }

        if tok.kind == TokenKind::Keyword && is_math_intrinsic(&tok.value) {
            return self.parse_math_call(&tok.value);
        }

        if tok.kind == TokenKind::Keyword && tok.value == "malloc" {
            self.advance();
            self.expect_symbol("(")?;
            self.parse_expression()?;
            self.expect_symbol(")")?;
            self.emit_bare(Opcode::Malloc);
            return Ok(());
        }

        if tok.kind == TokenKind::Identifier {
            self.advance();
            let sym = *self
                .symtab
                .lookup(&tok.value)
                .ok_or_else(|| CompileError::new(tok.line, format!("undefined identifier '{}'", tok.value)))?;

            if self.peek().is_symbol("[") {
                self.advance();
                self.emit(Opcode::PPush, sym.offset as f64);
                self.parse_expression()?;
                self.expect_symbol("]")?;
                self.emit(Opcode::Lit, sym.element_size as f64);
                self.emit_bare(Opcode::Mul);
                self.emit_bare(Opcode::Add);

                if self.peek().is_symbol("=") {
                    self.advance();
                    // addr is already on the stack; value goes on top,
                    // S_IND pops both and pushes the value back.
                    self.parse_assignment()?;
                    let op = if sym.element_size == 8 { Opcode::SInd64 } else { Opcode::SInd };
                    self.emit_bare(op);
                } else {
                    let op = if sym.element_size == 8 { Opcode::LInd64 } else { Opcode::LInd };
                    self.emit_bare(op);
                }
                return Ok(());
            }

            if sym.is_array {
                // Bare array name decays to the address of its first
                // element, matching C's array-to-pointer decay. Needed for
                // scanf("%s", buf) / printf("%s", buf) where the buffer is
                // passed without an explicit &.
                self.emit(Opcode::PPush, sym.offset as f64);
                return Ok(());
            }

            self.load_from_offset(sym.offset, sym.ty, sym.is_pointer);
            return Ok(());
        }

        Err(CompileError::new(tok.line, format!("unexpected token '{}'", tok.value)))
    }

    fn parse_math_call(&mut self, name: &str) -> PResult<()> {
        self.advance();
        self.expect_symbol("(")?;
        self.parse_expression()?;
        if name == "pow" {
            self.expect_symbol(",")?;
            self.parse_expression()?;
        }
        self.expect_symbol(")")?;
        let op = match name {
            "sin" => Opcode::Sin,
            "cos" => Opcode::Cos,
            "tan" => Opcode::Tan,
            "sqrt" => Opcode::Sqrt,
            "pow" => Opcode::Pow,
            "abs" => Opcode::Abs,
            _ => unreachable!(),
        };
        self.emit_bare(op);
        Ok(())
    }
}

fn is_math_intrinsic(name: &str) -> bool {
    matches!(name, "sin" | "cos" | "tan" | "sqrt" | "pow" | "abs")
}
