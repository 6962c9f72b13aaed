//! Single-pass macro expander. Any identifier token whose lexeme names a
//! `#define`d macro is replaced by the tokens produced by lexing the
//! macro's body. The body is lexed once and not re-expanded, so macros
//! cannot reference other macros; this is intentionally simple.

use super::lexer::lex;
use super::token::{Token, TokenKind};
use crate::error::CompileResult;
use std::collections::HashMap;

pub fn expand(tokens: Vec<Token>, macros: &HashMap<String, String>) -> CompileResult<Vec<Token>> {
    let mut out = Vec::with_capacity(tokens.len());
    for tok in tokens {
        if tok.kind == TokenKind::Identifier {
            if let Some(body) = macros.get(&tok.value) {
                let expanded = lex(body, tok.line)?;
                out.extend(expanded.into_iter().filter(|t| t.kind != TokenKind::Eof));
                continue;
            }
        }
        out.push(tok);
    }
    out.push(Token::new(TokenKind::Eof, "", out.last().map(|t| t.line).unwrap_or(1)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::lex;

    #[test]
    fn replaces_defined_identifier() {
        let mut macros = HashMap::new();
        macros.insert("MAX".to_string(), "3".to_string());
        let toks = lex("int i; i < MAX;", 1).unwrap();
        let expanded = expand(toks, &macros).unwrap();
        assert!(expanded.iter().any(|t| t.value == "3"));
        assert!(!expanded.iter().any(|t| t.value == "MAX"));
    }

    #[test]
    fn expansion_is_not_recursive() {
        let mut macros = HashMap::new();
        macros.insert("A".to_string(), "B".to_string());
        macros.insert("B".to_string(), "1".to_string());
        let toks = lex("A;", 1).unwrap();
        let expanded = expand(toks, &macros).unwrap();
        // A expands to the token `B`, not further to `1`.
        assert!(expanded.iter().any(|t| t.value == "B"));
    }

    #[test]
    fn undefined_identifier_passes_through() {
        let macros = HashMap::new();
        let toks = lex("x = 1;", 1).unwrap();
        let expanded = expand(toks, &macros).unwrap();
        assert!(expanded.iter().any(|t| t.value == "x"));
    }
}
