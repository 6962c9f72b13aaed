//! Restartable lexer: preprocessed text (or a macro body) plus a starting
//! line number in, a token stream out. Whitespace and `//` comments are
//! skipped; unknown characters are silently skipped.

use super::token::{Token, TokenKind, KEYWORDS};
use crate::error::{CompileError, CompileResult};

pub fn lex(text: &str, start_line: usize) -> CompileResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0usize;
    let mut line = start_line;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token::new(TokenKind::Number, text, line));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let kind = if KEYWORDS.contains(&text.as_str()) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token::new(kind, text, line));
            continue;
        }

        if c == '"' {
            i += 1;
            let mut value = String::new();
            let mut terminated = false;
            while i < chars.len() {
                match chars[i] {
                    '"' => {
                        i += 1;
                        terminated = true;
                        break;
                    }
                    '\\' => {
                        i += 1;
                        value.push(escape_char(chars.get(i).copied()));
                        i += 1;
                    }
                    '\n' => break,
                    other => {
                        value.push(other);
                        i += 1;
                    }
                }
            }
            if !terminated {
                // Best-effort recovery: emit what we have, continue.
            }
            tokens.push(Token::new(TokenKind::String, value, line));
            continue;
        }

        if c == '\'' {
            i += 1;
            let value = match chars.get(i) {
                Some('\\') => {
                    i += 1;
                    let ch = escape_char(chars.get(i).copied());
                    i += 1;
                    ch
                }
                Some(&ch) => {
                    i += 1;
                    ch
                }
                None => return Err(CompileError::new(line, "unterminated char literal")),
            };
            if chars.get(i) != Some(&'\'') {
                return Err(CompileError::new(line, "unterminated char literal"));
            }
            i += 1;
            tokens.push(Token::new(TokenKind::Char, value.to_string(), line));
            continue;
        }

        if let Some(two) = chars.get(i..i + 2).map(|s| s.iter().collect::<String>()) {
            if matches!(two.as_str(), "==" | "!=" | "<=" | ">=") {
                tokens.push(Token::new(TokenKind::Symbol, two, line));
                i += 2;
                continue;
            }
        }

        if "+-*/%=(){};,<>&[]:".contains(c) {
            tokens.push(Token::new(TokenKind::Symbol, c.to_string(), line));
            i += 1;
            continue;
        }

        // Unknown character: silently skipped.
        i += 1;
    }

    tokens.push(Token::new(TokenKind::Eof, "", line));
    Ok(tokens)
}

fn escape_char(c: Option<char>) -> char {
    match c {
        Some('n') => '\n',
        Some('t') => '\t',
        Some('r') => '\r',
        Some('\\') => '\\',
        Some('"') => '"',
        Some('\'') => '\'',
        Some('0') => '\0',
        Some(other) => other,
        None => '\0',
    }
}
