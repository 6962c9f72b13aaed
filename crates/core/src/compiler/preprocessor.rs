//! Line-oriented preprocessor: `#define`, `#ifdef`/`#ifndef`/`#endif`.
//!
//! Output has the same line count as the input so downstream line numbers
//! (lexer, parser, error reporting) stay correct — directive lines and
//! lines inside a suppressed block are replaced with blank lines rather
//! than removed.

use crate::error::{CompileError, CompileResult};
use std::collections::HashMap;

/// Result of preprocessing: blanked source text plus the macro table built
/// up along the way (single-token replacements only — no function-like
/// macros, no `#include`, no multi-line defines).
pub struct Preprocessed {
    pub text: String,
    pub macros: HashMap<String, String>,
}

pub fn preprocess(source: &str) -> CompileResult<Preprocessed> {
    let mut macros = HashMap::new();
    // Emission stack: "all-true" semantics — a line is emitted only if
    // every enclosing conditional frame is currently true.
    let mut emit_stack: Vec<bool> = Vec::new();
    let mut out_lines: Vec<String> = Vec::with_capacity(source.lines().count());

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim_start();
        let emitting = emit_stack.iter().all(|&b| b);

        if let Some(rest) = trimmed.strip_prefix('#') {
            let rest = rest.trim_start();
            if let Some(def) = rest.strip_prefix("define") {
                if emitting {
                    let def = def.trim();
                    let mut parts = def.splitn(2, char::is_whitespace);
                    let name = parts.next().unwrap_or("").trim();
                    let value = parts.next().map(str::trim).unwrap_or("1");
                    if !name.is_empty() {
                        macros.insert(
                            name.to_string(),
                            if value.is_empty() { "1".to_string() } else { value.to_string() },
                        );
                    }
                }
            } else if let Some(name) = rest.strip_prefix("ifdef") {
                let name = name.trim();
                let cond = emitting && macros.contains_key(name);
                emit_stack.push(cond);
            } else if let Some(name) = rest.strip_prefix("ifndef") {
                let name = name.trim();
                let cond = emitting && !macros.contains_key(name);
                emit_stack.push(cond);
            } else if rest.starts_with("endif") {
                if emit_stack.pop().is_none() {
                    return Err(CompileError::new(line_no, "unmatched #endif"));
                }
            } else if rest.starts_with("include") {
                // Intentionally unsupported: treated as an inert directive.
            }
            out_lines.push(String::new());
            continue;
        }

        out_lines.push(if emitting { raw_line.to_string() } else { String::new() });
    }

    if !emit_stack.is_empty() {
        return Err(CompileError::new(
            source.lines().count().max(1),
            "unterminated conditional block",
        ));
    }

    Ok(Preprocessed {
        text: out_lines.join("\n"),
        macros,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_records_value() {
        let p = preprocess("#define MAX 3\nint main(){}").unwrap();
        assert_eq!(p.macros.get("MAX"), Some(&"3".to_string()));
        assert_eq!(p.text.lines().count(), 2);
    }

    #[test]
    fn define_without_value_defaults_to_one() {
        let p = preprocess("#define DEBUG\n").unwrap();
        assert_eq!(p.macros.get("DEBUG"), Some(&"1".to_string()));
    }

    #[test]
    fn ifdef_blanks_suppressed_lines_but_preserves_count() {
        let src = "#ifdef NOPE\nint x;\n#endif\nint y;";
        let p = preprocess(src).unwrap();
        let lines: Vec<&str> = p.text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].trim(), "");
        assert_eq!(lines[3].trim(), "int y;");
    }

    #[test]
    fn nested_ifdef_tracks_independently() {
        let src = "#define A\n#ifdef A\n#ifdef B\nint x;\n#endif\nint y;\n#endif";
        let p = preprocess(src).unwrap();
        let lines: Vec<&str> = p.text.lines().collect();
        assert_eq!(lines[3].trim(), "");
        assert_eq!(lines[5].trim(), "int y;");
    }

    #[test]
    fn unterminated_conditional_is_fatal() {
        let err = preprocess("#ifdef A\nint x;").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn unmatched_endif_is_fatal() {
        let err = preprocess("#endif\n").unwrap_err();
        assert!(err.message.contains("unmatched"));
    }

    #[test]
    fn include_is_blanked_not_processed() {
        let p = preprocess("#include <stdio.h>\nint main(){}").unwrap();
        assert_eq!(p.text.lines().next().unwrap().trim(), "");
    }
}
