//! printf/scanf format-string interpretation at runtime. This mirrors, but
//! is independent from, the compile-time conversion counter in
//! `compiler::parser`: one decides argument counts ahead of time, the
//! other does the actual formatting/parsing with values in hand.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Int,
    Float,
    /// `%lf` / `%lx` etc — targets an 8-byte (double) slot.
    Double,
    Char,
    Str,
    HexLower,
    HexUpper,
}

pub fn specifiers(fmt: &str) -> Vec<Conversion> {
    let chars: Vec<char> = fmt.chars().collect();
    let mut i = 0;
    let mut out = Vec::new();
    while i < chars.len() {
        if chars[i] == '%' {
            let mut j = i + 1;
            while j < chars.len() && "-+ #0123456789.".contains(chars[j]) {
                j += 1;
            }
            let is_long = j < chars.len() && chars[j] == 'l';
            if is_long {
                j += 1;
            }
            if j < chars.len() {
                let conv = match chars[j] {
                    'd' => Some(if is_long { Conversion::Double } else { Conversion::Int }),
                    'f' => Some(if is_long { Conversion::Double } else { Conversion::Float }),
                    'c' => Some(Conversion::Char),
                    's' => Some(Conversion::Str),
                    'x' => Some(Conversion::HexLower),
                    'X' => Some(Conversion::HexUpper),
                    _ => None,
                };
                if let Some(conv) = conv {
                    out.push(conv);
                    i = j + 1;
                    continue;
                }
            }
        }
        i += 1;
    }
    out
}

/// Renders `fmt` against `args`, substituting conversions left to right and
/// copying everything else (including the real newline/tab characters the
/// lexer already unescaped) verbatim.
pub fn render(fmt: &str, args: &[f64], read_cstr: impl Fn(usize) -> String) -> String {
    let chars: Vec<char> = fmt.chars().collect();
    let mut i = 0;
    let mut out = String::new();
    let mut arg_idx = 0;

    while i < chars.len() {
        if chars[i] == '%' {
            let start = i;
            let flags_start = i + 1;
            let mut j = flags_start;
            while j < chars.len() && "-+ #0123456789.".contains(chars[j]) {
                j += 1;
            }
            let flags: String = chars[flags_start..j].iter().collect();
            let precision = flags.split('.').nth(1).and_then(|p| p.parse::<usize>().ok());
            let is_long = j < chars.len() && chars[j] == 'l';
            if is_long {
                j += 1;
            }
            if j < chars.len() {
                let value = args.get(arg_idx).copied().unwrap_or(0.0);
                match chars[j] {
                    'd' => {
                        out.push_str(&(value.floor() as i64).to_string());
                        arg_idx += 1;
                        i = j + 1;
                        continue;
                    }
                    'f' => {
                        out.push_str(&format!("{:.*}", precision.unwrap_or(6), value));
                        arg_idx += 1;
                        i = j + 1;
                        continue;
                    }
                    'c' => {
                        out.push(char::from_u32(value as u32).unwrap_or('\0'));
                        arg_idx += 1;
                        i = j + 1;
                        continue;
                    }
                    's' => {
                        out.push_str(&read_cstr(value as usize));
                        arg_idx += 1;
                        i = j + 1;
                        continue;
                    }
                    'x' => {
                        out.push_str(&format!("{:x}", value.floor() as i64));
                        arg_idx += 1;
                        i = j + 1;
                        continue;
                    }
                    'X' => {
                        out.push_str(&format!("{:X}", value.floor() as i64));
                        arg_idx += 1;
                        i = j + 1;
                        continue;
                    }
                    '%' => {
                        out.push('%');
                        i = j + 1;
                        continue;
                    }
                    _ => {}
                }
            }
            out.extend(&chars[start..=start]);
            i = start + 1;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// One whitespace-separated token of scanned input, interpreted per its
/// conversion: numeric conversions resolve to a value destined for a
/// `STORE`/`STORE64`, `%s` keeps the raw text for a byte-wise copy into
/// memory. Missing trailing tokens resolve to `Num(0.0)` / `Str("")`
/// rather than faulting the process: since process memory starts zeroed
/// and NUL-terminated, this is indistinguishable from input that simply
/// left the target untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanValue {
    Num(f64),
    Str(String),
}

pub fn parse_input(line: &str, conversions: &[Conversion]) -> Vec<ScanValue> {
    let mut tokens = line.split_whitespace();
    conversions
        .iter()
        .map(|conv| {
            let tok = tokens.next().unwrap_or("");
            match conv {
                Conversion::Str => ScanValue::Str(tok.to_string()),
                Conversion::Int | Conversion::Double | Conversion::Float => {
                    ScanValue::Num(tok.parse::<f64>().unwrap_or(0.0))
                }
                Conversion::Char => {
                    ScanValue::Num(tok.chars().next().map(|c| c as u32 as f64).unwrap_or(0.0))
                }
                Conversion::HexLower | Conversion::HexUpper => ScanValue::Num(
                    i64::from_str_radix(tok.trim_start_matches("0x"), 16).unwrap_or(0) as f64,
                ),
            }
        })
        .collect()
}
