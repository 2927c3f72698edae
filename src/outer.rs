//! The outer interpreter/compiler: tokenize → search → number-convert →
//! execute-or-compile (spec.md §4.4).
//!
//! Control-structure words (`if`, `begin`, `case`, …) are themselves
//! immediate builtins living in [`crate::builtins::control`]; this module
//! owns the shared machinery they and `eval` both need: the tokenizer,
//! number conversion, and the branch-patching helpers.

use std::io::Write;

use crate::cells::CellAddr;
use crate::dictionary;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::inner;
use crate::opcode;

/// Pull the next blank-delimited token out of the TIB, starting at `>in`.
/// Returns `None` at end of line. Updates `>in` past the token (and any
/// leading whitespace already skipped).
pub fn next_token(engine: &mut Engine) -> Result<Option<Vec<u8>>, ForthError> {
    let tib = engine.tib_bytes()?;
    let len = tib.len();
    let mut pos = engine.to_in()? as usize;

    while pos < len && tib[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if pos >= len {
        engine.set_to_in(pos as i64)?;
        return Ok(None);
    }
    let start = pos;
    while pos < len && !tib[pos].is_ascii_whitespace() {
        pos += 1;
    }
    engine.set_to_in(pos as i64)?;
    Ok(Some(tib[start..pos].to_vec()))
}

/// Parse characters up to (and consuming) `delim`, or end of line if the
/// delimiter never appears. Used by string-literal words (`." `, `abort"`)
/// and by `parse-to`.
pub fn parse_to(engine: &mut Engine, delim: u8) -> Result<Vec<u8>, ForthError> {
    let tib = engine.tib_bytes()?;
    let len = tib.len();
    let mut pos = engine.to_in()? as usize;
    // Conventionally a single leading space after the word name is
    // dropped, matching `s" `/`." ` usage.
    if pos < len && tib[pos] == b' ' {
        pos += 1;
    }
    let start = pos;
    while pos < len && tib[pos] != delim {
        pos += 1;
    }
    let text = tib[start..pos].to_vec();
    if pos < len {
        pos += 1; // consume the delimiter itself
    }
    engine.set_to_in(pos as i64)?;
    Ok(text)
}

fn digit_value(byte: u8) -> Option<i64> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as i64),
        b'a'..=b'z' => Some((byte - b'a' + 10) as i64),
        b'A'..=b'Z' => Some((byte - b'A' + 10) as i64),
        _ => None,
    }
}

/// Number conversion per spec.md §4.4: optional leading `-`, then digits
/// valid in `base` (0–9, then A–Z case-insensitively for base > 10).
pub fn parse_number(token: &[u8], base: i64) -> Option<i64> {
    if token.is_empty() {
        return None;
    }
    let (neg, digits) = if token[0] == b'-' {
        (true, &token[1..])
    } else {
        (false, token)
    };
    if digits.is_empty() {
        return None;
    }
    let mut value: i64 = 0;
    for &b in digits {
        let d = digit_value(b)?;
        if d >= base {
            return None;
        }
        value = value.checked_mul(base)?.checked_add(d)?;
    }
    Some(if neg { -value } else { value })
}

/// Render a nonnegative integer in the given base, lowercase digits —
/// the left inverse spec.md §8 requires of `parse_number`.
pub fn format_number(mut value: i64, base: i64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let neg = value < 0;
    if neg {
        value = -value;
    }
    let mut digits = Vec::new();
    while value > 0 {
        let d = (value % base) as u8;
        digits.push(if d < 10 { b'0' + d } else { b'a' + d - 10 });
        value /= base;
    }
    if neg {
        digits.push(b'-');
    }
    digits.reverse();
    String::from_utf8(digits).expect("ascii digits")
}

/// Compile or execute one token, per the interpret/compile-mode split of
/// spec.md §4.4.
fn handle_token(engine: &mut Engine, token: &[u8]) -> Result<(), ForthError> {
    let context = engine.context()?;
    let found = dictionary::find(&engine.cells, &engine.strings, context, token)?;

    if engine.state()? == 0 {
        if let Some(cfa) = found {
            inner::execute_cfa(engine, cfa)
        } else if let Some(n) = parse_number(token, engine.base()?) {
            engine.push(n)
        } else {
            Err(ForthError::lookup(&String::from_utf8_lossy(token)))
        }
    } else if let Some(cfa) = found {
        let nfa = cfa.offset(-1);
        if dictionary::is_immediate(&engine.cells, nfa)? {
            inner::execute_cfa(engine, cfa)
        } else {
            let reference = dictionary::compiled_reference(&engine.cells, cfa)?;
            engine.cells.comma(reference)?;
            Ok(())
        }
    } else if let Some(n) = parse_number(token, engine.base()?) {
        engine.cells.comma(opcode::OP_LITERAL)?;
        engine.cells.comma(n)?;
        Ok(())
    } else {
        Err(ForthError::lookup(&String::from_utf8_lossy(token)))
    }
}

/// `eval` — repeatedly extract and handle tokens from the TIB until it is
/// exhausted. A single error aborts the whole line (spec.md §7: "restart
/// the line").
pub fn eval(engine: &mut Engine) -> Result<(), ForthError> {
    while let Some(token) = next_token(engine)? {
        handle_token(engine, &token)?;
    }
    Ok(())
}

/// `quit` — the top-level REPL loop (spec.md §4.4): prompt, `query` a
/// line, `eval` it. Any error aborts just that line; `quit` itself never
/// returns an error, since there is nothing left to propagate to once the
/// host's `bye`/EOF has set `engine.running` false.
pub fn quit(engine: &mut Engine) {
    let _ = engine.set_state(0);
    engine.clear_return_stack();
    engine.control_stack.clear();
    while engine.running {
        if engine.sources.is_interactive_top() {
            print!("ok ");
            let _ = std::io::stdout().flush();
        }
        if let Err(e) = crate::builtins::io::query(engine) {
            engine.abort(&e);
            continue;
        }
        if !engine.running {
            break;
        }
        if let Err(e) = eval(engine) {
            engine.abort(&e);
        }
    }
}

// --- control-flow compiling helpers, shared by builtins::control --------

/// Compile `op`, reserve (or immediately fill, if `target` is known) the
/// following offset cell, and return the address of that offset cell —
/// the "placeholder" forward patches are later applied to.
pub fn emit_branch(engine: &mut Engine, op: i64, target: Option<i64>) -> Result<CellAddr, ForthError> {
    engine.cells.comma(op)?;
    let placeholder = engine.cells.here_addr();
    let offset = match target {
        Some(t) => t - i64::from(placeholder),
        None => 0,
    };
    engine.cells.comma(offset)?;
    Ok(placeholder)
}

/// Patch a previously-reserved placeholder to branch to `target`.
pub fn patch(engine: &mut Engine, placeholder: CellAddr, target: i64) -> Result<(), ForthError> {
    let offset = target - i64::from(placeholder);
    engine.cells.store(placeholder, offset)
}

/// Compile a call to the named builtin/word (used by control words that
/// need to splice in e.g. `>r`, `0<`, `nip`). Errors with `LookupError` if
/// somehow missing — that would mean the builtin table failed to
/// bootstrap, not a user mistake.
pub fn compile_word(engine: &mut Engine, name: &str) -> Result<(), ForthError> {
    let context = engine.context()?;
    let cfa = dictionary::find(&engine.cells, &engine.strings, context, name.as_bytes())?
        .ok_or_else(|| ForthError::Lookup(format!("internal: {} not registered", name)))?;
    let reference = dictionary::compiled_reference(&engine.cells, cfa)?;
    engine.cells.comma(reference)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_roundtrips_across_bases() {
        for base in 2..=36i64 {
            for n in [0i64, 1, 17, 255, 12345] {
                let s = format_number(n, base);
                let bytes = s.into_bytes();
                assert_eq!(parse_number(&bytes, base), Some(n), "base {}", base);
            }
        }
    }

    #[test]
    fn parse_number_rejects_out_of_base_digits() {
        assert_eq!(parse_number(b"ff", 10), None);
        assert_eq!(parse_number(b"ff", 16), Some(255));
    }

    #[test]
    fn parse_number_handles_negative() {
        assert_eq!(parse_number(b"-42", 10), Some(-42));
    }
}
