//! Terminal I/O, timing, the line-source pipeline, and string-literal
//! words (spec.md §4.5, §6.3 "I/O" and "Parser/compiler").

use std::io::Write as _;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use super::def;
use crate::cells::CellAddr;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::opcode;
use crate::outer;
use crate::source::{read_interactive_line, Source};

fn key(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.terminal.read_key()?;
    engine.push(b as i64)
}

fn key_question(engine: &mut Engine) -> Result<(), ForthError> {
    let ready = engine.terminal.key_ready()?;
    engine.push(if ready { -1 } else { 0 })
}

fn emit_paren(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()? as u8;
    print!("{}", b as char);
    Ok(())
}

fn emit(engine: &mut Engine) -> Result<(), ForthError> {
    emit_paren(engine)
}

fn dot(engine: &mut Engine) -> Result<(), ForthError> {
    let v = engine.pop()?;
    print!("{} ", outer::format_number(v, engine.base()?));
    Ok(())
}

fn cr(_engine: &mut Engine) -> Result<(), ForthError> {
    println!();
    Ok(())
}

fn space(_engine: &mut Engine) -> Result<(), ForthError> {
    print!(" ");
    Ok(())
}

fn type_(engine: &mut Engine) -> Result<(), ForthError> {
    let len = engine.pop()? as usize;
    let addr = engine.pop()?;
    let bytes: Result<Vec<u8>, ForthError> = (0..len)
        .map(|i| Ok(engine.cells.fetch(CellAddr(addr as usize + i))? as u8))
        .collect();
    print!("{}", String::from_utf8_lossy(&bytes?));
    Ok(())
}

fn flush(_engine: &mut Engine) -> Result<(), ForthError> {
    std::io::stdout().flush().map_err(ForthError::from)
}

fn raw_mode_on(engine: &mut Engine) -> Result<(), ForthError> {
    engine.terminal.enable_raw().map_err(ForthError::from)
}

fn raw_mode_off(engine: &mut Engine) -> Result<(), ForthError> {
    engine.terminal.disable_raw().map_err(ForthError::from)
}

fn raw_mode_question(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(if engine.terminal.is_raw() { -1 } else { 0 })
}

fn epoch_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

fn ms(engine: &mut Engine) -> Result<(), ForthError> {
    let n = engine.pop()?;
    if n > 0 {
        std::thread::sleep(std::time::Duration::from_millis(n as u64));
    }
    Ok(())
}

fn now(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(epoch_micros() / 1_000_000)
}

fn millis(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(epoch_micros() / 1_000)
}

fn micros(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(epoch_micros())
}

/// `(system)` — run the counted string sitting in PAD as a shell command,
/// pushing its exit code. Host escape hatch, used sparingly by bootstrap
/// source for things like `ls`-style directory listings.
fn system_paren(engine: &mut Engine) -> Result<(), ForthError> {
    let cmd = engine.read_pad()?;
    let cmd = String::from_utf8_lossy(&cmd).into_owned();
    let status = Command::new("sh").arg("-c").arg(&cmd).status();
    let code = match status {
        Ok(s) => s.code().unwrap_or(-1) as i64,
        Err(e) => {
            tracing::warn!(%e, "(system) failed to spawn");
            -1
        }
    };
    engine.push(code)
}

fn accept(engine: &mut Engine) -> Result<(), ForthError> {
    let max = engine.pop()? as usize;
    let addr = engine.pop()?;
    let line = read_interactive_line()?.unwrap_or_default();
    let n = line.len().min(max);
    for (i, b) in line.as_bytes().iter().take(n).enumerate() {
        engine.cells.store(CellAddr(addr as usize + i), *b as i64)?;
    }
    engine.push(n as i64)
}

/// `query` — pull the next line from the top of the source stack into the
/// TIB. Pops exhausted file sources and retries; returns cleanly with an
/// empty TIB at true end-of-input (the REPL loop checks `running`).
pub(crate) fn query(engine: &mut Engine) -> Result<(), ForthError> {
    loop {
        if engine.sources.is_interactive_top() {
            match read_interactive_line()? {
                Some(line) => {
                    engine.load_tib(&line)?;
                    return Ok(());
                }
                None => {
                    engine.running = false;
                    engine.load_tib("")?;
                    return Ok(());
                }
            }
        } else {
            let line = engine.sources.top_mut().next_line();
            match line {
                Some(line) => {
                    engine.load_tib(&line)?;
                    return Ok(());
                }
                None => {
                    engine.sources.pop();
                }
            }
        }
    }
}

fn eval(engine: &mut Engine) -> Result<(), ForthError> {
    outer::eval(engine)
}

/// `include-file` — parse a filename off the rest of the current line,
/// push a file source, and drain it line by line through `eval` before
/// returning to whatever was reading before.
fn include_file(engine: &mut Engine) -> Result<(), ForthError> {
    let name_bytes = outer::parse_to(engine, b' ')?;
    let path = String::from_utf8_lossy(&name_bytes).trim().to_string();
    let source = Source::from_file(&path)?;
    engine.sources.push(source);
    let saved_tib = engine.tib_bytes()?;
    let saved_to_in = engine.to_in()?;
    let saved_len = engine.tib_len()?;

    while engine.sources.depth() > 1 {
        let line = engine.sources.top_mut().next_line();
        match line {
            Some(line) => {
                engine.load_tib(&line)?;
                outer::eval(engine)?;
            }
            None => {
                engine.sources.pop();
            }
        }
    }

    engine.load_tib(&String::from_utf8_lossy(&saved_tib))?;
    engine.set_tib_len(saved_len)?;
    engine.set_to_in(saved_to_in)
}

fn parse_to_builtin(engine: &mut Engine) -> Result<(), ForthError> {
    let delim = engine.pop()? as u8;
    let text = outer::parse_to(engine, delim)?;
    engine.write_tmp(&text)?;
    engine.push(i64::from(engine.tmp_addr().offset(1)))?;
    engine.push(text.len() as i64)
}

/// `(.")`  — print a counted string by its String Store address. The
/// compiled form of `."`.
fn print_counted(engine: &mut Engine) -> Result<(), ForthError> {
    let addr = engine.pop()?;
    let bytes = engine
        .strings
        .read_counted(crate::strings::StringAddr(addr as usize))?
        .to_vec();
    print!("{}", String::from_utf8_lossy(&bytes));
    Ok(())
}

fn dot_quote(engine: &mut Engine) -> Result<(), ForthError> {
    let text = outer::parse_to(engine, b'"')?;
    if engine.state()? == 0 {
        print!("{}", String::from_utf8_lossy(&text));
        Ok(())
    } else {
        let addr = engine.create_string(&text)?;
        engine.cells.comma(opcode::OP_STRLIT)?;
        engine.cells.comma(i64::from(addr))?;
        outer::compile_word(engine, "(.\")")
    }
}

/// `(abort-quote)` — pop the string address then the flag; abort with the
/// message if the flag is true, otherwise a no-op. Compiled form of
/// `abort"`.
fn abort_quote_paren(engine: &mut Engine) -> Result<(), ForthError> {
    let addr = engine.pop()?;
    let flag = engine.pop()?;
    if flag != 0 {
        let bytes = engine
            .strings
            .read_counted(crate::strings::StringAddr(addr as usize))?
            .to_vec();
        Err(ForthError::UserAbort(String::from_utf8_lossy(&bytes).into_owned()))
    } else {
        Ok(())
    }
}

fn abort_quote(engine: &mut Engine) -> Result<(), ForthError> {
    let text = outer::parse_to(engine, b'"')?;
    let addr = engine.create_string(&text)?;
    engine.cells.comma(opcode::OP_STRLIT)?;
    engine.cells.comma(i64::from(addr))?;
    outer::compile_word(engine, "(abort-quote)")
}

fn dump(engine: &mut Engine) -> Result<(), ForthError> {
    let n = engine.pop()?;
    let addr = engine.pop()?;
    for i in 0..n {
        let a = CellAddr((addr + i) as usize);
        let v = engine.cells.fetch(a)?;
        println!("{:>8}: {:>12} (0x{:x})", a, v, v);
    }
    Ok(())
}

pub fn register(engine: &mut Engine) -> Result<(), ForthError> {
    def(engine, "key", false, key)?;
    def(engine, "key?", false, key_question)?;
    def(engine, "(emit)", false, emit_paren)?;
    def(engine, "emit", false, emit)?;
    def(engine, ".", false, dot)?;
    def(engine, "cr", false, cr)?;
    def(engine, "space", false, space)?;
    def(engine, "type", false, type_)?;
    def(engine, "flush", false, flush)?;
    def(engine, "raw-mode-on", false, raw_mode_on)?;
    def(engine, "raw-mode-off", false, raw_mode_off)?;
    def(engine, "raw-mode?", false, raw_mode_question)?;
    def(engine, "ms", false, ms)?;
    def(engine, "now", false, now)?;
    def(engine, "millis", false, millis)?;
    def(engine, "micros", false, micros)?;
    def(engine, "(system)", false, system_paren)?;
    def(engine, "accept", false, accept)?;
    def(engine, "query", false, query)?;
    def(engine, "eval", false, eval)?;
    def(engine, "include-file", false, include_file)?;
    def(engine, "parse-to", false, parse_to_builtin)?;
    def(engine, "(.\")", false, print_counted)?;
    def(engine, "(abort-quote)", false, abort_quote_paren)?;
    def(engine, ".\"", true, dot_quote)?;
    def(engine, "abort\"", true, abort_quote)?;
    def(engine, "dump", false, dump)?;
    Ok(())
}
