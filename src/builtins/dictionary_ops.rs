//! Definition and lookup words (spec.md §3.3/§3.5/§3.6, §6.3 "Dictionary").
//!
//! `:` opens a definition and flips to compile state; `;` — immediate, so
//! it runs even though `state` is compile — closes it. Everything in
//! between is handled by [`crate::outer::eval`], not here.

use super::def;
use crate::cells::CellAddr;
use crate::dictionary;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::opcode;
use crate::outer;
use crate::strings::StringAddr;

fn read_name(engine: &mut Engine) -> Result<Vec<u8>, ForthError> {
    outer::next_token(engine)?.ok_or_else(|| ForthError::Parse("expected a name".into()))
}

fn colon(engine: &mut Engine) -> Result<(), ForthError> {
    let name = read_name(engine)?;
    let context = engine.context()?;
    let open = dictionary::begin_definition(&mut engine.cells, &mut engine.strings, context, &name)?;
    engine.set_last(i64::from(open.nfa))?;
    engine.set_state(-1)
}

fn semicolon(engine: &mut Engine) -> Result<(), ForthError> {
    engine.cells.comma(opcode::OP_BREAK)?;
    let last = engine.last()?;
    engine.set_context(last)?;
    engine.set_state(0)
}

fn create(engine: &mut Engine) -> Result<(), ForthError> {
    let name = read_name(engine)?;
    let context = engine.context()?;
    let (_bp, nfa) = dictionary::open_entry(&mut engine.cells, &mut engine.strings, context, &name)?;
    engine.set_last(i64::from(nfa))?;
    engine.set_context(i64::from(nfa))
}

fn variable(engine: &mut Engine) -> Result<(), ForthError> {
    create(engine)?;
    engine.cells.comma(opcode::OP_VARIABLE)?;
    engine.cells.comma(0)?;
    Ok(())
}

fn constant(engine: &mut Engine) -> Result<(), ForthError> {
    let value = engine.pop()?;
    create(engine)?;
    engine.cells.comma(opcode::OP_CONSTANT)?;
    engine.cells.comma(value)?;
    Ok(())
}

fn immediate(engine: &mut Engine) -> Result<(), ForthError> {
    let last = engine.last()?;
    dictionary::mark_immediate(&mut engine.cells, CellAddr(last as usize))
}

fn close_paren(engine: &mut Engine) -> Result<(), ForthError> {
    let last = engine.last()?;
    engine.set_context(last)
}

/// Read a counted string laid out the way [`Engine::write_pad`] and
/// `parse-to` lay one out in the Cell Store: a length cell followed by
/// that many one-byte-per-cell content cells.
fn read_counted_cells(engine: &Engine, addr: CellAddr) -> Result<Vec<u8>, ForthError> {
    let len = engine.cells.fetch(addr)? as usize;
    (0..len)
        .map(|i| Ok(engine.cells.fetch(addr.offset(1 + i as i64))? as u8))
        .collect()
}

fn tick(engine: &mut Engine) -> Result<(), ForthError> {
    let name = read_name(engine)?;
    let context = engine.context()?;
    match dictionary::find(&engine.cells, &engine.strings, context, &name)? {
        Some(cfa) => engine.push(i64::from(cfa)),
        None => Err(ForthError::lookup(&String::from_utf8_lossy(&name))),
    }
}

fn paren_tick(engine: &mut Engine) -> Result<(), ForthError> {
    let name = read_name(engine)?;
    let context = engine.context()?;
    let v = match dictionary::find(&engine.cells, &engine.strings, context, &name)? {
        Some(cfa) => i64::from(cfa),
        None => 0,
    };
    engine.push(v)
}

fn find(engine: &mut Engine) -> Result<(), ForthError> {
    let addr = engine.pop()?;
    let token = read_counted_cells(engine, CellAddr(addr as usize))?;
    let context = engine.context()?;
    match dictionary::find(&engine.cells, &engine.strings, context, &token)? {
        Some(cfa) => {
            engine.push(i64::from(cfa))?;
            engine.push(-1)
        }
        None => {
            engine.push(addr)?;
            engine.push(0)
        }
    }
}

fn question_unique(engine: &mut Engine) -> Result<(), ForthError> {
    let name = engine.read_pad()?;
    let context = engine.context()?;
    let exists = dictionary::find(&engine.cells, &engine.strings, context, &name)?.is_some();
    if exists {
        println!("{} isn't unique", String::from_utf8_lossy(&name));
    }
    engine.push(if exists { 0 } else { -1 })
}

fn builtin_name(engine: &mut Engine) -> Result<(), ForthError> {
    let idx = engine.pop()? as usize;
    match engine.builtins.name(idx) {
        Some(name) => {
            let addr = engine.create_string(name.as_bytes())?;
            engine.push(i64::from(addr))
        }
        None => engine.push(0),
    }
}

fn words(engine: &mut Engine) -> Result<(), ForthError> {
    let context = engine.context()?;
    let names = dictionary::walk_names(&engine.cells, &engine.strings, context)?;
    println!("{}", names.join(" "));
    Ok(())
}

fn forget(engine: &mut Engine) -> Result<(), ForthError> {
    let name = read_name(engine)?;
    let context = engine.context()?;
    match dictionary::mark_before(&engine.cells, &engine.strings, context, &name)? {
        Some(mark) => {
            engine.cells.here = mark.here;
            engine.strings.rewind(StringAddr(mark.s_here));
            engine.set_context(mark.context)?;
            engine.set_last(mark.context)
        }
        None => Err(ForthError::lookup(&String::from_utf8_lossy(&name))),
    }
}

pub fn register(engine: &mut Engine) -> Result<(), ForthError> {
    def(engine, ":", false, colon)?;
    def(engine, ";", true, semicolon)?;
    def(engine, "create", false, create)?;
    def(engine, "variable", false, variable)?;
    def(engine, "constant", false, constant)?;
    def(engine, "immediate", false, immediate)?;
    def(engine, "(close)", false, close_paren)?;
    def(engine, "'", false, tick)?;
    def(engine, "(')", false, paren_tick)?;
    def(engine, "find", false, find)?;
    def(engine, "?unique", false, question_unique)?;
    def(engine, "builtin-name", false, builtin_name)?;
    def(engine, "words", false, words)?;
    def(engine, "forget", false, forget)?;
    Ok(())
}
