//! Cell/string storage access and the auxiliary variables (spec.md §3.1,
//! §6.3 "Memory"). `base`/`state`/`>in`/`#tib`/`context`/`last` push the
//! *address* of their reserved cell, the way a classic Forth `VARIABLE`
//! does, so `10 base !` and `base @ .` both work from user code. `here`
//! and `s-here` push their live value directly (`CONSTANT`-style) since
//! they are plain Rust fields here rather than cells of their own — noted
//! in DESIGN.md.

use super::def;
use crate::cells::CellAddr;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::strings::StringAddr;

fn fetch(engine: &mut Engine) -> Result<(), ForthError> {
    let addr = engine.pop()?;
    let v = engine.cells.fetch(CellAddr(addr as usize))?;
    engine.push(v)
}

fn store(engine: &mut Engine) -> Result<(), ForthError> {
    let addr = engine.pop()?;
    let v = engine.pop()?;
    engine.cells.store(CellAddr(addr as usize), v)
}

fn plus_store(engine: &mut Engine) -> Result<(), ForthError> {
    let addr = engine.pop()?;
    let n = engine.pop()?;
    let cur = engine.cells.fetch(CellAddr(addr as usize))?;
    engine.cells.store(CellAddr(addr as usize), cur.wrapping_add(n))
}

fn c_fetch(engine: &mut Engine) -> Result<(), ForthError> {
    let addr = engine.pop()?;
    let v = engine.strings.byte_fetch(StringAddr(addr as usize))?;
    engine.push(v as i64)
}

fn c_store(engine: &mut Engine) -> Result<(), ForthError> {
    let addr = engine.pop()?;
    let v = engine.pop()?;
    engine.strings.byte_store(StringAddr(addr as usize), v as u8)
}

fn comma(engine: &mut Engine) -> Result<(), ForthError> {
    let v = engine.pop()?;
    engine.cells.comma(v)?;
    Ok(())
}

/// `(comma)` — same primitive as `,`, named out separately (spec.md §6.3
/// "Memory") so bootstrap source can refer to the raw append operation
/// without relying on `,` not having been redefined.
fn comma_paren(engine: &mut Engine) -> Result<(), ForthError> {
    comma(engine)
}

fn allot(engine: &mut Engine) -> Result<(), ForthError> {
    let n = engine.pop()?;
    engine.cells.allot(n)
}

fn here(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.cells.here_addr()))
}

fn s_here(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.strings.here_addr()))
}

fn base(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.vars.base))
}

fn state(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.vars.state))
}

fn context(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.vars.context))
}

fn last(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.vars.last))
}

fn to_in(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.vars.to_in))
}

fn tib_len_var(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.vars.tib_len))
}

fn pad(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.pad_addr()))
}

fn tmp(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.tmp_addr()))
}

fn tib(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.tib_addr()))
}

pub fn register(engine: &mut Engine) -> Result<(), ForthError> {
    def(engine, "@", false, fetch)?;
    def(engine, "!", false, store)?;
    def(engine, "+!", false, plus_store)?;
    def(engine, "c@", false, c_fetch)?;
    def(engine, "c!", false, c_store)?;
    def(engine, ",", false, comma)?;
    def(engine, "(comma)", false, comma_paren)?;
    def(engine, "allot", false, allot)?;
    def(engine, "here", false, here)?;
    def(engine, "s-here", false, s_here)?;
    def(engine, "base", false, base)?;
    def(engine, "state", false, state)?;
    def(engine, "context", false, context)?;
    def(engine, "last", false, last)?;
    def(engine, ">in", false, to_in)?;
    def(engine, "#tib", false, tib_len_var)?;
    def(engine, "pad", false, pad)?;
    def(engine, "tmp", false, tmp)?;
    def(engine, "tib", false, tib)?;
    Ok(())
}
