//! Data-stack and return-stack shuffling words (spec.md §6.3 "Stack").

use super::def;
use crate::engine::Engine;
use crate::error::ForthError;

fn dup(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.peek(0)?;
    engine.push(a)
}

fn drop_(engine: &mut Engine) -> Result<(), ForthError> {
    engine.pop().map(|_| ())
}

fn swap(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(b)?;
    engine.push(a)
}

fn over(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.peek(1)?;
    engine.push(a)
}

fn rot(engine: &mut Engine) -> Result<(), ForthError> {
    let c = engine.pop()?;
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(b)?;
    engine.push(c)?;
    engine.push(a)
}

fn minus_rot(engine: &mut Engine) -> Result<(), ForthError> {
    let c = engine.pop()?;
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(c)?;
    engine.push(a)?;
    engine.push(b)
}

fn nip(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    engine.pop()?;
    engine.push(b)
}

fn tuck(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(b)?;
    engine.push(a)?;
    engine.push(b)
}

fn question_dup(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.peek(0)?;
    if a != 0 {
        engine.push(a)?;
    }
    Ok(())
}

fn pick(engine: &mut Engine) -> Result<(), ForthError> {
    let n = engine.pop()?;
    if n < 0 {
        return Err(ForthError::Range("pick: negative index".into()));
    }
    let v = engine.peek(n as usize)?;
    engine.push(v)
}

fn roll(engine: &mut Engine) -> Result<(), ForthError> {
    let n = engine.pop()?;
    if n < 0 {
        return Err(ForthError::Range("roll: negative index".into()));
    }
    let n = n as usize;
    let mut items = Vec::with_capacity(n + 1);
    for _ in 0..=n {
        items.push(engine.pop()?);
    }
    let moved = items.remove(n);
    for item in items.into_iter().rev() {
        engine.push(item)?;
    }
    engine.push(moved)
}

fn depth(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(engine.depth() as i64)
}

fn clear(engine: &mut Engine) -> Result<(), ForthError> {
    engine.clear_data_stack();
    Ok(())
}

fn dot_s(engine: &mut Engine) -> Result<(), ForthError> {
    let snapshot = engine.data_stack_snapshot()?;
    print!("<{}> ", snapshot.len());
    for v in snapshot {
        print!("{} ", v);
    }
    Ok(())
}

fn to_r(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.rpush(a)
}

fn r_from(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.rpop()?;
    engine.push(a)
}

fn r_fetch(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.rpeek(0)?;
    engine.push(a)
}

fn rdrop(engine: &mut Engine) -> Result<(), ForthError> {
    engine.rpop().map(|_| ())
}

fn two_dup(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.peek(0)?;
    let a = engine.peek(1)?;
    engine.push(a)?;
    engine.push(b)
}

fn two_drop(engine: &mut Engine) -> Result<(), ForthError> {
    engine.pop()?;
    engine.pop()?;
    Ok(())
}

fn two_swap(engine: &mut Engine) -> Result<(), ForthError> {
    let d = engine.pop()?;
    let c = engine.pop()?;
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(c)?;
    engine.push(d)?;
    engine.push(a)?;
    engine.push(b)
}

pub fn register(engine: &mut Engine) -> Result<(), ForthError> {
    def(engine, "dup", false, dup)?;
    def(engine, "drop", false, drop_)?;
    def(engine, "swap", false, swap)?;
    def(engine, "over", false, over)?;
    def(engine, "rot", false, rot)?;
    def(engine, "-rot", false, minus_rot)?;
    def(engine, "nip", false, nip)?;
    def(engine, "tuck", false, tuck)?;
    def(engine, "?dup", false, question_dup)?;
    def(engine, "pick", false, pick)?;
    def(engine, "roll", false, roll)?;
    def(engine, "depth", false, depth)?;
    def(engine, "clear", false, clear)?;
    def(engine, ".s", false, dot_s)?;
    def(engine, ">r", false, to_r)?;
    def(engine, "r>", false, r_from)?;
    def(engine, "r@", false, r_fetch)?;
    def(engine, "rdrop", false, rdrop)?;
    def(engine, "2dup", false, two_dup)?;
    def(engine, "2drop", false, two_drop)?;
    def(engine, "2swap", false, two_swap)?;
    Ok(())
}
