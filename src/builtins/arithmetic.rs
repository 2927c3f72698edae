//! Arithmetic and logic words (spec.md §6.3 "Arithmetic/logic").

use super::def;
use crate::engine::Engine;
use crate::error::ForthError;

fn add(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(a.wrapping_add(b))
}

fn sub(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(a.wrapping_sub(b))
}

fn mul(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(a.wrapping_mul(b))
}

fn div(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    if b == 0 {
        return Err(ForthError::Arithmetic("division by zero".into()));
    }
    engine.push(a.wrapping_div(b))
}

fn modulo(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    if b == 0 {
        return Err(ForthError::Arithmetic("division by zero".into()));
    }
    engine.push(a.wrapping_rem(b))
}

fn slash_mod(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    if b == 0 {
        return Err(ForthError::Arithmetic("division by zero".into()));
    }
    engine.push(a.wrapping_rem(b))?;
    engine.push(a.wrapping_div(b))
}

fn negate(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(a.wrapping_neg())
}

fn abs(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(a.wrapping_abs())
}

fn min(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(a.min(b))
}

fn max(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(a.max(b))
}

fn bit_and(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(a & b)
}

fn bit_or(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(a | b)
}

fn bit_xor(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(a ^ b)
}

fn invert(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(!a)
}

fn lshift(engine: &mut Engine) -> Result<(), ForthError> {
    let n = engine.pop()?;
    let a = engine.pop()?;
    engine.push(a.wrapping_shl(n as u32))
}

fn rshift(engine: &mut Engine) -> Result<(), ForthError> {
    let n = engine.pop()?;
    let a = engine.pop()?;
    engine.push(((a as u64) >> (n as u32)) as i64)
}

fn eq(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(if a == b { -1 } else { 0 })
}

fn ne(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(if a != b { -1 } else { 0 })
}

fn lt(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(if a < b { -1 } else { 0 })
}

fn gt(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(if a > b { -1 } else { 0 })
}

fn le(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(if a <= b { -1 } else { 0 })
}

fn ge(engine: &mut Engine) -> Result<(), ForthError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(if a >= b { -1 } else { 0 })
}

fn zero_eq(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(if a == 0 { -1 } else { 0 })
}

fn zero_lt(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(if a < 0 { -1 } else { 0 })
}

fn zero_gt(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(if a > 0 { -1 } else { 0 })
}

fn zero_ne(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(if a != 0 { -1 } else { 0 })
}

/// `not` — logical negation of a flag, distinct from the bitwise `invert`.
fn not(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(if a == 0 { -1 } else { 0 })
}

fn one_plus(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(a.wrapping_add(1))
}

fn one_minus(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(a.wrapping_sub(1))
}

fn two_plus(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(a.wrapping_add(2))
}

fn two_minus(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(a.wrapping_sub(2))
}

fn two_star(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(a.wrapping_mul(2))
}

fn two_slash(engine: &mut Engine) -> Result<(), ForthError> {
    let a = engine.pop()?;
    engine.push(a.wrapping_div(2))
}

pub fn register(engine: &mut Engine) -> Result<(), ForthError> {
    def(engine, "+", false, add)?;
    def(engine, "-", false, sub)?;
    def(engine, "*", false, mul)?;
    def(engine, "/", false, div)?;
    def(engine, "mod", false, modulo)?;
    def(engine, "/mod", false, slash_mod)?;
    def(engine, "negate", false, negate)?;
    def(engine, "abs", false, abs)?;
    def(engine, "min", false, min)?;
    def(engine, "max", false, max)?;
    def(engine, "and", false, bit_and)?;
    def(engine, "or", false, bit_or)?;
    def(engine, "xor", false, bit_xor)?;
    def(engine, "invert", false, invert)?;
    def(engine, "lshift", false, lshift)?;
    def(engine, "rshift", false, rshift)?;
    def(engine, "=", false, eq)?;
    def(engine, "<>", false, ne)?;
    def(engine, "<", false, lt)?;
    def(engine, ">", false, gt)?;
    def(engine, "<=", false, le)?;
    def(engine, ">=", false, ge)?;
    def(engine, "0=", false, zero_eq)?;
    def(engine, "0<", false, zero_lt)?;
    def(engine, "0>", false, zero_gt)?;
    def(engine, "0<>", false, zero_ne)?;
    def(engine, "not", false, not)?;
    def(engine, "1+", false, one_plus)?;
    def(engine, "1-", false, one_minus)?;
    def(engine, "2+", false, two_plus)?;
    def(engine, "2-", false, two_minus)?;
    def(engine, "2*", false, two_star)?;
    def(engine, "2/", false, two_slash)?;
    Ok(())
}
