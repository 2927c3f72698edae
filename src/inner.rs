//! The inner interpreter: an opcode dispatcher stepping the program
//! counter through cells of the Cell Store (spec.md §4.2).
//!
//! Calling convention: "call" always means *push the current PC, then set
//! PC to the target CFA address*. Whatever opcode lives at that address —
//! `DEFINITION`, `VARIABLE`, `CONSTANT`, or `ARRAY` — is decoded exactly
//! as it would be if execution had arrived there any other way, because
//! step 1 of the loop ("read the cell at PC, then increment PC") already
//! leaves PC pointing at the payload before the big match runs. This
//! collapses the spec's separately-described "DEFINITION tag skip" into
//! the same code path as every other callable opcode, which is the
//! resolution recorded in DESIGN.md for spec.md §4.2's cross-reference
//! note.

use crate::cells::CellAddr;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::opcode::{self, ADDRESS_MASK};

/// A PC value no real cell address can take (PC is always a valid index
/// into the Cell Store, bounded well below `i64::MAX`). Pushed to the
/// return stack beneath a top-level call so `BREAK`/`EXIT` has something
/// unambiguous to recognize as "nothing further to run, return to host".
pub const HALT_SENTINEL: i64 = i64::MIN;

/// Enter a word by its CFA address, as the outer interpreter's `execute`
/// and the `EXEC` opcode both do. Builtins run to completion inline;
/// everything else runs the inner interpreter until it unwinds back past
/// this call.
pub fn execute_cfa(engine: &mut Engine, cfa: CellAddr) -> Result<(), ForthError> {
    let cfa_cell = engine.cells.fetch(cfa)?;
    if opcode::is_builtin_cell(cfa_cell) {
        let idx = opcode::builtin_index(cfa_cell);
        crate::builtins::call_builtin(engine, idx)
    } else {
        engine.rpush(HALT_SENTINEL)?;
        engine.pc = cfa.0;
        run_loop(engine)
    }
}

fn call_inline(engine: &mut Engine, target: usize) -> Result<(), ForthError> {
    engine.rpush(engine.pc as i64)?;
    engine.pc = target;
    Ok(())
}

/// Pop the return stack into PC. Returns `Ok(true)` if that popped the
/// halt sentinel (the loop should stop and hand control back to the
/// host), `Ok(false)` if execution should continue at the new PC.
fn do_return(engine: &mut Engine) -> Result<bool, ForthError> {
    let addr = engine.rpop()?;
    if addr == HALT_SENTINEL {
        Ok(true)
    } else {
        engine.pc = addr as usize;
        Ok(false)
    }
}

/// Run the inner interpreter until a `BREAK`/`EXIT`/`VARIABLE`-style
/// return unwinds past the frame this loop was entered for.
fn run_loop(engine: &mut Engine) -> Result<(), ForthError> {
    loop {
        let pc_before = engine.pc;
        let ir = engine.cells.fetch(CellAddr(engine.pc))?;
        engine.pc += 1;

        if opcode::is_builtin_cell(ir) {
            let idx = (ir & ADDRESS_MASK) as usize;
            crate::builtins::call_builtin(engine, idx)?;
        } else {
            match ir {
                opcode::OP_VARIABLE | opcode::OP_ARRAY => {
                    engine.push(engine.pc as i64)?;
                    if do_return(engine)? {
                        return Ok(());
                    }
                }
                opcode::OP_CONSTANT => {
                    let v = engine.cells.fetch(CellAddr(engine.pc))?;
                    engine.push(v)?;
                    if do_return(engine)? {
                        return Ok(());
                    }
                }
                opcode::OP_LITERAL | opcode::OP_STRLIT => {
                    let v = engine.cells.fetch(CellAddr(engine.pc))?;
                    engine.push(v)?;
                    engine.pc += 1;
                }
                opcode::OP_DEFINITION => {
                    // Payload begins right here; nothing to do but fall
                    // through to the next iteration.
                }
                opcode::OP_BRANCH => {
                    let offset = engine.cells.fetch(CellAddr(engine.pc))?;
                    engine.pc = (engine.pc as i64 + offset) as usize;
                }
                opcode::OP_BRANCH0 => {
                    let offset = engine.cells.fetch(CellAddr(engine.pc))?;
                    let top = engine.pop()?;
                    if top == 0 {
                        engine.pc = (engine.pc as i64 + offset) as usize;
                    } else {
                        engine.pc += 1;
                    }
                }
                opcode::OP_ABORT => {
                    return Err(ForthError::UserAbort("aborted".into()));
                }
                opcode::OP_BREAK | opcode::OP_EXIT => {
                    if do_return(engine)? {
                        return Ok(());
                    }
                }
                opcode::OP_EXEC => {
                    let addr = engine.pop()?;
                    if addr < 0 {
                        return Err(ForthError::Type("EXEC: negative address is not a CFA".into()));
                    }
                    call_inline(engine, addr as usize)?;
                }
                other if other >= 0 && (other as usize) < engine.cells.here => {
                    // A compiled call to a colon definition: `compiled_reference`
                    // commas the bare CFA address rather than a flagged cell.
                    call_inline(engine, other as usize)?;
                }
                other => {
                    return Err(ForthError::Type(format!(
                        "unrecognized opcode {} at cell {}",
                        other, pc_before
                    )));
                }
            }
        }

        if engine.stepper()? != 0 && (engine.rdepth() as i64) <= engine.stepper_depth()? {
            engine.trace_step(pc_before)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::BoundsMode;
    use crate::engine::{Engine, EngineConfig};
    use crate::opcode::*;

    fn fresh_engine() -> Engine {
        Engine::new(EngineConfig {
            cell_count: 4096,
            string_count: 4096,
            bounds_mode: BoundsMode::Guarded,
        })
        .unwrap()
    }

    #[test]
    fn literal_then_break_pushes_and_returns() {
        let mut engine = fresh_engine();
        let cfa = engine.cells.comma(OP_DEFINITION).unwrap();
        engine.cells.comma(OP_LITERAL).unwrap();
        engine.cells.comma(42).unwrap();
        engine.cells.comma(OP_BREAK).unwrap();

        execute_cfa(&mut engine, cfa).unwrap();
        assert_eq!(engine.depth(), 1);
        assert_eq!(engine.pop().unwrap(), 42);
        assert_eq!(engine.rdepth(), 0);
    }

    #[test]
    fn variable_pushes_payload_address_and_returns() {
        let mut engine = fresh_engine();
        let cfa = engine.cells.comma(OP_VARIABLE).unwrap();
        let payload = engine.cells.comma(0).unwrap();

        execute_cfa(&mut engine, cfa).unwrap();
        assert_eq!(engine.pop().unwrap(), i64::from(payload));
    }

    #[test]
    fn branch0_skips_when_nonzero() {
        let mut engine = fresh_engine();
        let cfa = engine.cells.comma(OP_DEFINITION).unwrap();
        engine.cells.comma(OP_LITERAL).unwrap();
        engine.cells.comma(1).unwrap();
        engine.cells.comma(OP_BRANCH0).unwrap();
        engine.cells.comma(10).unwrap(); // skipped if TOS != 0
        engine.cells.comma(OP_LITERAL).unwrap();
        engine.cells.comma(99).unwrap();
        engine.cells.comma(OP_BREAK).unwrap();

        execute_cfa(&mut engine, cfa).unwrap();
        assert_eq!(engine.pop().unwrap(), 99);
    }

    #[test]
    fn abort_opcode_propagates_error() {
        let mut engine = fresh_engine();
        let cfa = engine.cells.comma(OP_DEFINITION).unwrap();
        engine.cells.comma(OP_ABORT).unwrap();
        let err = execute_cfa(&mut engine, cfa).unwrap_err();
        assert!(matches!(err, ForthError::UserAbort(_)));
    }
}
