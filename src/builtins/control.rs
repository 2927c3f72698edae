//! Compile-time control structures and the runtime primitives they expand
//! into (spec.md §4.4 "bootstrapped as immediate words"; counted-loop
//! forms are SPEC_FULL.md §C supplements, grounded in the BEGIN/IF
//! compiling-word idiom spec.md already specifies).
//!
//! Every word here except `execute`/`exit`/`abort`/`>c`/`c>` is immediate:
//! it must run *while compiling* to emit branches and patch placeholders,
//! which is exactly what [`crate::outer::handle_token`]'s immediate-word
//! rule is for. The three parenthesized words (`(do)`, `(loop)`,
//! `(+loop)`) are ordinary runtime builtins the compiling words splice
//! calls to — loop bookkeeping lives in one host routine per spec.md's
//! "avoid re-deriving stack choreography in compiled Forth" style rather
//! than as hand-threaded bytecode.

use crate::cells::CellAddr;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::inner;
use crate::opcode::{self, MARK_BEGIN, MARK_CASE, MARK_DO, MARK_ELSE, MARK_FOR, MARK_IF, MARK_OF, MARK_WHILE};
use crate::outer::{compile_word, emit_branch, patch};

use super::def;

fn pop_control(engine: &mut Engine, expected: i64, word: &str) -> Result<i64, ForthError> {
    match engine.control_stack.pop() {
        Some((addr, tag)) if tag == expected => Ok(addr),
        Some(_) => Err(ForthError::State(format!("{}: unbalanced control structure", word))),
        None => Err(ForthError::State(format!("{}: control stack empty", word))),
    }
}

// --- if / else / then ----------------------------------------------------

fn if_word(engine: &mut Engine) -> Result<(), ForthError> {
    let placeholder = emit_branch(engine, opcode::OP_BRANCH0, None)?;
    engine.control_stack.push((i64::from(placeholder), MARK_IF));
    Ok(())
}

fn else_word(engine: &mut Engine) -> Result<(), ForthError> {
    let if_placeholder = pop_control(engine, MARK_IF, "else")?;
    let else_placeholder = emit_branch(engine, opcode::OP_BRANCH, None)?;
    patch(engine, CellAddr(if_placeholder as usize), i64::from(engine.cells.here_addr()))?;
    engine.control_stack.push((i64::from(else_placeholder), MARK_ELSE));
    Ok(())
}

fn then_word(engine: &mut Engine) -> Result<(), ForthError> {
    let placeholder = match engine.control_stack.pop() {
        Some((addr, tag)) if tag == MARK_IF || tag == MARK_ELSE => addr,
        _ => return Err(ForthError::State("then: unbalanced if/else".into())),
    };
    patch(engine, CellAddr(placeholder as usize), i64::from(engine.cells.here_addr()))
}

// --- begin / until / again / while / repeat ------------------------------

fn begin_word(engine: &mut Engine) -> Result<(), ForthError> {
    engine.control_stack.push((i64::from(engine.cells.here_addr()), MARK_BEGIN));
    Ok(())
}

fn until_word(engine: &mut Engine) -> Result<(), ForthError> {
    let begin_addr = pop_control(engine, MARK_BEGIN, "until")?;
    emit_branch(engine, opcode::OP_BRANCH0, Some(begin_addr))?;
    Ok(())
}

fn again_word(engine: &mut Engine) -> Result<(), ForthError> {
    let begin_addr = pop_control(engine, MARK_BEGIN, "again")?;
    emit_branch(engine, opcode::OP_BRANCH, Some(begin_addr))?;
    Ok(())
}

fn while_word(engine: &mut Engine) -> Result<(), ForthError> {
    match engine.control_stack.last() {
        Some((_, tag)) if *tag == MARK_BEGIN => {}
        _ => return Err(ForthError::State("while: no matching begin".into())),
    }
    let placeholder = emit_branch(engine, opcode::OP_BRANCH0, None)?;
    engine.control_stack.push((i64::from(placeholder), MARK_WHILE));
    Ok(())
}

fn repeat_word(engine: &mut Engine) -> Result<(), ForthError> {
    let while_placeholder = pop_control(engine, MARK_WHILE, "repeat")?;
    let begin_addr = pop_control(engine, MARK_BEGIN, "repeat")?;
    emit_branch(engine, opcode::OP_BRANCH, Some(begin_addr))?;
    patch(engine, CellAddr(while_placeholder as usize), i64::from(engine.cells.here_addr()))
}

// --- for / next -----------------------------------------------------------

fn for_word(engine: &mut Engine) -> Result<(), ForthError> {
    compile_word(engine, ">r")?;
    engine.control_stack.push((i64::from(engine.cells.here_addr()), MARK_FOR));
    Ok(())
}

/// Compiles: `r> 1 - dup >r 0< branch0 <loop_addr> r> drop`. Counts down
/// from the value `for` pushed to the return stack through 0 inclusive,
/// then discards the exhausted (-1) sentinel before falling through.
fn next_word(engine: &mut Engine) -> Result<(), ForthError> {
    let loop_addr = pop_control(engine, MARK_FOR, "next")?;
    compile_word(engine, "r>")?;
    engine.cells.comma(opcode::OP_LITERAL)?;
    engine.cells.comma(1)?;
    compile_word(engine, "-")?;
    compile_word(engine, "dup")?;
    compile_word(engine, ">r")?;
    compile_word(engine, "0<")?;
    emit_branch(engine, opcode::OP_BRANCH0, Some(loop_addr))?;
    compile_word(engine, "r>")?;
    compile_word(engine, "drop")?;
    Ok(())
}

// --- do / loop / +loop / i / j --------------------------------------------

/// `(do)` ( limit index -- ): push both to the return stack, index on top
/// so `i` is a plain `r@`.
fn do_paren(engine: &mut Engine) -> Result<(), ForthError> {
    let index = engine.pop()?;
    let limit = engine.pop()?;
    engine.rpush(limit)?;
    engine.rpush(index)
}

/// `(loop)` ( -- continue ): advance the index by one; pushes `0` and
/// leaves the (limit, index) pair on the return stack if the loop should
/// run again, otherwise pops them and pushes a nonzero "done" flag. The
/// `branch0` the compiled `loop` emits right after this call reads that
/// flag, so "continue" must be the zero case.
fn loop_paren(engine: &mut Engine) -> Result<(), ForthError> {
    let index = engine.rpop()?;
    let limit = engine.rpop()?;
    let new_index = index.wrapping_add(1);
    if new_index < limit {
        engine.rpush(limit)?;
        engine.rpush(new_index)?;
        engine.push(0)
    } else {
        engine.push(-1)
    }
}

/// `(+loop)` ( step -- continue ): like `(loop)` but advances by a signed
/// step and detects having crossed `limit` in either direction.
fn plus_loop_paren(engine: &mut Engine) -> Result<(), ForthError> {
    let step = engine.pop()?;
    let index = engine.rpop()?;
    let limit = engine.rpop()?;
    let new_index = index.wrapping_add(step);
    let crossed = if step >= 0 { new_index >= limit } else { new_index < limit };
    if !crossed {
        engine.rpush(limit)?;
        engine.rpush(new_index)?;
        engine.push(0)
    } else {
        engine.push(-1)
    }
}

fn do_word(engine: &mut Engine) -> Result<(), ForthError> {
    compile_word(engine, "(do)")?;
    engine.control_stack.push((i64::from(engine.cells.here_addr()), MARK_DO));
    Ok(())
}

fn loop_word(engine: &mut Engine) -> Result<(), ForthError> {
    let loop_addr = pop_control(engine, MARK_DO, "loop")?;
    compile_word(engine, "(loop)")?;
    emit_branch(engine, opcode::OP_BRANCH0, Some(loop_addr))?;
    Ok(())
}

fn plus_loop_word(engine: &mut Engine) -> Result<(), ForthError> {
    let loop_addr = pop_control(engine, MARK_DO, "+loop")?;
    compile_word(engine, "(+loop)")?;
    emit_branch(engine, opcode::OP_BRANCH0, Some(loop_addr))?;
    Ok(())
}

fn i_word(engine: &mut Engine) -> Result<(), ForthError> {
    let v = engine.rpeek(0)?;
    engine.push(v)
}

fn j_word(engine: &mut Engine) -> Result<(), ForthError> {
    let v = engine.rpeek(2)?;
    engine.push(v)
}

// --- case / of / endof / endcase ------------------------------------------

fn case_word(engine: &mut Engine) -> Result<(), ForthError> {
    engine.control_stack.push((0, MARK_CASE));
    Ok(())
}

/// `of` compiles `over = branch0 <next-test>` and leaves the case value
/// untouched — the match is only consumed by `endcase`'s trailing `nip`,
/// so matched and unmatched (fallthrough default) paths leave the stack
/// in the same shape for `endcase` to clean up uniformly.
fn of_word(engine: &mut Engine) -> Result<(), ForthError> {
    compile_word(engine, "over")?;
    compile_word(engine, "=")?;
    let placeholder = emit_branch(engine, opcode::OP_BRANCH0, None)?;
    engine.control_stack.push((i64::from(placeholder), MARK_OF));
    Ok(())
}

fn endof_word(engine: &mut Engine) -> Result<(), ForthError> {
    let of_placeholder = pop_control(engine, MARK_OF, "endof")?;
    let end_placeholder = emit_branch(engine, opcode::OP_BRANCH, None)?;
    patch(engine, CellAddr(of_placeholder as usize), i64::from(engine.cells.here_addr()))?;
    engine.control_stack.push((i64::from(end_placeholder), MARK_OF));
    Ok(())
}

fn endcase_word(engine: &mut Engine) -> Result<(), ForthError> {
    let here = i64::from(engine.cells.here_addr());
    loop {
        match engine.control_stack.pop() {
            Some((_, tag)) if tag == MARK_CASE => break,
            Some((addr, tag)) if tag == MARK_OF => {
                patch(engine, CellAddr(addr as usize), here)?;
            }
            _ => return Err(ForthError::State("endcase: unbalanced case".into())),
        }
    }
    compile_word(engine, "nip")
}

// --- misc control words ---------------------------------------------------

fn execute_word(engine: &mut Engine) -> Result<(), ForthError> {
    let cfa = engine.pop()?;
    inner::execute_cfa(engine, CellAddr(cfa as usize))
}

fn exit_word(engine: &mut Engine) -> Result<(), ForthError> {
    if engine.state()? == 0 {
        Err(ForthError::State("exit: not compiling".into()))
    } else {
        engine.cells.comma(opcode::OP_EXIT)?;
        Ok(())
    }
}

fn abort_word(engine: &mut Engine) -> Result<(), ForthError> {
    if engine.state()? == 0 {
        Err(ForthError::UserAbort("abort".into()))
    } else {
        engine.cells.comma(opcode::OP_ABORT)?;
        Ok(())
    }
}

fn to_c(engine: &mut Engine) -> Result<(), ForthError> {
    let tag = engine.pop()?;
    let addr = engine.pop()?;
    engine.control_stack.push((addr, tag));
    Ok(())
}

fn c_from(engine: &mut Engine) -> Result<(), ForthError> {
    let (addr, tag) = engine
        .control_stack
        .pop()
        .ok_or_else(|| ForthError::stack_underflow("control stack"))?;
    engine.push(addr)?;
    engine.push(tag)
}

pub fn register(engine: &mut Engine) -> Result<(), ForthError> {
    def(engine, "if", true, if_word)?;
    def(engine, "else", true, else_word)?;
    def(engine, "then", true, then_word)?;
    def(engine, "begin", true, begin_word)?;
    def(engine, "until", true, until_word)?;
    def(engine, "again", true, again_word)?;
    def(engine, "while", true, while_word)?;
    def(engine, "repeat", true, repeat_word)?;
    def(engine, "for", true, for_word)?;
    def(engine, "next", true, next_word)?;
    def(engine, "(do)", false, do_paren)?;
    def(engine, "(loop)", false, loop_paren)?;
    def(engine, "(+loop)", false, plus_loop_paren)?;
    def(engine, "do", true, do_word)?;
    def(engine, "loop", true, loop_word)?;
    def(engine, "+loop", true, plus_loop_word)?;
    def(engine, "i", false, i_word)?;
    def(engine, "j", false, j_word)?;
    def(engine, "case", true, case_word)?;
    def(engine, "of", true, of_word)?;
    def(engine, "endof", true, endof_word)?;
    def(engine, "endcase", true, endcase_word)?;
    def(engine, "execute", false, execute_word)?;
    def(engine, "exit", true, exit_word)?;
    def(engine, "abort", true, abort_word)?;
    def(engine, ">c", false, to_c)?;
    def(engine, "c>", false, c_from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::BoundsMode;
    use crate::engine::EngineConfig;
    use crate::outer::eval;

    fn fresh_engine() -> Engine {
        Engine::new(EngineConfig {
            cell_count: 4096,
            string_count: 4096,
            bounds_mode: BoundsMode::Guarded,
        })
        .unwrap()
    }

    fn run(engine: &mut Engine, line: &str) {
        engine.load_tib(line).unwrap();
        eval(engine).unwrap();
    }

    #[test]
    fn if_then_compiles_and_runs() {
        let mut engine = fresh_engine();
        run(&mut engine, ": f if 1 else 2 then ;");
        run(&mut engine, "-1 f");
        assert_eq!(engine.pop().unwrap(), 1);
        run(&mut engine, "0 f");
        assert_eq!(engine.pop().unwrap(), 2);
    }

    #[test]
    fn begin_until_counts() {
        let mut engine = fresh_engine();
        run(&mut engine, ": cnt 0 begin 1+ dup 3 = until ;");
        run(&mut engine, "cnt");
        assert_eq!(engine.pop().unwrap(), 3);
    }

    #[test]
    fn do_loop_visits_each_index() {
        let mut engine = fresh_engine();
        run(&mut engine, ": r 5 0 do i loop ;");
        run(&mut engine, "r");
        let mut seen = Vec::new();
        while engine.depth() > 0 {
            seen.push(engine.pop().unwrap());
        }
        seen.reverse();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn case_of_endof_endcase_selects_branch() {
        let mut engine = fresh_engine();
        run(&mut engine, ": f case 1 of 10 endof 2 of 20 endof 99 endcase ;");
        run(&mut engine, "1 f");
        assert_eq!(engine.pop().unwrap(), 10);
        run(&mut engine, "2 f");
        assert_eq!(engine.pop().unwrap(), 20);
        run(&mut engine, "3 f");
        assert_eq!(engine.pop().unwrap(), 99);
    }
}
