//! Debug and stepper control (spec.md §4.2 "stepper/tracer"; `bye` is a
//! SPEC_FULL.md §C supplement so scripts and the REPL have a clean exit
//! word instead of relying on EOF alone).

use super::def;
use crate::engine::Engine;
use crate::error::ForthError;

fn dbg(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.vars.debuglevel))
}

fn stepper(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.vars.stepper))
}

fn stepper_depth(engine: &mut Engine) -> Result<(), ForthError> {
    engine.push(i64::from(engine.vars.stepper_depth))
}

fn show_stack(engine: &mut Engine) -> Result<(), ForthError> {
    let data = engine.data_stack_snapshot()?;
    println!("data: {:?}  rdepth: {}", data, engine.rdepth());
    Ok(())
}

fn bye(engine: &mut Engine) -> Result<(), ForthError> {
    engine.running = false;
    Ok(())
}

pub fn register(engine: &mut Engine) -> Result<(), ForthError> {
    def(engine, "dbg", false, dbg)?;
    def(engine, "stepper", false, stepper)?;
    def(engine, "stepper-depth", false, stepper_depth)?;
    def(engine, "show-stack", false, show_stack)?;
    def(engine, "bye", false, bye)?;
    Ok(())
}
