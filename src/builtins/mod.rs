//! The builtin table (spec.md §4.3): every primitive the dictionary can
//! name, grouped by concern into submodules the way the rest of this
//! crate groups its own code.
//!
//! Each builtin is a plain `fn(&mut Engine) -> Result<(), ForthError>`.
//! [`call_builtin`] copies the function pointer out of the table before
//! invoking it — the table lives inside the same `Engine` the builtin
//! needs `&mut` access to, so holding a borrow of the table across the
//! call would not typecheck.

mod arithmetic;
mod control;
mod debug;
mod dictionary_ops;
pub(crate) mod io;
mod memory;
mod stack_ops;

use crate::dictionary;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::opcode;

pub type BuiltinFn = fn(&mut Engine) -> Result<(), ForthError>;

/// The live builtin table: parallel arrays indexed by builtin index, the
/// same index stored (OR'd with [`opcode::BUILTIN_FLAG`]) in every CFA
/// cell that refers to one of these words.
pub struct BuiltinTable {
    names: Vec<String>,
    fns: Vec<BuiltinFn>,
}

impl BuiltinTable {
    pub fn new() -> BuiltinTable {
        BuiltinTable {
            names: Vec::new(),
            fns: Vec::new(),
        }
    }

    /// Name of the builtin at `idx`, for `builtin-name` and the `dump`
    /// disassembly helper. `None` if `idx` is out of range.
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(|s| s.as_str())
    }
}

impl Default for BuiltinTable {
    fn default() -> BuiltinTable {
        BuiltinTable::new()
    }
}

/// Dispatch entry point called by the inner interpreter and by
/// `execute_cfa` for a builtin CFA cell.
pub fn call_builtin(engine: &mut Engine, idx: usize) -> Result<(), ForthError> {
    let f = *engine
        .builtins
        .fns
        .get(idx)
        .ok_or_else(|| ForthError::Range(format!("builtin index {} out of range", idx)))?;
    f(engine)
}

/// Register one builtin: allocate its dictionary entry (BP + NFA + a
/// flagged-builtin CFA), append it to the table, and converge
/// `last`/`context` on it immediately — builtins never sit half-open the
/// way a `:` definition does.
fn def(engine: &mut Engine, name: &str, immediate: bool, f: BuiltinFn) -> Result<(), ForthError> {
    let idx = engine.builtins.fns.len();
    engine.builtins.fns.push(f);
    engine.builtins.names.push(name.to_string());

    let context = engine.context()?;
    let (_bp, nfa) = dictionary::open_entry(&mut engine.cells, &mut engine.strings, context, name.as_bytes())?;
    if immediate {
        dictionary::mark_immediate(&mut engine.cells, nfa)?;
    }
    engine.cells.comma(opcode::flagged_builtin(idx, immediate))?;
    engine.set_last(i64::from(nfa))?;
    engine.set_context(i64::from(nfa))?;
    Ok(())
}

/// Populate a fresh [`Engine`]'s dictionary with every builtin. Called
/// once from [`Engine::new`].
pub fn register_all(engine: &mut Engine) -> Result<(), ForthError> {
    arithmetic::register(engine)?;
    stack_ops::register(engine)?;
    memory::register(engine)?;
    dictionary_ops::register(engine)?;
    io::register(engine)?;
    control::register(engine)?;
    debug::register(engine)?;
    Ok(())
}
