//! A minimal Forth system core: a cell-addressed data store, an
//! indirect-threaded inner interpreter, an incremental dictionary
//! compiler, and an outer interpreter/REPL. See the `specification`
//! pseudomodule for the full data model and opcode table.

pub mod specification;

pub mod builtins;
pub mod cells;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod inner;
pub mod opcode;
pub mod outer;
pub mod source;
pub mod strings;
pub mod terminal;

pub use engine::{Engine, EngineConfig};
pub use error::ForthError;

/// Run one line of Forth source through a fresh engine and return it, for
/// embedding or quick scripted checks. The REPL (`src/bin/forth.rs`) uses
/// the lower-level `Engine`/`outer` API directly instead, since it needs
/// to drive multiple lines against one persistent engine.
pub fn evaluate(source: &str, config: EngineConfig) -> Result<Engine, ForthError> {
    let mut engine = Engine::new(config)?;
    engine.load_tib(source)?;
    outer::eval(&mut engine)?;
    Ok(engine)
}
