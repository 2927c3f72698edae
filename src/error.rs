//! The error taxonomy of the outer interpreter's `abort` contract.
//!
//! Every error path funnels to `abort`: clear the data stack, reset
//! `state` to interpret, unwind the return stack, restore the terminal
//! from raw mode, discard any open compilation, print a diagnostic, and
//! resume the REPL. There is no partial recovery — the contract is
//! "restart the line" (spec.md §7).

use thiserror::Error;

/// One variant per error kind in spec.md §7. Every builtin and compiler
/// routine returns `Result<_, ForthError>`; [`crate::engine::Engine::abort`]
/// is the single place that turns any of these into the REPL's restart.
#[derive(Debug, Error)]
pub enum ForthError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0} ?")]
    Lookup(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("range error: {0}")]
    Range(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("stack error: {0}")]
    Stack(String),

    #[error("state error: {0}")]
    State(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("{0}")]
    UserAbort(String),
}

impl From<std::io::Error> for ForthError {
    fn from(e: std::io::Error) -> ForthError {
        ForthError::Io(e.to_string())
    }
}

impl ForthError {
    pub fn lookup(token: &str) -> ForthError {
        ForthError::Lookup(format!("{} not found", token))
    }

    pub fn stack_underflow(op: &str) -> ForthError {
        ForthError::Stack(format!("stack underflow in {}", op))
    }
}
