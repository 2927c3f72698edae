//! Input sources: the interactive terminal and nested `include-file`
//! sources (spec.md §4.5).
//!
//! The outer loop always pulls its next line from the top of this stack.
//! TIB, `>in`, and `#tib` are owned by [`crate::engine::Engine`] directly
//! and are saved/restored around a push/pop by the caller (`include-file`
//! and `query`), since they are cells in the shared Cell Store rather than
//! state this module can own on its own.

use std::fs;
use std::io::{self, BufRead};

use crate::error::ForthError;

/// One entry in the nested source stack.
pub enum Source {
    /// Interactive input: lines come from stdin, one `query` at a time.
    Interactive,
    /// A file pushed by `include-file`, with its remaining lines buffered.
    File {
        name: String,
        lines: Vec<String>,
        next: usize,
    },
}

impl Source {
    pub fn from_file(path: &str) -> Result<Source, ForthError> {
        let text = fs::read_to_string(path).map_err(|e| ForthError::Io(format!("{}: {}", path, e)))?;
        let lines: Vec<String> = text.lines().map(|s| s.to_string()).collect();
        Ok(Source::File {
            name: path.to_string(),
            lines,
            next: 0,
        })
    }

    /// Pull the next line, if any. `None` means EOF for a file source;
    /// interactive sources are read by the caller directly from stdin
    /// (see [`read_interactive_line`]) since that read may block.
    pub fn next_line(&mut self) -> Option<String> {
        match self {
            Source::Interactive => None,
            Source::File { lines, next, .. } => {
                if *next < lines.len() {
                    let line = lines[*next].clone();
                    *next += 1;
                    Some(line)
                } else {
                    None
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Source::Interactive => "<interactive>",
            Source::File { name, .. } => name,
        }
    }
}

/// A stack of input sources. `include-file` pushes; EOF pops.
pub struct SourceStack {
    stack: Vec<Source>,
}

impl SourceStack {
    pub fn new() -> SourceStack {
        SourceStack {
            stack: vec![Source::Interactive],
        }
    }

    pub fn push(&mut self, source: Source) {
        self.stack.push(source);
    }

    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn top_mut(&mut self) -> &mut Source {
        self.stack.last_mut().expect("source stack is never empty")
    }

    pub fn is_interactive_top(&self) -> bool {
        matches!(self.stack.last(), Some(Source::Interactive))
    }
}

impl Default for SourceStack {
    fn default() -> SourceStack {
        SourceStack::new()
    }
}

/// Read one line from stdin for the interactive top-level `query`.
/// Returns `Ok(None)` on EOF (e.g. piped input, or Ctrl-D).
pub fn read_interactive_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    let n = io::stdin().lock().read_line(&mut line)?;
    if n == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}
