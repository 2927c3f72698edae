//! The Cell Store: a single fixed-size array of signed 64-bit integers.
//!
//! Dictionary cells, both stacks, the return stack, the three text
//! buffers (TIB/PAD/TMP) and free heap all live in one [`CellStore`].
//! See `specification` for the full region layout.

use crate::error::ForthError;

/// A validated index into the [`CellStore`]. User-visible Forth code only
/// ever sees a cell address as a plain `i64` on the stack; this newtype
/// exists so the host never confuses a cell address with an ordinary value
/// once it crosses into Rust code that indexes the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellAddr(pub usize);

impl CellAddr {
    pub fn offset(self, delta: i64) -> CellAddr {
        CellAddr((self.0 as i64 + delta) as usize)
    }
}

impl From<CellAddr> for i64 {
    fn from(a: CellAddr) -> i64 {
        a.0 as i64
    }
}

impl std::fmt::Display for CellAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default total cell count if the caller doesn't override it on the CLI.
pub const DEFAULT_CELL_COUNT: usize = 1 << 20;

/// Whether out-of-range access panics (baseline) or raises an [`ForthError`]
/// (guarded mode, spec.md's "optional mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsMode {
    Unchecked,
    Guarded,
}

/// The linear, cell-addressed data store shared by the dictionary, both
/// stacks, the return stack, and the text buffers.
///
/// Allocation discipline: `here` always points at the next free cell, and
/// writing at `here` then incrementing it is the *only* way code is
/// appended (see [`CellStore::allot`] and [`CellStore::comma`]).
pub struct CellStore {
    cells: Vec<i64>,
    pub here: usize,
    pub mode: BoundsMode,
}

impl CellStore {
    pub fn new(capacity: usize, mode: BoundsMode) -> CellStore {
        CellStore {
            cells: vec![0; capacity],
            here: 0,
            mode,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn check(&self, addr: usize) -> Result<(), ForthError> {
        if addr >= self.cells.len() {
            match self.mode {
                BoundsMode::Unchecked => panic!("cell address {} out of range", addr),
                BoundsMode::Guarded => {
                    return Err(ForthError::Range(format!(
                        "cell address {} out of range (capacity {})",
                        addr,
                        self.cells.len()
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn fetch(&self, addr: CellAddr) -> Result<i64, ForthError> {
        self.check(addr.0)?;
        Ok(self.cells[addr.0])
    }

    pub fn store(&mut self, addr: CellAddr, value: i64) -> Result<(), ForthError> {
        self.check(addr.0)?;
        self.cells[addr.0] = value;
        Ok(())
    }

    /// Append a cell at `here` and advance it. This is the sole code-growth
    /// primitive the compiler uses (the builtin `,`).
    pub fn comma(&mut self, value: i64) -> Result<CellAddr, ForthError> {
        let addr = CellAddr(self.here);
        self.check(self.here)?;
        if self.here >= self.cells.len() {
            return Err(ForthError::Range("dictionary exhausted".into()));
        }
        self.cells[self.here] = value;
        self.here += 1;
        Ok(addr)
    }

    /// Reserve (`n > 0`) or release (`n < 0`) cells by moving `here`.
    /// Never writes a back pointer; that is the caller's job.
    pub fn allot(&mut self, n: i64) -> Result<(), ForthError> {
        if n == 0 {
            return Ok(());
        }
        let new_here = self.here as i64 + n;
        if new_here < 0 {
            return Err(ForthError::Range("allot would move here below zero".into()));
        }
        self.check(new_here as usize)?;
        self.here = new_here as usize;
        Ok(())
    }

    pub fn here_addr(&self) -> CellAddr {
        CellAddr(self.here)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_advances_here() {
        let mut cs = CellStore::new(16, BoundsMode::Guarded);
        let a = cs.comma(42).unwrap();
        assert_eq!(a, CellAddr(0));
        assert_eq!(cs.here, 1);
        assert_eq!(cs.fetch(a).unwrap(), 42);
    }

    #[test]
    fn allot_moves_here_both_ways() {
        let mut cs = CellStore::new(16, BoundsMode::Guarded);
        cs.allot(4).unwrap();
        assert_eq!(cs.here, 4);
        cs.allot(-2).unwrap();
        assert_eq!(cs.here, 2);
        cs.allot(0).unwrap();
        assert_eq!(cs.here, 2);
    }

    #[test]
    fn guarded_out_of_range_raises() {
        let cs = CellStore::new(4, BoundsMode::Guarded);
        let err = cs.fetch(CellAddr(99)).unwrap_err();
        assert!(matches!(err, ForthError::Range(_)));
    }
}
