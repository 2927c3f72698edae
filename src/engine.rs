//! Ties the Cell Store, String Store, dictionary, builtin table, inner
//! interpreter and outer interpreter into one [`Engine`].
//!
//! Region layout (spec.md §3.1): TIB/PAD/TMP, the data stack, and the
//! return stack are all carved out of the same [`CellStore`] the
//! dictionary grows into, in that order, before `here` is handed to the
//! dictionary. Auxiliary variables (`state`, `base`, `>in`, `#tib`,
//! `context`, `last`, `stepper`, `stepper-depth`, `debuglevel`) are each a
//! single reserved cell so Forth code can read/write them exactly like any
//! other `VARIABLE`.

use crate::builtins::{self, BuiltinTable};
use crate::cells::{BoundsMode, CellAddr, CellStore};
use crate::error::ForthError;
use crate::source::SourceStack;
use crate::strings::{StringAddr, StringStore};
use crate::terminal::Terminal;

pub const TIB_SIZE: usize = 132;
pub const PAD_SIZE: usize = 132;
pub const TMP_SIZE: usize = 132;
pub const DEFAULT_DATA_STACK_SIZE: usize = 1024;
pub const DEFAULT_RETURN_STACK_SIZE: usize = 1024;
pub const DEFAULT_CONTROL_STACK_SIZE: usize = 256;

#[derive(Debug, Clone, Copy)]
struct Region {
    base: usize,
    size: usize,
}

impl Region {
    fn addr(&self, offset: usize) -> CellAddr {
        CellAddr(self.base + offset)
    }
}

/// Addresses of the auxiliary cells described in spec.md §3.1. Each is a
/// single reserved cell, addressed like any `VARIABLE`.
#[derive(Debug, Clone, Copy)]
pub struct Vars {
    pub state: CellAddr,
    pub base: CellAddr,
    pub to_in: CellAddr,
    pub tib_len: CellAddr,
    pub context: CellAddr,
    pub last: CellAddr,
    pub stepper: CellAddr,
    pub stepper_depth: CellAddr,
    pub debuglevel: CellAddr,
}

/// Engine construction parameters, surfaced on the CLI (SPEC_FULL.md §B.3).
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub cell_count: usize,
    pub string_count: usize,
    pub bounds_mode: BoundsMode,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            cell_count: crate::cells::DEFAULT_CELL_COUNT,
            string_count: crate::strings::DEFAULT_STRING_STORE_SIZE,
            bounds_mode: BoundsMode::Unchecked,
        }
    }
}

pub struct Engine {
    pub cells: CellStore,
    pub strings: StringStore,

    tib: Region,
    pad: Region,
    tmp: Region,
    dstack: Region,
    rstack: Region,

    pub sp: usize,
    pub rp: usize,
    pub control_stack: Vec<(i64, i64)>,

    pub vars: Vars,
    pub pc: usize,

    pub builtins: BuiltinTable,
    pub sources: SourceStack,
    pub terminal: Terminal,

    pub running: bool,
    pub exit_code: i32,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Engine, ForthError> {
        let mut cells = CellStore::new(config.cell_count, config.bounds_mode);
        let strings = StringStore::new(config.string_count, config.bounds_mode == BoundsMode::Guarded);

        let tib = Region {
            base: alloc_region(&mut cells, TIB_SIZE)?,
            size: TIB_SIZE,
        };
        let pad = Region {
            base: alloc_region(&mut cells, PAD_SIZE)?,
            size: PAD_SIZE,
        };
        let tmp = Region {
            base: alloc_region(&mut cells, TMP_SIZE)?,
            size: TMP_SIZE,
        };
        let dstack = Region {
            base: alloc_region(&mut cells, DEFAULT_DATA_STACK_SIZE)?,
            size: DEFAULT_DATA_STACK_SIZE,
        };
        let rstack = Region {
            base: alloc_region(&mut cells, DEFAULT_RETURN_STACK_SIZE)?,
            size: DEFAULT_RETURN_STACK_SIZE,
        };

        let vars = Vars {
            state: cells.comma(0)?,
            base: cells.comma(10)?,
            to_in: cells.comma(0)?,
            tib_len: cells.comma(0)?,
            context: cells.comma(0)?,
            last: cells.comma(0)?,
            stepper: cells.comma(0)?,
            stepper_depth: cells.comma(0)?,
            debuglevel: cells.comma(0)?,
        };

        let mut engine = Engine {
            cells,
            strings,
            tib,
            pad,
            tmp,
            dstack,
            rstack,
            sp: 0,
            rp: 0,
            control_stack: Vec::with_capacity(DEFAULT_CONTROL_STACK_SIZE),
            vars,
            pc: 0,
            builtins: BuiltinTable::new(),
            sources: SourceStack::new(),
            terminal: Terminal::new(),
            running: true,
            exit_code: 0,
        };

        builtins::register_all(&mut engine)?;
        Ok(engine)
    }

    // --- auxiliary variable accessors -------------------------------------

    pub fn state(&self) -> Result<i64, ForthError> {
        self.cells.fetch(self.vars.state)
    }
    pub fn set_state(&mut self, v: i64) -> Result<(), ForthError> {
        self.cells.store(self.vars.state, v)
    }
    pub fn base(&self) -> Result<i64, ForthError> {
        self.cells.fetch(self.vars.base)
    }
    pub fn to_in(&self) -> Result<i64, ForthError> {
        self.cells.fetch(self.vars.to_in)
    }
    pub fn set_to_in(&mut self, v: i64) -> Result<(), ForthError> {
        self.cells.store(self.vars.to_in, v)
    }
    pub fn tib_len(&self) -> Result<i64, ForthError> {
        self.cells.fetch(self.vars.tib_len)
    }
    pub fn set_tib_len(&mut self, v: i64) -> Result<(), ForthError> {
        self.cells.store(self.vars.tib_len, v)
    }
    pub fn context(&self) -> Result<i64, ForthError> {
        self.cells.fetch(self.vars.context)
    }
    pub fn set_context(&mut self, v: i64) -> Result<(), ForthError> {
        self.cells.store(self.vars.context, v)
    }
    pub fn last(&self) -> Result<i64, ForthError> {
        self.cells.fetch(self.vars.last)
    }
    pub fn set_last(&mut self, v: i64) -> Result<(), ForthError> {
        self.cells.store(self.vars.last, v)
    }
    pub fn stepper(&self) -> Result<i64, ForthError> {
        self.cells.fetch(self.vars.stepper)
    }
    pub fn stepper_depth(&self) -> Result<i64, ForthError> {
        self.cells.fetch(self.vars.stepper_depth)
    }
    pub fn debuglevel(&self) -> Result<i64, ForthError> {
        self.cells.fetch(self.vars.debuglevel)
    }

    pub fn pad_addr(&self) -> CellAddr {
        self.pad.addr(0)
    }
    pub fn tmp_addr(&self) -> CellAddr {
        self.tmp.addr(0)
    }
    pub fn tib_addr(&self) -> CellAddr {
        self.tib.addr(0)
    }
    pub fn tib_capacity(&self) -> usize {
        self.tib.size
    }

    // --- data stack --------------------------------------------------------

    pub fn push(&mut self, value: i64) -> Result<(), ForthError> {
        if self.sp >= self.dstack.size {
            return Err(ForthError::Stack("data stack overflow".into()));
        }
        self.cells.store(self.dstack.addr(self.sp), value)?;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<i64, ForthError> {
        if self.sp == 0 {
            return Err(ForthError::stack_underflow("data stack"));
        }
        self.sp -= 1;
        self.cells.fetch(self.dstack.addr(self.sp))
    }

    pub fn peek(&self, depth_from_top: usize) -> Result<i64, ForthError> {
        if depth_from_top >= self.sp {
            return Err(ForthError::stack_underflow("data stack"));
        }
        self.cells.fetch(self.dstack.addr(self.sp - 1 - depth_from_top))
    }

    pub fn depth(&self) -> usize {
        self.sp
    }

    pub fn clear_data_stack(&mut self) {
        self.sp = 0;
    }

    pub fn data_stack_snapshot(&self) -> Result<Vec<i64>, ForthError> {
        (0..self.sp)
            .map(|i| self.cells.fetch(self.dstack.addr(i)))
            .collect()
    }

    // --- return stack --------------------------------------------------------

    pub fn rpush(&mut self, value: i64) -> Result<(), ForthError> {
        if self.rp >= self.rstack.size {
            return Err(ForthError::Stack("return stack overflow".into()));
        }
        self.cells.store(self.rstack.addr(self.rp), value)?;
        self.rp += 1;
        Ok(())
    }

    pub fn rpop(&mut self) -> Result<i64, ForthError> {
        if self.rp == 0 {
            return Err(ForthError::stack_underflow("return stack"));
        }
        self.rp -= 1;
        self.cells.fetch(self.rstack.addr(self.rp))
    }

    pub fn rdepth(&self) -> usize {
        self.rp
    }

    /// Peek the return stack without popping — `depth_from_top` 0 is the
    /// very top. Backs `i`/`j` (SPEC_FULL.md §C: nested `do`/`loop` index
    /// access; `j` skips the enclosing loop's limit cell at depth 2).
    pub fn rpeek(&self, depth_from_top: usize) -> Result<i64, ForthError> {
        if depth_from_top >= self.rp {
            return Err(ForthError::stack_underflow("return stack"));
        }
        self.cells.fetch(self.rstack.addr(self.rp - 1 - depth_from_top))
    }

    pub fn clear_return_stack(&mut self) {
        self.rp = 0;
    }

    // --- TIB -----------------------------------------------------------------

    /// Load a line of input into the TIB, resetting `>in` and `#tib`.
    pub fn load_tib(&mut self, line: &str) -> Result<(), ForthError> {
        let bytes = line.as_bytes();
        let n = bytes.len().min(self.tib.size);
        for (i, b) in bytes.iter().take(n).enumerate() {
            self.cells.store(self.tib.addr(i), *b as i64)?;
        }
        self.set_tib_len(n as i64)?;
        self.set_to_in(0)?;
        Ok(())
    }

    pub fn tib_bytes(&self) -> Result<Vec<u8>, ForthError> {
        let len = self.tib_len()? as usize;
        (0..len)
            .map(|i| Ok(self.cells.fetch(self.tib.addr(i))? as u8))
            .collect()
    }

    pub fn write_pad(&mut self, bytes: &[u8]) -> Result<(), ForthError> {
        let n = bytes.len().min(self.pad.size - 1);
        self.cells.store(self.pad.addr(0), n as i64)?;
        for (i, b) in bytes.iter().take(n).enumerate() {
            self.cells.store(self.pad.addr(1 + i), *b as i64)?;
        }
        Ok(())
    }

    pub fn read_pad(&self) -> Result<Vec<u8>, ForthError> {
        let n = self.cells.fetch(self.pad.addr(0))? as usize;
        (0..n)
            .map(|i| Ok(self.cells.fetch(self.pad.addr(1 + i))? as u8))
            .collect()
    }

    pub fn write_tmp(&mut self, bytes: &[u8]) -> Result<(), ForthError> {
        let n = bytes.len().min(self.tmp.size - 1);
        self.cells.store(self.tmp.addr(0), n as i64)?;
        for (i, b) in bytes.iter().take(n).enumerate() {
            self.cells.store(self.tmp.addr(1 + i), *b as i64)?;
        }
        Ok(())
    }

    pub fn read_tmp(&self) -> Result<Vec<u8>, ForthError> {
        let n = self.cells.fetch(self.tmp.addr(0))? as usize;
        (0..n)
            .map(|i| Ok(self.cells.fetch(self.tmp.addr(1 + i))? as u8))
            .collect()
    }

    /// Print one stepper/tracer line (spec.md §4.2). Single-step mode
    /// (`stepper < 0`) blocks on a key before continuing; `s` steps, `t`
    /// switches to trace-only, `c` turns the stepper off, `i`/`o` nudge
    /// `stepper-depth`, and `h`/`?` print a short help line. This writes
    /// to the same stdout stream as ordinary Forth output (spec.md §4.2:
    /// it's a feature of the running language, not host diagnostics), so
    /// it deliberately does not go through `tracing`.
    pub fn trace_step(&mut self, pc: usize) -> Result<(), ForthError> {
        let name = crate::dictionary::name_for_pc(
            &self.cells,
            &self.strings,
            self.context()?,
            pc,
            self.cells.here,
        )?
        .unwrap_or_else(|| "?".to_string());
        let stack = self.data_stack_snapshot()?;
        println!(
            "[{:>6}] depth={} {:?} {}",
            pc,
            self.rdepth(),
            stack,
            name
        );

        if self.stepper()? < 0 {
            loop {
                let key = self.terminal.read_key()?;
                match key as char {
                    's' => break,
                    't' => {
                        self.set_stepper(1)?;
                        break;
                    }
                    'c' => {
                        self.set_stepper(0)?;
                        break;
                    }
                    'i' => {
                        let d = self.stepper_depth()?;
                        self.cells.store(self.vars.stepper_depth, d + 1)?;
                    }
                    'o' => {
                        let d = self.stepper_depth()?;
                        self.cells.store(self.vars.stepper_depth, d - 1)?;
                    }
                    'h' | '?' => {
                        println!("s=step t=trace c=continue i/o=depth h/?=help");
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn set_stepper(&mut self, v: i64) -> Result<(), ForthError> {
        self.cells.store(self.vars.stepper, v)
    }

    /// `abort`: the single propagation point of spec.md §7. Clears both
    /// stacks and the control stack, resets `state`, discards any open
    /// compilation, and restores the terminal from raw mode.
    pub fn abort(&mut self, err: &ForthError) {
        tracing::warn!(%err, "abort");
        self.clear_data_stack();
        self.clear_return_stack();
        self.control_stack.clear();
        let _ = self.set_state(0);
        let _ = self.set_last(self.context().unwrap_or(0));
        self.terminal.force_cooked();
        println!("{}", err);
    }

    pub fn create_string(&mut self, bytes: &[u8]) -> Result<StringAddr, ForthError> {
        self.strings.create(bytes)
    }
}

fn alloc_region(cells: &mut CellStore, size: usize) -> Result<usize, ForthError> {
    let base = cells.here;
    cells.allot(size as i64)?;
    Ok(base)
}
