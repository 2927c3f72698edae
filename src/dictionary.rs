//! Dictionary entry layout and lifecycle (spec.md §3.3, §3.5, §3.6).
//!
//! An entry is three contiguous cells plus payload:
//!
//! ```text
//! [BP] [NFA] [CFA] [params...]
//! ```
//!
//! `BP`'s own cell holds the *previous* word's BP-cell address (or 0 for
//! the first word ever defined) — not its own address. Chasing that chain
//! from `context` therefore visits every completed word exactly once and
//! terminates at 0, which is what makes back-pointer traversal a simple
//! loop rather than needing a separate "length" anywhere.
//!
//! `NFA`'s cell holds the string-store address of the counted name,
//! OR'd with [`crate::opcode::IMMEDIATE_FLAG`] when the word is immediate
//! (spec.md's dictionary table: "high bits carry flags", read off the
//! name field). `CFA`'s cell holds either an opcode (`DEFINITION` for a
//! colon word) or, for a builtin, `BUILTIN_FLAG | index` directly — the
//! builtin table index *is* the code field, there is no separate jump.

use crate::cells::{CellAddr, CellStore};
use crate::error::ForthError;
use crate::opcode::{self, ADDRESS_MASK, IMMEDIATE_FLAG, OP_DEFINITION};
use crate::strings::{StringAddr, StringStore};

/// The NFA, CFA of a word opened by `:` and not yet closed by `;`.
#[derive(Debug, Clone, Copy)]
pub struct OpenDefinition {
    pub bp: CellAddr,
    pub nfa: CellAddr,
    pub cfa: CellAddr,
}

/// Snapshot of dictionary/string-store state, used by `forget` to rewind
/// to a point before a named word was created.
#[derive(Debug, Clone, Copy)]
pub struct DictMark {
    pub here: usize,
    pub s_here: usize,
    pub context: i64,
}

/// Allocate a BP slot and an NFA slot for a new word named `name`. Does
/// not write a CFA cell — callers (`create`, `:`) decide what goes there.
/// Returns the addresses of the BP and NFA cells; the CFA cell is the
/// next one `comma` would write (`nfa + 1`).
pub fn open_entry(
    cells: &mut CellStore,
    strings: &mut StringStore,
    context: i64,
    name: &[u8],
) -> Result<(CellAddr, CellAddr), ForthError> {
    let back_pointer = if context == 0 {
        0
    } else {
        context - 1
    };
    let bp = cells.comma(back_pointer)?;
    let name_addr = strings.create(name)?;
    let nfa = cells.comma(i64::from(name_addr))?;
    Ok((bp, nfa))
}

/// Mark a word immediate by OR-ing the flag into its NFA cell.
pub fn mark_immediate(cells: &mut CellStore, nfa: CellAddr) -> Result<(), ForthError> {
    let v = cells.fetch(nfa)?;
    cells.store(nfa, v | IMMEDIATE_FLAG)
}

pub fn is_immediate(cells: &CellStore, nfa: CellAddr) -> Result<bool, ForthError> {
    Ok(opcode::is_immediate_cell(cells.fetch(nfa)?))
}

fn name_addr_of(cells: &CellStore, nfa: CellAddr) -> Result<StringAddr, ForthError> {
    Ok(StringAddr((cells.fetch(nfa)? & ADDRESS_MASK) as usize))
}

/// Walk the back-pointer chain from `context` looking for `token`. Returns
/// the address of the matching word's CFA cell (not its content).
///
/// Comparison is case-sensitive (spec.md §4.4); the most recent definition
/// wins on shadowing because the walk starts at the newest word.
pub fn find(
    cells: &CellStore,
    strings: &StringStore,
    context: i64,
    token: &[u8],
) -> Result<Option<CellAddr>, ForthError> {
    if context == 0 {
        return Ok(None);
    }
    let mut nfa = CellAddr(context as usize);
    loop {
        let name_addr = name_addr_of(cells, nfa)?;
        if strings.read_counted(name_addr)? == token {
            return Ok(Some(nfa.offset(1)));
        }
        let bp_addr = CellAddr(nfa.0 - 1);
        let prev_bp_value = cells.fetch(bp_addr)?;
        if prev_bp_value == 0 {
            return Ok(None);
        }
        nfa = CellAddr(prev_bp_value as usize + 1);
    }
}

/// List every name reachable from `context`, most recent first. Grounds
/// the `words` builtin (SPEC_FULL.md §C).
pub fn walk_names(
    cells: &CellStore,
    strings: &StringStore,
    context: i64,
) -> Result<Vec<String>, ForthError> {
    let mut names = Vec::new();
    if context == 0 {
        return Ok(names);
    }
    let mut nfa = CellAddr(context as usize);
    loop {
        let name_addr = name_addr_of(cells, nfa)?;
        let bytes = strings.read_counted(name_addr)?;
        names.push(String::from_utf8_lossy(bytes).into_owned());
        let bp_addr = CellAddr(nfa.0 - 1);
        let prev_bp_value = cells.fetch(bp_addr)?;
        if prev_bp_value == 0 {
            break;
        }
        nfa = CellAddr(prev_bp_value as usize + 1);
    }
    Ok(names)
}

/// Find the name of the word whose region contains `pc`, for the stepper
/// display (spec.md §4.2). Best-effort and debug-only: entries are
/// contiguous in creation order, so the word right after (at a higher
/// base address than) the one containing `pc` marks its upper bound.
pub fn name_for_pc(
    cells: &CellStore,
    strings: &StringStore,
    context: i64,
    pc: usize,
    here: usize,
) -> Result<Option<String>, ForthError> {
    if context == 0 {
        return Ok(None);
    }
    let mut entries: Vec<(usize, CellAddr)> = Vec::new();
    let mut nfa = CellAddr(context as usize);
    loop {
        let bp_addr = CellAddr(nfa.0 - 1);
        entries.push((bp_addr.0, nfa));
        let prev_bp_value = cells.fetch(bp_addr)?;
        if prev_bp_value == 0 {
            break;
        }
        nfa = CellAddr(prev_bp_value as usize + 1);
    }
    for i in 0..entries.len() {
        let (lo, name_addr) = entries[i];
        let hi = if i == 0 { here } else { entries[i - 1].0 };
        if lo <= pc && pc < hi {
            let addr = name_addr_of(cells, name_addr)?;
            return Ok(Some(
                String::from_utf8_lossy(strings.read_counted(addr)?).into_owned(),
            ));
        }
    }
    Ok(None)
}

/// `:` — begin a definition. Allocates BP + NFA, writes `DEFINITION` into
/// the CFA, and returns the open definition for the caller to stash as
/// `last`. `context` is left untouched until `(close)`.
pub fn begin_definition(
    cells: &mut CellStore,
    strings: &mut StringStore,
    context: i64,
    name: &[u8],
) -> Result<OpenDefinition, ForthError> {
    let (bp, nfa) = open_entry(cells, strings, context, name)?;
    let cfa = cells.comma(OP_DEFINITION)?;
    Ok(OpenDefinition { bp, nfa, cfa })
}

/// `(close)` — finalize the definition just closed by `;`. `last` and
/// `context` converge on the same NFA (spec.md §3.5).
pub fn close_definition(open: &OpenDefinition) -> i64 {
    i64::from(open.nfa)
}

/// Given the CFA address of a found word, produce the cell that compiling
/// a *call* to it should append to the dictionary: the flagged builtin
/// value itself for builtins, or the CFA address for colon definitions.
pub fn compiled_reference(cells: &CellStore, cfa: CellAddr) -> Result<i64, ForthError> {
    let cfa_cell = cells.fetch(cfa)?;
    if opcode::is_builtin_cell(cfa_cell) {
        Ok(cfa_cell)
    } else {
        Ok(i64::from(cfa))
    }
}

/// `forget` — rewind `here`, `s-here`, `context`, and `last` to a snapshot
/// taken before the named target was created.
pub fn mark(cells: &CellStore, strings: &StringStore, context: i64) -> DictMark {
    DictMark {
        here: cells.here,
        s_here: strings.s_here,
        context,
    }
}

/// Find the dictionary mark corresponding to the state *before* `token`
/// was defined, for use by `forget`.
pub fn mark_before(
    cells: &CellStore,
    strings: &StringStore,
    context: i64,
    token: &[u8],
) -> Result<Option<DictMark>, ForthError> {
    if context == 0 {
        return Ok(None);
    }
    let mut nfa = CellAddr(context as usize);
    loop {
        let name_addr = name_addr_of(cells, nfa)?;
        if strings.read_counted(name_addr)? == token {
            let bp_addr = CellAddr(nfa.0 - 1);
            let prev_bp_value = cells.fetch(bp_addr)?;
            let prev_context = if prev_bp_value == 0 {
                0
            } else {
                prev_bp_value + 1
            };
            return Ok(Some(DictMark {
                here: bp_addr.0,
                s_here: name_addr.0,
                context: prev_context,
            }));
        }
        let bp_addr = CellAddr(nfa.0 - 1);
        let prev_bp_value = cells.fetch(bp_addr)?;
        if prev_bp_value == 0 {
            return Ok(None);
        }
        nfa = CellAddr(prev_bp_value as usize + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::BoundsMode;

    fn fresh() -> (CellStore, StringStore) {
        (
            CellStore::new(256, BoundsMode::Guarded),
            StringStore::new(256, true),
        )
    }

    #[test]
    fn find_walks_back_and_shadows() {
        let (mut cells, mut strings) = fresh();
        let mut context = 0i64;

        let open1 = begin_definition(&mut cells, &mut strings, context, b"dup").unwrap();
        context = close_definition(&open1);

        let open2 = begin_definition(&mut cells, &mut strings, context, b"swap").unwrap();
        context = close_definition(&open2);

        // Redefine dup; the newer one should shadow the older.
        let open3 = begin_definition(&mut cells, &mut strings, context, b"dup").unwrap();
        let newer_dup_cfa = open3.cfa;
        context = close_definition(&open3);

        let found = find(&cells, &strings, context, b"dup").unwrap().unwrap();
        assert_eq!(found, newer_dup_cfa);

        let names = walk_names(&cells, &strings, context).unwrap();
        assert_eq!(names, vec!["dup", "swap", "dup"]);
    }

    #[test]
    fn find_on_empty_dictionary_misses() {
        let (cells, strings) = fresh();
        assert!(find(&cells, &strings, 0, b"nope").unwrap().is_none());
    }

    #[test]
    fn forget_mark_rewinds_to_before_target() {
        let (mut cells, mut strings) = fresh();
        let open1 = begin_definition(&mut cells, &mut strings, 0, b"a").unwrap();
        let context1 = close_definition(&open1);
        let mark1 = mark(&cells, &strings, context1);

        let open2 = begin_definition(&mut cells, &mut strings, context1, b"b").unwrap();
        let context2 = close_definition(&open2);

        let recovered = mark_before(&cells, &strings, context2, b"b").unwrap().unwrap();
        assert_eq!(recovered.here, mark1.here);
        assert_eq!(recovered.s_here, mark1.s_here);
        assert_eq!(recovered.context, mark1.context);
    }
}
