//! ## What is this?
//!
//! This crate implements the CORE of a minimal Forth system: an
//! indirect-threaded virtual machine together with its incremental
//! compiler/dictionary and its outer interpreter. The library bootstrap
//! (print formatting, dump/debug helpers, a line editor, higher-level
//! control words) is expected to be loaded as Forth *source* at startup,
//! the way a traditional Forth system loads its own high-level words once
//! the primitive core is running.
//!
//! ## Data model
//!
//! Everything the running system touches lives in one contiguous array of
//! signed 64-bit integers, the Cell Store ([`crate::cells::CellStore`]):
//! the three text buffers (TIB/PAD/TMP), the data stack, the return stack,
//! and the dictionary itself. A second byte array, the String Store
//! ([`crate::strings::StringStore`]), holds counted strings: name fields
//! and string literals.
//!
//! ## Dictionary entry layout
//!
//! ```text
//! [ BP ][ NFA ][ CFA ][ params... ]
//! ```
//!
//! | Offset | Field | Content |
//! |---|---|---|
//! | 0 | Back pointer | Address of the previous word's own BP cell, or 0 |
//! | 1 | Name field | String Store address of the counted name; bit 62 is the immediate flag |
//! | 2 | Code field | `DEFINITION` opcode, or `BUILTIN_FLAG \| index` for a builtin |
//! | 3.. | Parameters | Opcode-specific |
//!
//! ## Opcodes
//!
//! Reserved integer range 100000–100012 (`crate::opcode`):
//!
//! | Value | Name | Effect |
//! |---|---|---|
//! | 100001 | `VARIABLE` | push address of payload cell, return |
//! | 100002 | `CONSTANT` | push value of payload cell, return |
//! | 100003 | `LITERAL` | push next cell, advance PC past it |
//! | 100004 | `STRLIT` | push next cell (a string address), advance PC |
//! | 100005 | `DEFINITION` | begin threaded execution of following cells |
//! | 100006 | `BRANCH` | PC += signed offset cell |
//! | 100007 | `BRANCH0` | if top of stack is 0 (consumed), PC += offset |
//! | 100008 | `ABORT` | clear data stack, return to outer interpreter |
//! | 100009 | `EXIT` | pop return stack into PC (compiled by `exit`) |
//! | 100010 | `BREAK` | pop return stack into PC (compiled by `;`) |
//! | 100011 | `EXEC` | pop CFA from data stack, enter it |
//! | 100012 | `ARRAY` | like `VARIABLE`, with a length header |
//!
//! A cell is a builtin reference iff its top flag bit (`BUILTIN_FLAG`,
//! bit 61) is set; otherwise it is a raw value or one of the opcodes
//! above. This crate resolves the two opcode-numbering inconsistencies
//! noted in the source material by fixing `EXEC = 100011` and
//! `ARRAY = 100012`.
//!
//! ## Outer interpreter
//!
//! `quit` prints `" ok "`, reads a line into the TIB via `query`, and
//! calls `eval`. `eval` extracts blank-delimited tokens; in interpret mode
//! it executes a found word or converts a number; in compile mode it
//! compiles a found word's reference (executing it immediately if it is
//! marked immediate) or compiles a number as a literal. Unknown tokens
//! abort the line.
