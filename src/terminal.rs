//! Raw-mode acquisition/release and non-blocking key polling.
//!
//! spec.md §1 names `raw-mode-on`/`raw-mode-off`/`key?` as external
//! primitives; `crossterm` is the concrete collaborator this crate wires
//! them to. Raw mode is a scoped acquisition (spec.md §5): `abort`
//! unconditionally restores cooked mode before re-prompting, matching
//! `force_cooked` below.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode};

pub struct Terminal {
    raw: bool,
}

impl Terminal {
    pub fn new() -> Terminal {
        Terminal { raw: false }
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn enable_raw(&mut self) -> std::io::Result<()> {
        if !self.raw {
            crossterm::terminal::enable_raw_mode()?;
            self.raw = true;
        }
        Ok(())
    }

    pub fn disable_raw(&mut self) -> std::io::Result<()> {
        if self.raw {
            crossterm::terminal::disable_raw_mode()?;
            self.raw = false;
        }
        Ok(())
    }

    /// Unconditional restore used by `abort`; swallows errors since we may
    /// already be mid-unwind with no usable terminal.
    pub fn force_cooked(&mut self) {
        if self.raw {
            let _ = crossterm::terminal::disable_raw_mode();
            self.raw = false;
        }
    }

    /// Non-blocking poll used by the line editor to probe for escape
    /// sequence continuations (spec.md §5). Returns `true` if a key is
    /// available within a short window.
    pub fn key_ready(&self) -> std::io::Result<bool> {
        event::poll(Duration::from_millis(1))
    }

    /// Blocking single-byte read, used by `key`. Only meaningful in raw
    /// mode; outside raw mode falls back to reading a byte from stdin.
    pub fn read_key(&self) -> std::io::Result<u8> {
        if self.raw {
            loop {
                if let Event::Key(k) = event::read()? {
                    match k.code {
                        KeyCode::Char(c) => return Ok(c as u8),
                        KeyCode::Enter => return Ok(b'\r'),
                        KeyCode::Esc => return Ok(0x1b),
                        KeyCode::Backspace => return Ok(0x08),
                        KeyCode::Tab => return Ok(b'\t'),
                        _ => continue,
                    }
                }
            }
        } else {
            use std::io::Read;
            let mut buf = [0u8; 1];
            std::io::stdin().read_exact(&mut buf)?;
            Ok(buf[0])
        }
    }
}

impl Default for Terminal {
    fn default() -> Terminal {
        Terminal::new()
    }
}
