//! Terminal capability table.
//!
//! Every control sequence the renderer emits is resolved once into an
//! owned string and cached here.  In batch mode (or any non-terminal
//! output) all capabilities resolve to empty strings, so call sites
//! never branch on mode.

use std::fmt::Write as _;

use crossterm::cursor::{MoveTo, Show};
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::Command;

fn ansi(cmd: impl Command) -> String {
    let mut s = String::new();
    // fmt::Write on String cannot fail
    let _ = cmd.write_ansi(&mut s);
    s
}

/// The cached capability strings shared by all windows.
#[derive(Debug, Clone, Default)]
pub struct TermCaps {
    pub bold: String,
    pub reverse: String,
    /// Exit attribute mode.
    pub norm: String,
    pub clr_eol: String,
    pub clr_eos: String,
    pub clr_scr: String,
    pub home: String,
    pub curs_norm: String,
    pub curs_huge: String,
    /// `norm` plus original color pair; closes any styled span.
    pub caps_off: String,
    /// True when absolute cursor addressing works.
    pub can_goto: bool,
    batch: bool,
}

impl TermCaps {
    pub fn new(batch: bool) -> Self {
        if batch {
            return TermCaps { batch: true, ..Default::default() };
        }
        let norm = ansi(SetAttribute(Attribute::Reset));
        let mut caps_off = norm.clone();
        let _ = write!(caps_off, "{}", ansi(ResetColor));
        TermCaps {
            bold: ansi(SetAttribute(Attribute::Bold)),
            reverse: ansi(SetAttribute(Attribute::Reverse)),
            norm,
            clr_eol: ansi(Clear(ClearType::UntilNewLine)),
            clr_eos: ansi(Clear(ClearType::FromCursorDown)),
            clr_scr: ansi(Clear(ClearType::All)),
            home: ansi(MoveTo(0, 0)),
            curs_norm: ansi(Show),
            curs_huge: ansi(Show),
            caps_off,
            can_goto: true,
            batch: false,
        }
    }

    pub fn is_batch(&self) -> bool {
        self.batch
    }

    /// Absolute cursor move; empty when addressing is unavailable.
    pub fn goto(&self, col: u16, row: u16) -> String {
        if self.can_goto {
            ansi(MoveTo(col, row))
        } else {
            String::new()
        }
    }

    /// Foreground color by classic 0-7 index; empty in batch mode.
    pub fn fg(&self, color: u8) -> String {
        if self.batch {
            String::new()
        } else {
            ansi(SetForegroundColor(Color::AnsiValue(color)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_mode_resolves_everything_empty() {
        let caps = TermCaps::new(true);
        assert!(caps.bold.is_empty());
        assert!(caps.clr_eol.is_empty());
        assert!(caps.caps_off.is_empty());
        assert!(caps.goto(5, 5).is_empty());
        assert!(caps.fg(3).is_empty());
    }

    #[test]
    fn interactive_mode_produces_sequences() {
        let caps = TermCaps::new(false);
        assert!(!caps.bold.is_empty());
        assert!(!caps.clr_eol.is_empty());
        assert!(caps.can_goto);
        assert!(caps.goto(0, 0).starts_with('\x1b'));
    }
}
