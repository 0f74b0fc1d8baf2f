//! Keyboard plumbing over the crossterm event stream.
//!
//! Commands are single characters; prompts collect a line with echo,
//! since raw mode leaves echoing to us.

use std::io::Write;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

use crate::error::Result;

/// One decoded input, reduced to what the command loop cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(char),
    Enter,
    Escape,
    Resize(u16, u16),
    /// Ctrl-C.
    Interrupt,
}

/// Wait up to `timeout` for one event; `Ok(None)` means the delay
/// expired quietly and the caller should refresh.
pub fn next_event(timeout: Duration) -> Result<Option<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(k) if k.kind != KeyEventKind::Release => {
            if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
                return Ok(Some(InputEvent::Interrupt));
            }
            Ok(match k.code {
                KeyCode::Char(c) => Some(InputEvent::Key(c)),
                KeyCode::Enter => Some(InputEvent::Enter),
                KeyCode::Esc => Some(InputEvent::Escape),
                _ => None,
            })
        }
        Event::Resize(c, r) => Ok(Some(InputEvent::Resize(c, r))),
        _ => Ok(None),
    }
}

/// Read one line, echoing into `echo`.  `Ok(None)` on escape or
/// interrupt; the returned string is trimmed and may be empty.
pub fn read_line(echo: &mut dyn Write) -> Result<Option<String>> {
    let mut buf = String::new();
    loop {
        match event::read()? {
            Event::Key(k) if k.kind != KeyEventKind::Release => {
                if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
                    return Ok(None);
                }
                match k.code {
                    KeyCode::Enter => return Ok(Some(buf.trim().to_string())),
                    KeyCode::Esc => return Ok(None),
                    KeyCode::Backspace => {
                        if buf.pop().is_some() {
                            echo.write_all(b"\x08 \x08")?;
                            echo.flush()?;
                        }
                    }
                    KeyCode::Char(c) if !c.is_control() => {
                        buf.push(c);
                        let mut bytes = [0u8; 4];
                        echo.write_all(c.encode_utf8(&mut bytes).as_bytes())?;
                        echo.flush()?;
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}
