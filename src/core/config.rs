//! The persisted configuration record (rcfile).
//!
//! A small textual format: one banner line, one line of global state,
//! then three lines per window (identity + field string, flags + sort
//! + cap, the four color indices).  Read best-effort at startup --
//! a missing file means defaults, malformed content is fatal with a
//! descriptive message -- and rewritten verbatim on request.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::fields::{FieldId, FIELD_COUNT};
use crate::core::window::{WinColors, WinFlags, WindowManager, WINDOW_COUNT, WINNAME_MAX};
use crate::error::{Result, RtopError};

const BANNER: &str = "RCfile for \"rtop with windows\"";
const FILE_ID: char = 'a';

/// Persisted per-window record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcWindow {
    pub name: String,
    pub fieldscur: String,
    pub winflags: u32,
    pub sortindx: usize,
    pub maxtasks: usize,
    /// summary, message, header, task color indices.
    pub colors: [u8; 4],
}

/// The whole record: two global toggles, the refresh delay, the
/// current window, and all four window configurations.
#[derive(Debug, Clone, PartialEq)]
pub struct RcFile {
    pub altscr: bool,
    pub irixps: bool,
    pub delay: f32,
    pub curwin: usize,
    pub windows: Vec<RcWindow>,
}

impl RcFile {
    /// `~/.rtoprc`, the session configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".rtoprc"))
    }

    /// Capture the live window state into a persistable record.
    pub fn capture(wins: &WindowManager, delay: f32, irixps: bool) -> Self {
        RcFile {
            altscr: wins.multi,
            irixps,
            delay,
            curwin: wins.current_index(),
            windows: wins
                .iter()
                .map(|w| RcWindow {
                    name: w.name.clone(),
                    fieldscur: w.fieldscur.clone(),
                    winflags: w.flags.to_bits(),
                    sortindx: w.sort_field.index(),
                    maxtasks: w.max_tasks,
                    colors: [w.colors.summary, w.colors.message, w.colors.header, w.colors.task],
                })
                .collect(),
        }
    }

    /// Apply a loaded record onto the window ring.
    pub fn apply(&self, wins: &mut WindowManager) {
        wins.multi = self.altscr;
        for (i, rc) in self.windows.iter().enumerate().take(WINDOW_COUNT) {
            let w = wins.get_mut(i);
            w.rename(&rc.name);
            w.fieldscur = rc.fieldscur.clone();
            w.flags = WinFlags::from_bits(rc.winflags);
            if let Some(f) = FieldId::from_index(rc.sortindx) {
                w.sort_field = f;
            }
            w.max_tasks = rc.maxtasks;
            w.colors = WinColors {
                summary: rc.colors[0],
                message: rc.colors[1],
                header: rc.colors[2],
                task: rc.colors[3],
            };
        }
        wins.select(self.curwin.min(WINDOW_COUNT - 1));
    }

    /// Read the record at `path`; `Ok(None)` when no file exists.
    pub fn load(path: &Path) -> Result<Option<RcFile>> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&text)
            .map(Some)
            .map_err(|e| RtopError::config(format!("bad rcfile '{}': {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }

    /// Serialize to the textual record format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(BANNER);
        out.push('\n');
        out.push_str(&format!(
            "Id:{FILE_ID}, Mode_altscr={}, Mode_irixps={}, Delay_time={:.3}, Curwin={}\n",
            u8::from(self.altscr),
            u8::from(self.irixps),
            self.delay,
            self.curwin
        ));
        for w in &self.windows {
            out.push_str(&format!("{}\tfieldscur={}\n", w.name, w.fieldscur));
            out.push_str(&format!(
                "\twinflags={}, sortindx={}, maxtasks={}\n",
                w.winflags, w.sortindx, w.maxtasks
            ));
            out.push_str(&format!(
                "\tsummclr={}, msgsclr={}, headclr={}, taskclr={}\n",
                w.colors[0], w.colors[1], w.colors[2], w.colors[3]
            ));
        }
        out
    }

    /// Parse the textual record; errors carry a human explanation.
    pub fn parse(text: &str) -> std::result::Result<RcFile, String> {
        let mut lines = text.lines();
        // the banner line carries no data
        lines.next().ok_or("empty file")?;

        let global = lines.next().ok_or("missing global line")?;
        let id = global
            .strip_prefix("Id:")
            .and_then(|s| s.chars().next())
            .ok_or("missing file id")?;
        if id != FILE_ID {
            return Err(format!("unsupported file id '{id}'"));
        }
        let altscr = grab_num(global, "Mode_altscr")? != 0.0;
        let irixps = grab_num(global, "Mode_irixps")? != 0.0;
        let delay = grab_num(global, "Delay_time")? as f32;
        let curwin = grab_num(global, "Curwin")? as usize;
        if delay < 0.0 {
            return Err("negative delay".to_string());
        }
        if curwin >= WINDOW_COUNT {
            return Err(format!("current window {curwin} out of range"));
        }

        let mut windows = Vec::with_capacity(WINDOW_COUNT);
        for n in 0..WINDOW_COUNT {
            let ident = lines.next().ok_or_else(|| format!("missing window {} header", n + 1))?;
            let (name, rest) = ident
                .split_once('\t')
                .ok_or_else(|| format!("window {} header not tab-separated", n + 1))?;
            if name.is_empty() || name.len() > WINNAME_MAX {
                return Err(format!("bad window name '{name}'"));
            }
            let fieldscur = rest
                .strip_prefix("fieldscur=")
                .ok_or("missing fieldscur")?
                .to_string();
            validate_fields(&fieldscur)?;

            let flags_line = lines.next().ok_or("missing winflags line")?;
            let winflags = grab_num(flags_line, "winflags")? as u32;
            let sortindx = grab_num(flags_line, "sortindx")? as usize;
            let maxtasks = grab_num(flags_line, "maxtasks")? as usize;
            if sortindx >= FIELD_COUNT {
                return Err(format!("sort index {sortindx} out of range"));
            }

            let color_line = lines.next().ok_or("missing colors line")?;
            let colors = [
                grab_num(color_line, "summclr")? as u8,
                grab_num(color_line, "msgsclr")? as u8,
                grab_num(color_line, "headclr")? as u8,
                grab_num(color_line, "taskclr")? as u8,
            ];
            if colors.iter().any(|c| *c > 7) {
                return Err("color index out of range".to_string());
            }

            windows.push(RcWindow { name: name.to_string(), fieldscur, winflags, sortindx, maxtasks, colors });
        }

        Ok(RcFile { altscr, irixps, delay, curwin, windows })
    }
}

/// Pull `key=value` out of a comma-separated line.
fn grab_num(line: &str, key: &str) -> std::result::Result<f64, String> {
    for piece in line.split(',') {
        let piece = piece.trim();
        if let Some(v) = piece.strip_prefix(key).and_then(|r| r.strip_prefix('=')) {
            return v
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("bad value for {key}: '{v}'"));
        }
    }
    Err(format!("missing {key}"))
}

/// A field string must mention each of the 26 field letters exactly
/// once, in either case.
fn validate_fields(fields: &str) -> std::result::Result<(), String> {
    if fields.len() != FIELD_COUNT {
        return Err(format!("field string has length {}, want {FIELD_COUNT}", fields.len()));
    }
    let mut seen = [false; FIELD_COUNT];
    for c in fields.chars() {
        match FieldId::from_letter(c) {
            Some(f) if !seen[f.index()] => seen[f.index()] = true,
            Some(_) => return Err(format!("duplicate field letter '{c}'")),
            None => return Err(format!("unknown field letter '{c}'")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_render_parse_round_trips() {
        let mut wins = WindowManager::new();
        wins.multi = true;
        wins.get_mut(2).max_tasks = 12;
        wins.get_mut(1).flags.show_cmdline = true;
        wins.select(3);
        let rc = RcFile::capture(&wins, 2.5, false);
        let parsed = RcFile::parse(&rc.render()).expect("round trip");
        assert_eq!(parsed, rc);
    }

    #[test]
    fn apply_restores_window_state() {
        let mut wins = WindowManager::new();
        wins.get_mut(0).max_tasks = 7;
        wins.get_mut(0).flags.highlight_cols = true;
        wins.get_mut(0).set_sort_field(FieldId::Res);
        let rc = RcFile::capture(&wins, 3.0, true);

        let mut fresh = WindowManager::new();
        rc.apply(&mut fresh);
        assert_eq!(fresh.get(0).max_tasks, 7);
        assert!(fresh.get(0).flags.highlight_cols);
        assert_eq!(fresh.get(0).sort_field, FieldId::Res);
        assert_eq!(fresh.get(0).fieldscur, wins.get(0).fieldscur);
    }

    #[test]
    fn malformed_records_are_rejected_with_reasons() {
        assert!(RcFile::parse("").is_err());

        let rc = RcFile::capture(&WindowManager::new(), 3.0, true);
        let good = rc.render();

        let bad_id = good.replacen("Id:a", "Id:q", 1);
        assert!(RcFile::parse(&bad_id).unwrap_err().contains("file id"));

        let bad_fields = good.replacen("fieldscur=A", "fieldscur=!", 1);
        assert!(RcFile::parse(&bad_fields).is_err());

        let bad_sort = good.replacen("sortindx=10", "sortindx=99", 1);
        assert!(RcFile::parse(&bad_sort).unwrap_err().contains("out of range"));
    }

    #[test]
    fn truncated_file_is_malformed() {
        let rc = RcFile::capture(&WindowManager::new(), 3.0, true);
        let text = rc.render();
        let cut: String = text.lines().take(6).collect::<Vec<_>>().join("\n");
        assert!(RcFile::parse(&cut).is_err());
    }
}
