//! Frame rendering.
//!
//! Everything is appended to one per-cycle string which the engine
//! writes out in a single syscall.  Styling comes entirely from the
//! pre-resolved capability strings, so batch mode falls out for free:
//! every cap is empty and the frame is plain text.

use unicode_width::UnicodeWidthChar;

use crate::core::fields::FieldContext;
use crate::core::history::{CpuPercents, StateTotals};
use crate::core::window::Window;
use crate::providers::{MemSnapshot, ProcessSnapshot};
use crate::ui::caps::TermCaps;

/// System-wide numbers gathered once per cycle and shared by every
/// window's summary area.
#[derive(Debug, Clone, Default)]
pub struct SummaryData {
    pub uptime_secs: f64,
    pub load: (f64, f64, f64),
    pub totals: StateTotals,
    /// One entry per cpu, aggregate in the final slot.
    pub cpus: Vec<CpuPercents>,
    pub mem: MemSnapshot,
}

pub fn format_uptime(secs: f64) -> String {
    let mins = (secs / 60.0) as u64;
    let days = mins / (60 * 24);
    let hours = (mins / 60) % 24;
    let mm = mins % 60;
    if days > 0 {
        format!("up {days} days, {hours}:{mm:02}")
    } else {
        format!("up {hours}:{mm:02}")
    }
}

/// Longest prefix of `text` no wider than `cols` terminal cells.
pub fn clip(text: &str, cols: usize) -> &str {
    let mut width = 0;
    for (i, ch) in text.char_indices() {
        let cw = ch.width().unwrap_or(0);
        if width + cw > cols {
            return &text[..i];
        }
        width += cw;
    }
    text
}

fn push_line(out: &mut String, style: &str, text: &str, cols: usize, caps: &TermCaps) {
    out.push_str(style);
    out.push_str(clip(text, cols));
    out.push_str(&caps.caps_off);
    out.push_str(&caps.clr_eol);
    out.push('\n');
}

/// Append the summary area for one window, the current one; it is
/// written once per frame regardless of how many windows follow.
/// Returns the lines written.
pub fn summary(
    out: &mut String,
    win: &Window,
    data: &SummaryData,
    caps: &TermCaps,
    cols: usize,
    multi: bool,
) -> usize {
    let mut lines = 0;

    if win.flags.view_loadavg {
        let lead = if multi {
            format!("{} - ", win.group_label)
        } else {
            "rtop - ".to_string()
        };
        let text = format!(
            "{lead}{}, load average: {:.2}, {:.2}, {:.2}",
            format_uptime(data.uptime_secs),
            data.load.0,
            data.load.1,
            data.load.2
        );
        let style = if multi { win.caps.clr_msg.clone() } else { win.caps.clr_sum.clone() };
        push_line(out, &style, &text, cols, caps);
        lines += 1;
    }

    if win.flags.view_states {
        let t = &data.totals;
        let text = format!(
            "Tasks: {:3} total, {:3} running, {:3} sleeping, {:3} stopped, {:3} zombie",
            t.total, t.running, t.sleeping, t.stopped, t.zombie
        );
        push_line(out, &win.caps.clr_sum, &text, cols, caps);
        lines += 1;

        if win.flags.view_cpusum {
            if let Some(p) = data.cpus.last() {
                push_line(out, &win.caps.clr_sum, &cpu_line("Cpu(s):", p), cols, caps);
                lines += 1;
            }
        } else {
            let n = data.cpus.len().saturating_sub(1);
            for (i, p) in data.cpus.iter().take(n).enumerate() {
                push_line(out, &win.caps.clr_sum, &cpu_line(&format!("Cpu{i} :"), p), cols, caps);
                lines += 1;
            }
        }
    }

    if win.flags.view_memory {
        let m = &data.mem;
        push_line(
            out,
            &win.caps.clr_sum,
            &format!(
                "Mem:  {:9}k total, {:9}k used, {:9}k free, {:9}k buffers",
                m.total_kb, m.used_kb, m.free_kb, m.buffers_kb
            ),
            cols,
            caps,
        );
        push_line(
            out,
            &win.caps.clr_sum,
            &format!(
                "Swap: {:9}k total, {:9}k used, {:9}k free, {:9}k cached",
                m.swap_total_kb, m.swap_used_kb, m.swap_free_kb, m.cached_kb
            ),
            cols,
            caps,
        );
        lines += 2;
    }

    lines
}

fn cpu_line(tag: &str, p: &CpuPercents) -> String {
    format!(
        "{tag} {:5.1}% us, {:5.1}% sy, {:5.1}% ni, {:5.1}% id, {:5.1}% wa",
        p.user, p.system, p.nice, p.idle, p.iowait
    )
}

/// True when the window's filters let this task through.
pub fn task_passes(win: &Window, t: &ProcessSnapshot) -> bool {
    if !win.flags.show_idle && matches!(t.state, 'S' | 'Z') {
        return false;
    }
    if let Some(filter) = &win.user_filter {
        let by_name = t.user.as_deref() == Some(filter.as_str());
        let by_uid = filter.parse::<u32>().map(|u| u == t.uid).unwrap_or(false);
        if !by_name && !by_uid {
            return false;
        }
    }
    true
}

/// Append the column header and up to `max_rows` task rows; returns the
/// number of task rows written.  `tasks` must already be sorted.
pub fn window_tasks(
    out: &mut String,
    win: &Window,
    tasks: &[ProcessSnapshot],
    ctx: &FieldContext,
    caps: &TermCaps,
    cols: usize,
    max_rows: usize,
) -> usize {
    let hdr = format!("{:<cols$.cols$}", win.column_header);
    push_line(out, &win.caps.clr_hdr, &hdr, cols, caps);

    let mut written = 0;
    for t in tasks.iter().filter(|t| task_passes(win, t)) {
        if written == max_rows {
            break;
        }
        let base = if win.flags.highlight_rows && t.state == 'R' {
            &win.caps.row_high
        } else {
            &win.caps.row_norm
        };
        out.push_str(base);
        for f in &win.visible_fields {
            let sorted_col = win.flags.highlight_cols && *f == win.sort_field;
            if sorted_col {
                out.push_str(&win.caps.row_high);
            }
            out.push_str(&f.format(t, ctx));
            if sorted_col {
                out.push_str(base);
            }
        }
        out.push_str(&caps.caps_off);
        out.push_str(&caps.clr_eol);
        out.push('\n');
        written += 1;
    }
    written
}
