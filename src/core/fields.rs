//! The field catalog: every selectable column, its header text, its
//! formatting rule and its comparator.
//!
//! The catalog is fixed and shared; a window refers to fields by the
//! letter position of a `FieldId` in its field-group string (uppercase
//! letter = displayed, lowercase = configured but hidden).

use std::cmp::Ordering;

use unicode_width::UnicodeWidthChar;

use crate::providers::ProcessSnapshot;

/// Closed set of selectable columns, one letter each (`a`..`z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(usize)]
pub enum FieldId {
    Pid,
    Ppid,
    Pgid,
    Uid,
    User,
    Group,
    Tty,
    Priority,
    Nice,
    LastCpu,
    CpuPct,
    Time,
    TimePlus,
    MemPct,
    Virt,
    Swap,
    Res,
    Code,
    Data,
    Shared,
    MajFlt,
    Dirty,
    State,
    Command,
    Wchan,
    Flags,
}

/// How a column's raw number is scaled to fit its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    /// Formatted directly by the field's own rule.
    None,
    /// A kilobyte count, auto-scaled upward (k -> m -> g).
    Kb,
    /// A plain count, auto-scaled upward from bytes.
    Num,
    /// A tick count, rendered as elapsed time.
    Ticks,
}

/// Immutable description of one column.
#[derive(Debug)]
pub struct FieldDescriptor {
    /// Header text; its length fixes the column width (incl. the
    /// separating space).
    pub header: &'static str,
    /// Data width (header length minus the trailing separator).
    pub width: usize,
    pub scale: ScaleKind,
    pub desc: &'static str,
}

pub const FIELD_COUNT: usize = 26;

static CATALOG: [FieldDescriptor; FIELD_COUNT] = [
    FieldDescriptor { header: "  PID ", width: 5, scale: ScaleKind::None, desc: "Process Id" },
    FieldDescriptor { header: " PPID ", width: 5, scale: ScaleKind::None, desc: "Parent Process Pid" },
    FieldDescriptor { header: " PGID ", width: 5, scale: ScaleKind::None, desc: "Process Group Id" },
    FieldDescriptor { header: " UID ", width: 4, scale: ScaleKind::None, desc: "User Id" },
    FieldDescriptor { header: "USER     ", width: 8, scale: ScaleKind::None, desc: "User Name" },
    FieldDescriptor { header: "GROUP    ", width: 8, scale: ScaleKind::None, desc: "Group Name" },
    FieldDescriptor { header: "TTY      ", width: 8, scale: ScaleKind::None, desc: "Controlling Tty" },
    FieldDescriptor { header: " PR ", width: 3, scale: ScaleKind::None, desc: "Priority" },
    FieldDescriptor { header: " NI ", width: 3, scale: ScaleKind::None, desc: "Nice value" },
    FieldDescriptor { header: "#C ", width: 2, scale: ScaleKind::None, desc: "Last used cpu (SMP)" },
    FieldDescriptor { header: "%CPU ", width: 4, scale: ScaleKind::None, desc: "CPU usage" },
    FieldDescriptor { header: "  TIME ", width: 6, scale: ScaleKind::Ticks, desc: "CPU Time" },
    FieldDescriptor { header: "   TIME+  ", width: 9, scale: ScaleKind::Ticks, desc: "CPU Time, hundredths" },
    FieldDescriptor { header: "%MEM ", width: 4, scale: ScaleKind::None, desc: "Memory usage (RES)" },
    FieldDescriptor { header: " VIRT ", width: 5, scale: ScaleKind::Kb, desc: "Virtual Image (kb)" },
    FieldDescriptor { header: "SWAP ", width: 4, scale: ScaleKind::Kb, desc: "Swapped size (kb)" },
    FieldDescriptor { header: " RES ", width: 4, scale: ScaleKind::Kb, desc: "Resident size (kb)" },
    FieldDescriptor { header: "CODE ", width: 4, scale: ScaleKind::Kb, desc: "Code size (kb)" },
    FieldDescriptor { header: "DATA ", width: 4, scale: ScaleKind::Kb, desc: "Data+Stack size (kb)" },
    FieldDescriptor { header: " SHR ", width: 4, scale: ScaleKind::Kb, desc: "Shared Mem size (kb)" },
    FieldDescriptor { header: "nFLT ", width: 4, scale: ScaleKind::Num, desc: "Page Fault count" },
    FieldDescriptor { header: "nDRT ", width: 4, scale: ScaleKind::Num, desc: "Dirty Pages count" },
    FieldDescriptor { header: "S ", width: 1, scale: ScaleKind::None, desc: "Process Status" },
    FieldDescriptor { header: "Command ", width: 7, scale: ScaleKind::None, desc: "Command line/name" },
    FieldDescriptor { header: "WCHAN     ", width: 9, scale: ScaleKind::None, desc: "Sleeping in Function" },
    FieldDescriptor { header: "Flags    ", width: 8, scale: ScaleKind::None, desc: "Task Flags <sched.h>" },
];

/// Everything the formatters and comparators need beyond the snapshot
/// itself.  Assembled once per frame by the engine.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext {
    /// Page size in kilobytes (statm counters are in pages).
    pub page_kb: u64,
    /// Clock ticks per second.
    pub hertz: u64,
    /// %CPU per elapsed tick for this frame.
    pub tscale: f32,
    /// System memory total, kb, for the %MEM column.
    pub mem_total_kb: u64,
    /// Include child times in the TIME columns and comparator.
    pub cumulative: bool,
    /// Prefer the argument vector over the bare name.
    pub cmdline: bool,
    /// Display width of the command column.
    pub max_cmd_len: usize,
}

impl Default for FieldContext {
    fn default() -> Self {
        Self {
            page_kb: 4,
            hertz: 100,
            tscale: 0.0,
            mem_total_kb: 1,
            cumulative: false,
            cmdline: false,
            max_cmd_len: 64,
        }
    }
}

impl FieldId {
    pub const ALL: [FieldId; FIELD_COUNT] = [
        FieldId::Pid,
        FieldId::Ppid,
        FieldId::Pgid,
        FieldId::Uid,
        FieldId::User,
        FieldId::Group,
        FieldId::Tty,
        FieldId::Priority,
        FieldId::Nice,
        FieldId::LastCpu,
        FieldId::CpuPct,
        FieldId::Time,
        FieldId::TimePlus,
        FieldId::MemPct,
        FieldId::Virt,
        FieldId::Swap,
        FieldId::Res,
        FieldId::Code,
        FieldId::Data,
        FieldId::Shared,
        FieldId::MajFlt,
        FieldId::Dirty,
        FieldId::State,
        FieldId::Command,
        FieldId::Wchan,
        FieldId::Flags,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<FieldId> {
        FieldId::ALL.get(i).copied()
    }

    /// Lowercase letter identifying this field in a field-group string.
    pub fn letter(self) -> char {
        (b'a' + self.index() as u8) as char
    }

    pub fn from_letter(c: char) -> Option<FieldId> {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() {
            FieldId::from_index((c as u8 - b'a') as usize)
        } else {
            None
        }
    }

    pub fn descriptor(self) -> &'static FieldDescriptor {
        &CATALOG[self.index()]
    }

    /// Format one cell, trailing separator included.  The result is
    /// exactly as wide as the column header (the command column grows
    /// to `ctx.max_cmd_len`).
    pub fn format(self, t: &ProcessSnapshot, ctx: &FieldContext) -> String {
        let d = self.descriptor();
        let w = d.width;
        match self {
            FieldId::Pid => format!("{:>w$} ", t.pid),
            FieldId::Ppid => format!("{:>w$} ", t.ppid),
            FieldId::Pgid => format!("{:>w$} ", t.pgrp),
            FieldId::Uid => format!("{:>w$} ", t.uid),
            FieldId::User => format!("{:<w$.w$} ", t.user.as_deref().unwrap_or("?")),
            FieldId::Group => format!("{:<w$.w$} ", t.group.as_deref().unwrap_or("?")),
            FieldId::Tty => format!("{:<w$.w$} ", tty_name(t.tty_nr)),
            FieldId::Priority => format!("{:>w$} ", t.priority.clamp(-99, 99)),
            FieldId::Nice => format!("{:>w$} ", t.nice),
            FieldId::LastCpu => format!("{:>w$} ", t.processor),
            FieldId::CpuPct => {
                let pct = (t.elapsed_ticks as f32 * ctx.tscale).min(99.9);
                format!("{pct:>w$.1} ")
            }
            FieldId::Time | FieldId::TimePlus => {
                let mut ticks = t.utime + t.stime;
                if ctx.cumulative {
                    ticks += t.cutime + t.cstime;
                }
                format!("{:>w$} ", scale_tics(ticks, w, ctx.hertz))
            }
            FieldId::MemPct => {
                let kb = t.resident_pages * ctx.page_kb;
                let pct = (kb as f32 * 100.0 / ctx.mem_total_kb.max(1) as f32).min(99.9);
                format!("{pct:>w$.1} ")
            }
            FieldId::Virt => scaled_kb(t.size_pages, w, ctx),
            FieldId::Swap => scaled_kb(t.size_pages.saturating_sub(t.resident_pages), w, ctx),
            FieldId::Res => scaled_kb(t.resident_pages, w, ctx),
            FieldId::Code => scaled_kb(t.text_pages, w, ctx),
            FieldId::Data => scaled_kb(t.data_pages, w, ctx),
            FieldId::Shared => scaled_kb(t.shared_pages, w, ctx),
            FieldId::MajFlt => format!("{:>w$} ", scale_num(t.maj_flt, w, ScaleKind::Num)),
            FieldId::Dirty => format!("{:>w$} ", scale_num(t.dirty_pages, w, ScaleKind::Num)),
            FieldId::State => format!("{} ", t.state),
            FieldId::Command => {
                let cw = ctx.max_cmd_len;
                format!("{:<cw$.cw$} ", command_text(t, ctx))
            }
            FieldId::Wchan => format!("{:<w$.w$} ", t.wchan.as_deref().unwrap_or("-")),
            FieldId::Flags => {
                // zeroes shown as dots, as the header's width suggests
                let hex = format!("{:08x}", t.flags);
                format!("{:>w$} ", hex.replace('0', "."))
            }
        }
    }

    /// Natural (ascending) ordering for this column.  The engine
    /// applies the window's direction flag on top; default display
    /// order is the reverse of this (largest first).
    pub fn compare(self, a: &ProcessSnapshot, b: &ProcessSnapshot, ctx: &FieldContext) -> Ordering {
        match self {
            FieldId::Pid => a.pid.cmp(&b.pid),
            FieldId::Ppid => a.ppid.cmp(&b.ppid),
            FieldId::Pgid => a.pgrp.cmp(&b.pgrp),
            FieldId::Uid => a.uid.cmp(&b.uid),
            FieldId::User => a.user.cmp(&b.user),
            FieldId::Group => a.group.cmp(&b.group),
            FieldId::Tty => a.tty_nr.cmp(&b.tty_nr),
            FieldId::Priority => a.priority.cmp(&b.priority),
            FieldId::Nice => a.nice.cmp(&b.nice),
            FieldId::LastCpu => a.processor.cmp(&b.processor),
            FieldId::CpuPct => a.elapsed_ticks.cmp(&b.elapsed_ticks),
            FieldId::Time | FieldId::TimePlus => {
                cmp_ticks(a, ctx.cumulative).cmp(&cmp_ticks(b, ctx.cumulative))
            }
            FieldId::MemPct | FieldId::Res => a.resident_pages.cmp(&b.resident_pages),
            FieldId::Virt => a.size_pages.cmp(&b.size_pages),
            FieldId::Swap => {
                let sa = a.size_pages.saturating_sub(a.resident_pages);
                let sb = b.size_pages.saturating_sub(b.resident_pages);
                sa.cmp(&sb)
            }
            FieldId::Code => a.text_pages.cmp(&b.text_pages),
            FieldId::Data => a.data_pages.cmp(&b.data_pages),
            FieldId::Shared => a.shared_pages.cmp(&b.shared_pages),
            FieldId::MajFlt => a.maj_flt.cmp(&b.maj_flt),
            FieldId::Dirty => a.dirty_pages.cmp(&b.dirty_pages),
            FieldId::State => a.state.cmp(&b.state),
            FieldId::Command => cmp_command(a, b, ctx),
            FieldId::Wchan => a.wchan.cmp(&b.wchan),
            FieldId::Flags => a.flags.cmp(&b.flags),
        }
    }
}

fn cmp_ticks(t: &ProcessSnapshot, cumulative: bool) -> u64 {
    let mut ticks = t.utime + t.stime;
    if cumulative {
        ticks += t.cutime + t.cstime;
    }
    ticks
}

/// The command comparator mirrors what the command column displays:
/// with the cmdline toggle on, tasks carrying an argument vector rank
/// against each other by that text while bare-named (kernel) tasks
/// collect behind them; otherwise everything compares by bare name.
fn cmp_command(a: &ProcessSnapshot, b: &ProcessSnapshot, ctx: &FieldContext) -> Ordering {
    if ctx.cmdline && (a.cmdline.is_some() || b.cmdline.is_some()) {
        return match (&a.cmdline, &b.cmdline) {
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            _ => {
                let ta = command_text(a, ctx);
                let tb = command_text(b, ctx);
                ta.cmp(&tb)
            }
        };
    }
    a.name.cmp(&b.name)
}

/// Text shown in the command column: joined argv (control bytes
/// normalized to spaces) truncated to the column width, or the bare
/// name in brackets when no argument vector exists.
pub fn command_text(t: &ProcessSnapshot, ctx: &FieldContext) -> String {
    if ctx.cmdline {
        if let Some(args) = &t.cmdline {
            let mut joined = String::new();
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    joined.push(' ');
                }
                for ch in arg.chars() {
                    joined.push(if ch.is_control() { ' ' } else { ch });
                }
                if joined.len() > ctx.max_cmd_len {
                    break;
                }
            }
            truncate_display(&mut joined, ctx.max_cmd_len);
            return joined;
        }
        return format!("[{}]", t.name);
    }
    t.name.clone()
}

/// Trim to at most `cols` terminal cells, never splitting a character.
fn truncate_display(s: &mut String, cols: usize) {
    let mut width = 0;
    for (i, ch) in s.char_indices() {
        let cw = ch.width().unwrap_or(0);
        if width + cw > cols {
            s.truncate(i);
            return;
        }
        width += cw;
    }
}

fn scaled_kb(pages: u64, width: usize, ctx: &FieldContext) -> String {
    format!("{:>width$} ", scale_num(pages * ctx.page_kb, width, ScaleKind::Kb))
}

/// Fit a number into `width` columns, scaling upward only as far as
/// needed.  `kind` names the unit the number arrives in: kilobytes
/// advance through m and g, raw counts start at k.
pub fn scale_num(num: u64, width: usize, kind: ScaleKind) -> String {
    let tag: &[char] = match kind {
        ScaleKind::Kb => &['m', 'g'],
        _ => &['k', 'm', 'g'],
    };
    let plain = format!("{num}");
    if plain.len() <= width {
        return plain;
    }
    let mut val = num as f64;
    for unit in tag {
        val /= 1024.0;
        let dec = format!("{val:.1}{unit}");
        if dec.len() <= width {
            return dec;
        }
        let int = format!("{}{unit}", val as u64);
        if int.len() <= width {
            return int;
        }
    }
    "?".to_string()
}

/// Fit a tick count into `width` columns as elapsed time, degrading
/// from mm:ss.cc through mm:ss, hours, days and weeks.
pub fn scale_tics(tics: u64, width: usize, hertz: u64) -> String {
    let hertz = hertz.max(1);
    let cs = (tics * 100 / hertz) % 100;
    let mut t = tics / hertz;
    let full = format!("{}:{:02}.{:02}", t / 60, t % 60, cs);
    if full.len() <= width {
        return full;
    }
    let ss = t % 60;
    t /= 60;
    let mmss = format!("{t}:{ss:02}");
    if mmss.len() <= width {
        return mmss;
    }
    t /= 60;
    let hh = format!("{t}h");
    if hh.len() <= width {
        return hh;
    }
    t /= 24;
    let dd = format!("{t}d");
    if dd.len() <= width {
        return dd;
    }
    t /= 7;
    let ww = format!("{t}w");
    if ww.len() <= width {
        return ww;
    }
    "?".to_string()
}

/// Best-effort controlling-terminal name from the stat tty number.
pub fn tty_name(tty_nr: i32) -> String {
    if tty_nr <= 0 {
        return "?".to_string();
    }
    let major = (tty_nr >> 8) & 0xfff;
    let minor = (tty_nr & 0xff) | ((tty_nr >> 12) & 0xfff00);
    match major {
        4 => format!("tty{minor}"),
        136..=143 => format!("pts/{}", minor + ((major - 136) << 20)),
        _ => "?".to_string(),
    }
}
