//! Windows (field groups): four independently configured column
//! layouts arranged in a fixed ring, exactly one of which is current.

use crate::core::fields::FieldId;
use crate::ui::caps::TermCaps;

pub const WINDOW_COUNT: usize = 4;
pub const WINNAME_MAX: usize = 3;

/// Default field-group strings; uppercase letters are the displayed
/// columns, lowercase are configured but hidden.
pub const DEF_FIELDS: &str = "AEHIOQTWKNMbcdfgjplrsuvyzX";
pub const JOB_FIELDS: &str = "ABcefgjlrstuvyzMKNHIWOPQDX";
pub const MEM_FIELDS: &str = "ANOPQRSTUVbcdefgjlmyzWHIKX";
pub const USR_FIELDS: &str = "EFGABHIOQTWjcnmlkdprsuvyzX";

/// Per-window display flags.  Persisted in the rcfile as a bitmask,
/// so the bit assignments below are part of the record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinFlags {
    pub show_colors: bool,
    pub highlight_bold: bool,
    pub highlight_cols: bool,
    pub highlight_rows: bool,
    pub show_idle: bool,
    pub show_cmdline: bool,
    pub show_ctimes: bool,
    pub sort_descending: bool,
    pub view_cpusum: bool,
    pub view_loadavg: bool,
    pub view_states: bool,
    pub view_memory: bool,
    pub visible: bool,
}

const F_COLORS: u32 = 1;
const F_HIBOLD: u32 = 1 << 1;
const F_HICOLS: u32 = 1 << 2;
const F_HIROWS: u32 = 1 << 3;
const F_IDLE: u32 = 1 << 4;
const F_CMDLINE: u32 = 1 << 5;
const F_CTIMES: u32 = 1 << 6;
const F_DESCEND: u32 = 1 << 7;
const F_CPUSUM: u32 = 1 << 8;
const F_LOADAVG: u32 = 1 << 9;
const F_STATES: u32 = 1 << 10;
const F_MEMORY: u32 = 1 << 11;
const F_VISIBLE: u32 = 1 << 12;

impl Default for WinFlags {
    fn default() -> Self {
        WinFlags {
            show_colors: false,
            highlight_bold: false,
            highlight_cols: false,
            highlight_rows: true,
            show_idle: true,
            show_cmdline: false,
            show_ctimes: false,
            sort_descending: true,
            view_cpusum: true,
            view_loadavg: true,
            view_states: true,
            view_memory: true,
            visible: true,
        }
    }
}

impl WinFlags {
    pub fn to_bits(self) -> u32 {
        let mut bits = 0;
        let mut put = |on: bool, bit: u32| {
            if on {
                bits |= bit;
            }
        };
        put(self.show_colors, F_COLORS);
        put(self.highlight_bold, F_HIBOLD);
        put(self.highlight_cols, F_HICOLS);
        put(self.highlight_rows, F_HIROWS);
        put(self.show_idle, F_IDLE);
        put(self.show_cmdline, F_CMDLINE);
        put(self.show_ctimes, F_CTIMES);
        put(self.sort_descending, F_DESCEND);
        put(self.view_cpusum, F_CPUSUM);
        put(self.view_loadavg, F_LOADAVG);
        put(self.view_states, F_STATES);
        put(self.view_memory, F_MEMORY);
        put(self.visible, F_VISIBLE);
        bits
    }

    pub fn from_bits(bits: u32) -> Self {
        WinFlags {
            show_colors: bits & F_COLORS != 0,
            highlight_bold: bits & F_HIBOLD != 0,
            highlight_cols: bits & F_HICOLS != 0,
            highlight_rows: bits & F_HIROWS != 0,
            show_idle: bits & F_IDLE != 0,
            show_cmdline: bits & F_CMDLINE != 0,
            show_ctimes: bits & F_CTIMES != 0,
            sort_descending: bits & F_DESCEND != 0,
            view_cpusum: bits & F_CPUSUM != 0,
            view_loadavg: bits & F_LOADAVG != 0,
            view_states: bits & F_STATES != 0,
            view_memory: bits & F_MEMORY != 0,
            visible: bits & F_VISIBLE != 0,
        }
    }
}

/// The four configurable color indices (classic 0-7 terminal colors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinColors {
    pub summary: u8,
    pub message: u8,
    pub header: u8,
    pub task: u8,
}

/// Capability strings derived from a window's colors and flags,
/// rebuilt whenever either changes.
#[derive(Debug, Clone, Default)]
pub struct WinCaps {
    pub clr_sum: String,
    pub clr_msg: String,
    pub clr_pmt: String,
    pub clr_hdr: String,
    pub row_norm: String,
    pub row_high: String,
}

/// One field group.  Never destroyed during a session; mutated only by
/// command handling and derived-state recomputation.
#[derive(Debug, Clone)]
pub struct Window {
    pub num: usize,
    pub name: String,
    /// "N:name", shown in summary and prompts.
    pub group_label: String,
    /// One letter per field; case encodes displayed/hidden.
    pub fieldscur: String,
    pub sort_field: FieldId,
    pub flags: WinFlags,
    /// 0 = unlimited.
    pub max_tasks: usize,
    /// Only rows whose owner matches are rendered, when set.
    pub user_filter: Option<String>,
    pub colors: WinColors,
    // derived, via rebuild()
    pub visible_fields: Vec<FieldId>,
    pub column_header: String,
    pub max_cmd_len: usize,
    pub caps: WinCaps,
}

impl Window {
    fn new(num: usize, name: &str, fields: &str, sort: FieldId, colors: WinColors) -> Self {
        let mut w = Window {
            num,
            name: String::new(),
            group_label: String::new(),
            fieldscur: fields.to_string(),
            sort_field: sort,
            flags: WinFlags::default(),
            max_tasks: 0,
            user_filter: None,
            colors,
            visible_fields: Vec::new(),
            column_header: String::new(),
            max_cmd_len: 0,
            caps: WinCaps::default(),
        };
        w.rename(name);
        w
    }

    pub fn rename(&mut self, name: &str) {
        let name: String = name.chars().take(WINNAME_MAX).collect();
        self.group_label = format!("{}:{}", self.num, name);
        self.name = name;
    }

    /// True only for fields that survived header truncation; a field
    /// may be configured visible yet pushed out by width pressure.
    pub fn field_visible(&self, field: FieldId) -> bool {
        self.visible_fields.contains(&field)
    }

    /// Toggle one field between displayed and hidden.
    pub fn toggle_field(&mut self, field: FieldId) {
        let upper = field.letter().to_ascii_uppercase();
        let lower = field.letter();
        self.fieldscur = self
            .fieldscur
            .chars()
            .map(|c| {
                if c == upper {
                    lower
                } else if c == lower {
                    upper
                } else {
                    c
                }
            })
            .collect();
    }

    /// Move a field one position toward the front (`promote`) or back.
    pub fn reorder_field(&mut self, field: FieldId, promote: bool) {
        let mut chars: Vec<char> = self.fieldscur.chars().collect();
        let pos = chars
            .iter()
            .position(|c| c.to_ascii_lowercase() == field.letter());
        if let Some(i) = pos {
            let j = if promote { i.wrapping_sub(1) } else { i + 1 };
            if j < chars.len() {
                chars.swap(i, j);
                self.fieldscur = chars.into_iter().collect();
            }
        }
    }

    /// Make the sort field displayed (uppercase) and select it.
    pub fn set_sort_field(&mut self, field: FieldId) {
        self.sort_field = field;
        let upper = field.letter().to_ascii_uppercase();
        let lower = field.letter();
        self.fieldscur = self
            .fieldscur
            .chars()
            .map(|c| if c == lower { upper } else { c })
            .collect();
    }

    /// Move the sort selection to the adjacent displayed column.
    pub fn shift_sort(&mut self, left: bool) {
        if let Some(i) = self.visible_fields.iter().position(|f| *f == self.sort_field) {
            let j = if left { i.wrapping_sub(1) } else { i + 1 };
            if let Some(f) = self.visible_fields.get(j) {
                self.sort_field = *f;
            }
        }
    }

    /// Recompute the derived column state for the given screen width.
    ///
    /// Fields are included in configured order until appending the
    /// next header would exceed the width; that field and everything
    /// after it are excluded whole (a header is never cut mid-text).
    pub fn rebuild_columns(&mut self, screen_cols: usize, multi: bool) {
        self.visible_fields = self
            .fieldscur
            .chars()
            .filter(|c| c.is_ascii_uppercase())
            .filter_map(FieldId::from_letter)
            .collect();

        let lead = usize::from(multi);
        let mut len = lead;
        let mut keep = 0;
        for f in &self.visible_fields {
            let h = f.descriptor().header;
            if len + h.len() > screen_cols {
                break;
            }
            len += h.len();
            keep += 1;
        }
        self.visible_fields.truncate(keep);

        let cmd_hdr = FieldId::Command.descriptor().header.len();
        // what's left of the screen after every fixed-width column;
        // meaningless unless Command made the cut, harmless otherwise
        self.max_cmd_len = screen_cols
            .saturating_sub(len.saturating_sub(cmd_hdr))
            .saturating_sub(1);

        let mut hdr = if multi { self.num.to_string() } else { String::new() };
        for f in &self.visible_fields {
            if *f == FieldId::Command {
                let cw = self.max_cmd_len;
                hdr.push_str(&format!("{:<cw$.cw$} ", "Command"));
            } else {
                hdr.push_str(f.descriptor().header);
            }
        }
        self.column_header = hdr;
    }

    /// Rebuild the window's capability strings from the shared table.
    pub fn rebuild_caps(&mut self, caps: &TermCaps) {
        if caps.is_batch() {
            self.caps = WinCaps::default();
            return;
        }
        if self.flags.show_colors {
            self.caps.clr_sum = caps.fg(self.colors.summary);
            self.caps.clr_msg = format!("{}{}", caps.fg(self.colors.message), caps.reverse);
            self.caps.clr_pmt = format!("{}{}", caps.fg(self.colors.message), caps.bold);
            self.caps.clr_hdr = format!("{}{}", caps.fg(self.colors.header), caps.reverse);
            self.caps.row_norm = format!("{}{}", caps.caps_off, caps.fg(self.colors.task));
        } else {
            self.caps.clr_sum = String::new();
            self.caps.clr_msg = caps.reverse.clone();
            self.caps.clr_pmt = caps.bold.clone();
            self.caps.clr_hdr = caps.reverse.clone();
            self.caps.row_norm = caps.norm.clone();
        }
        let emphasis = if self.flags.highlight_bold { &caps.bold } else { &caps.reverse };
        self.caps.row_high = format!("{}{}", self.caps.row_norm, emphasis);
    }
}

/// The fixed ring of windows plus the multi-window toggle.
#[derive(Debug)]
pub struct WindowManager {
    windows: [Window; WINDOW_COUNT],
    current: usize,
    /// Alternate display mode: several windows share the screen.
    pub multi: bool,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager {
    pub fn new() -> Self {
        // red/cyan/magenta/yellow summaries
        let windows = [
            Window::new(1, "Def", DEF_FIELDS, FieldId::CpuPct,
                WinColors { summary: 1, message: 1, header: 3, task: 1 }),
            Window::new(2, "Job", JOB_FIELDS, FieldId::Pid,
                WinColors { summary: 6, message: 6, header: 7, task: 6 }),
            Window::new(3, "Mem", MEM_FIELDS, FieldId::MemPct,
                WinColors { summary: 5, message: 5, header: 4, task: 5 }),
            Window::new(4, "Usr", USR_FIELDS, FieldId::User,
                WinColors { summary: 3, message: 3, header: 2, task: 3 }),
        ];
        WindowManager { windows, current: 0, multi: false }
    }

    pub fn current(&self) -> &Window {
        &self.windows[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Window {
        &mut self.windows[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn get(&self, i: usize) -> &Window {
        &self.windows[i]
    }

    pub fn get_mut(&mut self, i: usize) -> &mut Window {
        &mut self.windows[i]
    }

    pub fn select(&mut self, i: usize) {
        if i < WINDOW_COUNT {
            self.current = i;
        }
    }

    pub fn next(&mut self) {
        self.current = (self.current + 1) % WINDOW_COUNT;
    }

    pub fn prev(&mut self) {
        self.current = (self.current + WINDOW_COUNT - 1) % WINDOW_COUNT;
    }

    /// Rebuild every window's derived column state, after a resize or
    /// any field/flag mutation.
    pub fn rebuild_all(&mut self, screen_cols: usize, caps: &TermCaps) {
        let multi = self.multi;
        for w in &mut self.windows {
            w.rebuild_columns(screen_cols, multi);
            w.rebuild_caps(caps);
        }
    }

    /// Reset every window to balanced defaults: no task cap, idle
    /// tasks shown, task area visible.
    pub fn equalize(&mut self) {
        for w in &mut self.windows {
            w.max_tasks = 0;
            w.flags.show_idle = true;
            w.flags.visible = true;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Window> {
        self.windows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ring_has_four_named_windows() {
        let wm = WindowManager::new();
        let names: Vec<&str> = wm.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, ["Def", "Job", "Mem", "Usr"]);
        assert_eq!(wm.current().group_label, "1:Def");
    }

    #[test]
    fn ring_wraps_both_directions() {
        let mut wm = WindowManager::new();
        wm.prev();
        assert_eq!(wm.current().num, 4);
        wm.next();
        assert_eq!(wm.current().num, 1);
        wm.select(2);
        assert_eq!(wm.current().num, 3);
    }

    #[test]
    fn header_never_exceeds_screen_width() {
        let mut wm = WindowManager::new();
        for cols in [20usize, 40, 60, 80, 132] {
            wm.rebuild_all(cols, &TermCaps::new(true));
            for w in wm.iter() {
                assert!(
                    w.column_header.len() <= cols,
                    "cols={cols} win={} hdr={}",
                    w.name,
                    w.column_header.len()
                );
            }
        }
    }

    #[test]
    fn width_pressure_excludes_whole_fields() {
        let mut wm = WindowManager::new();
        wm.rebuild_all(80, &TermCaps::new(true));
        let full: Vec<FieldId> = wm.current().visible_fields.clone();
        wm.rebuild_all(24, &TermCaps::new(true));
        let narrow = &wm.current().visible_fields;
        assert!(narrow.len() < full.len());
        // surviving fields are an exact prefix of the configured order
        assert_eq!(&full[..narrow.len()], narrow.as_slice());
        // configured-visible is not the same notion as rendered
        let squeezed = full[narrow.len()];
        assert!(wm.current().fieldscur.contains(squeezed.letter().to_ascii_uppercase()));
        assert!(!wm.current().field_visible(squeezed));
    }

    #[test]
    fn toggle_and_sort_field_case_changes() {
        let mut w = Window::new(1, "Def", DEF_FIELDS, FieldId::CpuPct,
            WinColors { summary: 1, message: 1, header: 3, task: 1 });
        assert!(w.fieldscur.contains('b'));
        w.toggle_field(FieldId::Ppid);
        assert!(w.fieldscur.contains('B'));
        w.toggle_field(FieldId::Ppid);
        assert!(w.fieldscur.contains('b'));

        w.set_sort_field(FieldId::Virt); // 'o', already uppercase in Def
        assert_eq!(w.sort_field, FieldId::Virt);
        w.set_sort_field(FieldId::Flags); // 'z', hidden -> promoted
        assert!(w.fieldscur.contains('Z'));
    }

    #[test]
    fn flag_bits_round_trip() {
        let mut f = WinFlags::default();
        f.show_cmdline = true;
        f.show_colors = true;
        f.highlight_cols = true;
        f.sort_descending = false;
        assert_eq!(WinFlags::from_bits(f.to_bits()), f);
    }

    #[test]
    fn shift_sort_stays_within_displayed_columns() {
        let mut wm = WindowManager::new();
        wm.rebuild_all(120, &TermCaps::new(true));
        let w = wm.current_mut();
        let first = w.visible_fields[0];
        w.sort_field = first;
        w.shift_sort(true); // already leftmost
        assert_eq!(w.sort_field, first);
        w.shift_sort(false);
        assert_eq!(w.sort_field, w.visible_fields[1]);
    }
}
