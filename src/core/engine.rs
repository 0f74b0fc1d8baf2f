//! The refresh cycle and the single-character command loop.
//!
//! One `frame` gathers counters through the providers, derives the
//! per-cycle deltas, sorts once with the current window's settings and
//! paints every visible window into a single buffered write.  Between
//! frames the engine sleeps on the event queue for the remainder of
//! the delay interval, dispatching any keys that arrive.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::core::config::RcFile;
use crate::core::fields::{FieldContext, FieldId};
use crate::core::history::{CpuTracker, FrameClock, TaskHistory};
use crate::core::layout::apportion;
use crate::core::window::{Window, WindowManager, WINDOW_COUNT};
use crate::error::{Result, RtopError};
use crate::providers::{
    CpuTicks, ProcessSnapshot, ProcessTableProvider, SnapshotRequest, SystemStatsProvider,
};
use crate::ui::caps::TermCaps;
use crate::ui::input::{self, InputEvent};
use crate::ui::render::{self, SummaryData};

/// Session options fixed at startup (command line plus rcfile).
#[derive(Debug, Clone)]
pub struct Settings {
    pub batch: bool,
    /// Seconds between refreshes.
    pub delay: f32,
    /// Stop after this many frames.
    pub iterations: Option<usize>,
    /// Disables delay changes, kill and renice.
    pub secure: bool,
    /// Monitor only these processes when non-empty.
    pub pids: Vec<i32>,
    /// Divide %CPU by the cpu count (Solaris style) when false.
    pub irix_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            batch: false,
            delay: 3.0,
            iterations: None,
            secure: false,
            pids: Vec::new(),
            irix_mode: true,
        }
    }
}

enum Flow {
    Continue,
    Refresh,
    Quit,
}

/// Conventional Linux signal names, for the kill prompt.
const SIGNALS: &[(&str, i32)] = &[
    ("HUP", 1), ("INT", 2), ("QUIT", 3), ("ILL", 4), ("TRAP", 5), ("ABRT", 6),
    ("BUS", 7), ("FPE", 8), ("KILL", 9), ("USR1", 10), ("SEGV", 11), ("USR2", 12),
    ("PIPE", 13), ("ALRM", 14), ("TERM", 15), ("STKFLT", 16), ("CHLD", 17),
    ("CONT", 18), ("STOP", 19), ("TSTP", 20), ("TTIN", 21), ("TTOU", 22),
    ("URG", 23), ("XCPU", 24), ("XFSZ", 25), ("VTALRM", 26), ("PROF", 27),
    ("WINCH", 28), ("IO", 29), ("PWR", 30), ("SYS", 31),
];

/// Accepts a number or a name, with or without the SIG prefix.
pub fn signal_number(text: &str) -> Option<i32> {
    if let Ok(n) = text.parse::<i32>() {
        return (1..=31).contains(&n).then_some(n);
    }
    let name = text.trim().to_ascii_uppercase();
    let name = name.strip_prefix("SIG").unwrap_or(&name);
    SIGNALS.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

/// Sort `table` in place by the window's sort column and direction.
pub fn sort_tasks(table: &mut [ProcessSnapshot], win: &Window, ctx: &FieldContext) {
    let field = win.sort_field;
    let descending = win.flags.sort_descending;
    table.sort_by(|a, b| {
        let ord = field.compare(a, b, ctx);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

pub struct FrameEngine<P, S> {
    procs: P,
    stats: S,
    settings: Settings,
    wins: WindowManager,
    caps: TermCaps,
    history: TaskHistory,
    cpu_tracker: CpuTracker,
    clock: FrameClock,
    table: Vec<ProcessSnapshot>,
    cpu_samples: Vec<CpuTicks>,
    page_kb: u64,
    hertz: u64,
    irix: bool,
    delay: f32,
    msg: Option<String>,
    msg_row: u16,
    cols: usize,
    rows: usize,
    frames: usize,
}

impl<P: ProcessTableProvider, S: SystemStatsProvider> FrameEngine<P, S> {
    pub fn new(
        procs: P,
        stats: S,
        settings: Settings,
        rc: Option<RcFile>,
        page_kb: u64,
        hertz: u64,
    ) -> Self {
        let mut wins = WindowManager::new();
        let delay = settings.delay;
        let mut irix = settings.irix_mode;
        if let Some(rc) = &rc {
            rc.apply(&mut wins);
            irix = rc.irixps;
        }
        let caps = TermCaps::new(settings.batch);
        FrameEngine {
            procs,
            stats,
            settings,
            wins,
            caps,
            history: TaskHistory::new(),
            cpu_tracker: CpuTracker::new(),
            clock: FrameClock::new(hertz),
            table: Vec::new(),
            cpu_samples: Vec::new(),
            page_kb,
            hertz,
            irix,
            delay,
            msg: None,
            msg_row: 0,
            cols: 80,
            rows: 24,
            frames: 0,
        }
    }

    /// Flip a startup toggle on every window (the command-line
    /// equivalents of the c, i and S commands).
    pub fn toggle_all(&mut self, f: impl Fn(&mut Window)) {
        for i in 0..WINDOW_COUNT {
            f(self.wins.get_mut(i));
        }
    }

    fn measure(&mut self) {
        if self.caps.is_batch() {
            self.cols = std::env::var("COLUMNS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(80);
            self.rows = usize::MAX / 2;
            return;
        }
        if let Ok((c, r)) = crossterm::terminal::size() {
            self.cols = c as usize;
            self.rows = r as usize;
        }
    }

    /// Union of the optional per-process data any rendered window needs.
    fn union_request(&self) -> SnapshotRequest {
        let mut req = SnapshotRequest::default();
        for w in self.wins.iter() {
            let considered = if self.wins.multi {
                w.flags.visible
            } else {
                w.num - 1 == self.wins.current_index()
            };
            if !considered {
                continue;
            }
            req.argv |= w.flags.show_cmdline && w.field_visible(FieldId::Command);
            req.user_names |= w.field_visible(FieldId::User) || w.user_filter.is_some();
            req.group_names |= w.field_visible(FieldId::Group);
            req.wchan |= w.field_visible(FieldId::Wchan);
        }
        req
    }

    fn field_ctx(&self, w: &Window, tscale: f32, mem_total_kb: u64) -> FieldContext {
        FieldContext {
            page_kb: self.page_kb,
            hertz: self.hertz,
            tscale,
            mem_total_kb,
            cumulative: w.flags.show_ctimes,
            cmdline: w.flags.show_cmdline,
            max_cmd_len: w.max_cmd_len,
        }
    }

    /// One full refresh-and-paint cycle.
    fn frame(&mut self, out: &mut String) -> Result<()> {
        self.compose(out)?;
        let mut so = io::stdout();
        so.write_all(out.as_bytes())?;
        so.flush()?;
        self.frames += 1;
        Ok(())
    }

    /// Gather counters, derive the deltas and lay the frame out into
    /// `out`, without touching the terminal.
    fn compose(&mut self, out: &mut String) -> Result<()> {
        self.measure();
        self.wins.rebuild_all(self.cols, &self.caps);

        let req = self.union_request();
        self.procs.refresh(&mut self.table, &req, &self.settings.pids)?;
        let totals = self.history.refresh(&mut self.table);
        self.stats.sample_cpus(&mut self.cpu_samples)?;
        let data = SummaryData {
            uptime_secs: self.stats.uptime()?,
            load: self.stats.load_average()?,
            totals,
            cpus: self.cpu_tracker.delta(&self.cpu_samples),
            mem: self.stats.memory()?,
        };
        let tscale = self.clock.tick_scale(self.irix, self.stats.cpu_count());

        // one sort per cycle, by the current window's rules
        let cur_ctx = self.field_ctx(self.wins.current(), tscale, data.mem.total_kb);
        sort_tasks(&mut self.table, self.wins.current(), &cur_ctx);

        out.clear();
        out.push_str(&self.caps.home);
        let multi = self.wins.multi;

        // one summary area per frame, always the current window's view
        let mut used =
            render::summary(out, self.wins.current(), &data, &self.caps, self.cols, multi);

        if !self.caps.is_batch() {
            self.msg_row = used as u16;
            let text = self.msg.take().unwrap_or_default();
            let style = self.wins.current().caps.clr_msg.clone();
            let style = if text.is_empty() { "" } else { style.as_str() };
            out.push_str(style);
            out.push_str(&text);
            out.push_str(&self.caps.caps_off);
            out.push_str(&self.caps.clr_eol);
            out.push('\n');
            used += 1;
        }

        let budget = self.rows.saturating_sub(used);
        if multi {
            let windows: [Window; WINDOW_COUNT] = std::array::from_fn(|i| self.wins.get(i).clone());
            let mut left = budget;
            for (i, w) in windows.iter().enumerate() {
                if !w.flags.visible || left == 0 {
                    continue;
                }
                // recomputed before every window, so rows an earlier
                // window left unspent flow to the ones after it
                let share = apportion(left, &windows, i)[i];
                left -= 1; // the column header
                let rows = share.min(left);
                let ctx = self.field_ctx(w, tscale, data.mem.total_kb);
                let written =
                    render::window_tasks(out, w, &self.table, &ctx, &self.caps, self.cols, rows);
                left -= written;
            }
        } else if budget > 0 {
            let w = self.wins.current();
            let mut rows = budget - 1;
            if w.max_tasks > 0 {
                rows = rows.min(w.max_tasks);
            }
            let ctx = self.field_ctx(w, tscale, data.mem.total_kb);
            render::window_tasks(out, w, &self.table, &ctx, &self.caps, self.cols, rows);
        }

        out.push_str(&self.caps.clr_eos);
        if self.caps.is_batch() {
            out.push('\n');
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        info!(
            "starting: delay {:.1}s, batch {}, secure {}",
            self.delay, self.settings.batch, self.settings.secure
        );
        let mut out = String::with_capacity(8 * 1024);
        loop {
            self.frame(&mut out)?;
            if let Some(n) = self.settings.iterations {
                if self.frames >= n {
                    return Ok(());
                }
            }
            if self.caps.is_batch() {
                std::thread::sleep(Duration::from_secs_f32(self.delay));
                continue;
            }
            let until = Instant::now() + Duration::from_secs_f32(self.delay);
            loop {
                let remaining = until.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match input::next_event(remaining)? {
                    None => break,
                    Some(ev) => match self.handle(ev)? {
                        Flow::Continue => {}
                        Flow::Refresh => break,
                        Flow::Quit => return Ok(()),
                    },
                }
            }
        }
    }

    fn show_msg(&mut self, text: impl Into<String>) {
        self.msg = Some(text.into());
    }

    /// Paint a prompt on the message row and collect a line.
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        if self.caps.is_batch() {
            return Ok(None);
        }
        let mut so = io::stdout();
        write!(
            so,
            "{}{}{} {}{}",
            self.caps.goto(0, self.msg_row),
            self.wins.current().caps.clr_pmt,
            text,
            self.caps.caps_off,
            self.caps.clr_eol
        )?;
        so.flush()?;
        input::read_line(&mut so)
    }

    fn prompt_float(&mut self, text: &str) -> Result<Option<f32>> {
        match self.prompt(text)? {
            Some(s) if !s.is_empty() => match s.parse::<f32>() {
                Ok(v) => Ok(Some(v)),
                Err(_) => {
                    self.show_msg(format!("Unacceptable number '{s}'"));
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    fn prompt_int(&mut self, text: &str) -> Result<Option<i64>> {
        match self.prompt(text)? {
            Some(s) if !s.is_empty() => match s.parse::<i64>() {
                Ok(v) => Ok(Some(v)),
                Err(_) => {
                    self.show_msg(format!("Unacceptable number '{s}'"));
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    fn secure_blocked(&mut self) -> bool {
        if self.settings.secure {
            self.show_msg("Command disabled in secure mode");
            return true;
        }
        false
    }

    fn handle(&mut self, ev: InputEvent) -> Result<Flow> {
        let key = match ev {
            InputEvent::Interrupt => return Ok(Flow::Quit),
            InputEvent::Resize(c, r) => {
                self.cols = c as usize;
                self.rows = r as usize;
                return Ok(Flow::Refresh);
            }
            InputEvent::Enter => ' ',
            InputEvent::Escape => return Ok(Flow::Continue),
            InputEvent::Key(c) => c,
        };
        debug!("command '{key}'");
        match key {
            'q' => return Ok(Flow::Quit),
            ' ' => {}

            '1' => {
                let f = &mut self.wins.current_mut().flags;
                f.view_cpusum = !f.view_cpusum;
            }
            'l' => {
                let f = &mut self.wins.current_mut().flags;
                f.view_loadavg = !f.view_loadavg;
            }
            'm' => {
                let f = &mut self.wins.current_mut().flags;
                f.view_memory = !f.view_memory;
            }
            't' => {
                let f = &mut self.wins.current_mut().flags;
                f.view_states = !f.view_states;
            }

            'c' => {
                let f = &mut self.wins.current_mut().flags;
                f.show_cmdline = !f.show_cmdline;
            }
            'i' => {
                let f = &mut self.wins.current_mut().flags;
                f.show_idle = !f.show_idle;
            }
            'S' => {
                let f = &mut self.wins.current_mut().flags;
                f.show_ctimes = !f.show_ctimes;
                let state = if f.show_ctimes { "on" } else { "off" };
                self.show_msg(format!("Cumulative time {state}"));
            }
            'I' => {
                self.irix = !self.irix;
                let mode = if self.irix { "Irix" } else { "Solaris" };
                self.show_msg(format!("{mode} mode cpu scaling"));
            }
            'R' => {
                let f = &mut self.wins.current_mut().flags;
                f.sort_descending = !f.sort_descending;
            }

            'x' => {
                let f = &mut self.wins.current_mut().flags;
                f.highlight_cols = !f.highlight_cols;
            }
            'y' => {
                let f = &mut self.wins.current_mut().flags;
                f.highlight_rows = !f.highlight_rows;
            }
            'b' => {
                let f = &mut self.wins.current_mut().flags;
                f.highlight_bold = !f.highlight_bold;
            }
            'z' => {
                let f = &mut self.wins.current_mut().flags;
                f.show_colors = !f.show_colors;
            }
            'Z' => {
                if let Some(s) = self.prompt("Color: target (s/m/h/t) then 0-7, e.g. h6:")? {
                    let mut it = s.chars();
                    let target = it.next();
                    let digit = it.next().and_then(|c| c.to_digit(10));
                    match (target, digit) {
                        (Some(t), Some(d)) if d <= 7 && "smht".contains(t) => {
                            let colors = &mut self.wins.current_mut().colors;
                            match t {
                                's' => colors.summary = d as u8,
                                'm' => colors.message = d as u8,
                                'h' => colors.header = d as u8,
                                _ => colors.task = d as u8,
                            }
                        }
                        _ => self.show_msg(format!("Unacceptable color '{s}'")),
                    }
                }
            }

            '<' => self.wins.current_mut().shift_sort(true),
            '>' => self.wins.current_mut().shift_sort(false),
            'F' | 'O' => {
                if let Some(s) = self.prompt("Sort field letter (a-z):")? {
                    match s.chars().next().and_then(FieldId::from_letter) {
                        Some(f) => self.wins.current_mut().set_sort_field(f),
                        None => self.show_msg("Unknown field"),
                    }
                }
            }
            'f' => {
                if let Some(s) = self.prompt("Toggle field letter (a-z):")? {
                    match s.chars().next().and_then(FieldId::from_letter) {
                        Some(f) => self.wins.current_mut().toggle_field(f),
                        None => self.show_msg("Unknown field"),
                    }
                }
            }
            'o' => {
                if let Some(s) = self.prompt("Move field (upper=left, lower=right):")? {
                    match s.chars().next() {
                        Some(c) => match FieldId::from_letter(c) {
                            Some(f) => {
                                self.wins.current_mut().reorder_field(f, c.is_ascii_uppercase())
                            }
                            None => self.show_msg("Unknown field"),
                        },
                        None => {}
                    }
                }
            }

            'a' => self.wins.next(),
            'w' => self.wins.prev(),
            'A' => {
                self.wins.multi = !self.wins.multi;
            }
            'g' => {
                if self.wins.multi {
                    if let Some(name) = self.prompt("New window name:")? {
                        if !name.is_empty() {
                            self.wins.current_mut().rename(&name);
                        }
                    }
                } else {
                    self.show_msg("Command valid only with multiple windows");
                }
            }
            'G' => {
                if let Some(n) = self.prompt_int("Select window (1-4):")? {
                    if (1..=WINDOW_COUNT as i64).contains(&n) {
                        self.wins.select(n as usize - 1);
                    } else {
                        self.show_msg("No such window");
                    }
                }
            }
            '-' => {
                if self.wins.multi {
                    let f = &mut self.wins.current_mut().flags;
                    f.visible = !f.visible;
                } else {
                    self.show_msg("Command valid only with multiple windows");
                }
            }
            '_' => {
                if self.wins.multi {
                    for i in 0..WINDOW_COUNT {
                        let f = &mut self.wins.get_mut(i).flags;
                        f.visible = !f.visible;
                    }
                } else {
                    self.show_msg("Command valid only with multiple windows");
                }
            }
            '=' => {
                let w = self.wins.current_mut();
                w.max_tasks = 0;
                w.user_filter = None;
                w.flags.show_idle = true;
                w.flags.visible = true;
            }
            '+' => self.wins.equalize(),

            'n' | '#' => {
                if let Some(n) = self.prompt_int("Maximum tasks (0 is unlimited):")? {
                    if n >= 0 {
                        self.wins.current_mut().max_tasks = n as usize;
                    } else {
                        self.show_msg("Unacceptable task limit");
                    }
                }
            }
            'u' => {
                if let Some(s) = self.prompt("Show only user (blank is all):")? {
                    self.wins.current_mut().user_filter =
                        if s.is_empty() { None } else { Some(s) };
                }
            }

            'd' | 's' => {
                if !self.secure_blocked() {
                    if let Some(v) = self.prompt_float("Delay in seconds:")? {
                        if v > 0.0 {
                            self.delay = v;
                        } else {
                            self.show_msg("Delay must be positive");
                        }
                    }
                }
            }
            'k' => {
                if !self.secure_blocked() {
                    self.kill_prompt()?;
                }
            }
            'r' => {
                if !self.secure_blocked() {
                    self.renice_prompt()?;
                }
            }

            'W' => {
                let rc = RcFile::capture(&self.wins, self.delay, self.irix);
                match RcFile::default_path() {
                    Some(path) => match rc.save(&path) {
                        Ok(()) => self.show_msg(format!("Wrote {}", path.display())),
                        Err(e) => self.show_msg(format!("Write failed: {e}")),
                    },
                    None => self.show_msg("No home directory for the rcfile"),
                }
            }

            'h' => self.help_screen()?,
            _ => self.show_msg(format!("Unknown command '{key}', try 'h' for help")),
        }
        Ok(Flow::Refresh)
    }

    fn kill_prompt(&mut self) -> Result<()> {
        let Some(pid) = self.prompt_int("PID to signal:")? else {
            return Ok(());
        };
        let Some(sig) = self.prompt("Signal (name or number, default TERM):")? else {
            return Ok(());
        };
        let sig = if sig.is_empty() {
            15
        } else {
            match signal_number(&sig) {
                Some(s) => s,
                None => {
                    self.show_msg(format!("Unknown signal '{sig}'"));
                    return Ok(());
                }
            }
        };
        match send_signal(pid as i32, sig) {
            Ok(()) => self.show_msg(format!("Sent signal {sig} to {pid}")),
            Err(e) => self.show_msg(format!("Signal to {pid} failed: {e}")),
        }
        Ok(())
    }

    fn renice_prompt(&mut self) -> Result<()> {
        let Some(pid) = self.prompt_int("PID to renice:")? else {
            return Ok(());
        };
        let Some(val) = self.prompt_int("Nice value (-20 to 19):")? else {
            return Ok(());
        };
        match set_nice(pid as i32, val as i32) {
            Ok(()) => self.show_msg(format!("Reniced {pid} to {val}")),
            Err(e) => self.show_msg(format!("Renice of {pid} failed: {e}")),
        }
        Ok(())
    }

    fn help_screen(&mut self) -> Result<()> {
        if self.caps.is_batch() {
            return Ok(());
        }
        let mut so = io::stdout();
        write!(so, "{}{}", self.caps.clr_scr, self.caps.home)?;
        for line in HELP_TEXT.lines() {
            write!(so, "{line}{}\r\n", self.caps.clr_eol)?;
        }
        so.flush()?;
        // any key returns to the display
        loop {
            if input::next_event(Duration::from_secs(60))?.is_some() {
                return Ok(());
            }
        }
    }
}

const HELP_TEXT: &str = "\
Help for interactive commands

  space/enter  refresh now            q  quit
  1 l m t      summary area toggles (cpus, load, memory, tasks)
  c i S I R    cmdline, idle tasks, cumulative time, Irix mode, sort order
  x y b z Z    column/row highlights, bold, colors, recolor
  f o F <,>    toggle field, move field, choose sort field, shift sort
  a w A g G    next/prev window, multi-window mode, rename, select
  - _ = +      show/hide window(s), reset window, reset all
  n u          task limit, user filter
  d s k r      delay, delay, kill, renice (disabled in secure mode)
  W            write configuration file

Press any key to continue";

#[cfg(unix)]
fn send_signal(pid: i32, sig: i32) -> io::Result<()> {
    if unsafe { libc::kill(pid, sig) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_signal(_pid: i32, _sig: i32) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "signals unavailable"))
}

#[cfg(unix)]
fn set_nice(pid: i32, val: i32) -> io::Result<()> {
    if unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, val) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn set_nice(_pid: i32, _val: i32) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "renice unavailable"))
}

/// Startup sanity checks shared by every entry path.
pub fn validate_settings(s: &Settings) -> Result<()> {
    if s.delay <= 0.0 && !s.batch {
        return Err(RtopError::startup("delay must be positive"));
    }
    if let Some(0) = s.iterations {
        return Err(RtopError::startup("iteration count must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemSnapshot;

    struct StubProcs(Vec<ProcessSnapshot>);

    impl ProcessTableProvider for StubProcs {
        fn refresh(
            &mut self,
            table: &mut Vec<ProcessSnapshot>,
            _req: &SnapshotRequest,
            _pids: &[i32],
        ) -> Result<()> {
            table.clear();
            table.extend(self.0.iter().cloned());
            Ok(())
        }
    }

    struct StubStats;

    impl SystemStatsProvider for StubStats {
        fn cpu_count(&self) -> usize {
            2
        }

        fn sample_cpus(&mut self, out: &mut Vec<CpuTicks>) -> Result<()> {
            out.clear();
            out.resize(3, CpuTicks::default());
            Ok(())
        }

        fn memory(&mut self) -> Result<MemSnapshot> {
            Ok(MemSnapshot { total_kb: 1024, ..Default::default() })
        }

        fn load_average(&self) -> Result<(f64, f64, f64)> {
            Ok((0.0, 0.0, 0.0))
        }

        fn uptime(&self) -> Result<f64> {
            Ok(60.0)
        }
    }

    fn batch_engine(tasks: Vec<ProcessSnapshot>) -> FrameEngine<StubProcs, StubStats> {
        let settings = Settings { batch: true, ..Settings::default() };
        FrameEngine::new(StubProcs(tasks), StubStats, settings, None, 4, 100)
    }

    #[test]
    fn multi_window_frame_has_one_summary_block() {
        let tasks: Vec<ProcessSnapshot> = (1..=6)
            .map(|pid| ProcessSnapshot {
                pid,
                state: 'S',
                name: format!("p{pid}"),
                ..Default::default()
            })
            .collect();
        let mut e = batch_engine(tasks);
        e.wins.multi = true;
        let mut out = String::new();
        e.compose(&mut out).expect("frame");

        assert_eq!(out.matches("load average").count(), 1);
        assert_eq!(out.matches("Tasks:").count(), 1);
        assert_eq!(out.matches("Mem:").count(), 1);
        // every window still contributes its own column header
        assert_eq!(out.matches("PID").count(), WINDOW_COUNT);
    }

    #[test]
    fn apportionment_is_recomputed_as_rows_are_spent() {
        let mut wm = WindowManager::new();
        wm.get_mut(0).max_tasks = 5;
        wm.get_mut(3).flags.visible = false;
        let windows: [Window; WINDOW_COUNT] = std::array::from_fn(|i| wm.get(i).clone());

        let first = apportion(20, &windows, 0)[0];
        assert_eq!(first, 5, "the capped window keeps its cap");

        // window 1 consumed a header plus its cap, leaving 14 rows;
        // a fresh apportionment grows the next window's share
        let second = apportion(20 - 1 - first, &windows, 1)[1];
        assert_eq!(second, 6);
        assert_ne!(second, apportion(20, &windows, 0)[1]);
    }

    #[test]
    fn window_rename_requires_multiple_windows() {
        let mut e = batch_engine(Vec::new());
        assert!(!e.wins.multi);
        let before = e.wins.current().name.clone();
        e.handle(InputEvent::Key('g')).expect("key");
        assert_eq!(e.wins.current().name, before);
        assert_eq!(e.msg.as_deref(), Some("Command valid only with multiple windows"));

        // selection has no such restriction; its prompt just returns
        // empty-handed without a terminal
        e.msg = None;
        e.handle(InputEvent::Key('G')).expect("key");
        assert!(e.msg.is_none());
    }

    #[test]
    fn signal_lookup_accepts_names_and_numbers() {
        assert_eq!(signal_number("9"), Some(9));
        assert_eq!(signal_number("KILL"), Some(9));
        assert_eq!(signal_number("sigterm"), Some(15));
        assert_eq!(signal_number("term"), Some(15));
        assert_eq!(signal_number("0"), None);
        assert_eq!(signal_number("99"), None);
        assert_eq!(signal_number("NOPE"), None);
    }

    #[test]
    fn sort_defaults_to_largest_first() {
        let mut wm = WindowManager::new();
        wm.rebuild_all(80, &TermCaps::new(true));
        let win = wm.current().clone();
        let ctx = FieldContext::default();

        let mut table: Vec<ProcessSnapshot> = [5u64, 200, 40]
            .iter()
            .enumerate()
            .map(|(i, ticks)| ProcessSnapshot {
                pid: i as i32 + 1,
                elapsed_ticks: *ticks,
                ..Default::default()
            })
            .collect();
        sort_tasks(&mut table, &win, &ctx);
        let order: Vec<u64> = table.iter().map(|t| t.elapsed_ticks).collect();
        assert_eq!(order, [200, 40, 5]);

        let mut win = win;
        win.flags.sort_descending = false;
        sort_tasks(&mut table, &win, &ctx);
        let order: Vec<u64> = table.iter().map(|t| t.elapsed_ticks).collect();
        assert_eq!(order, [5, 40, 200]);
    }

    #[test]
    fn equal_keys_keep_their_relative_order() {
        let mut wm = WindowManager::new();
        wm.rebuild_all(80, &TermCaps::new(true));
        let win = wm.current().clone();
        let ctx = FieldContext::default();
        let mut table: Vec<ProcessSnapshot> = (1..=4)
            .map(|pid| ProcessSnapshot { pid, elapsed_ticks: 7, ..Default::default() })
            .collect();
        sort_tasks(&mut table, &win, &ctx);
        let pids: Vec<i32> = table.iter().map(|t| t.pid).collect();
        assert_eq!(pids, [1, 2, 3, 4]);
    }

    #[test]
    fn settings_validation_rejects_nonsense() {
        let ok = Settings::default();
        assert!(validate_settings(&ok).is_ok());

        let bad = Settings { delay: 0.0, ..Settings::default() };
        assert!(validate_settings(&bad).is_err());

        let bad = Settings { iterations: Some(0), ..Settings::default() };
        assert!(validate_settings(&bad).is_err());

        let batch = Settings { batch: true, delay: 0.0, ..Settings::default() };
        assert!(validate_settings(&batch).is_ok());
    }
}
