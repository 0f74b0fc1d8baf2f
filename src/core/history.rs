//! The delta engine: turns monotonic cumulative counters into
//! per-cycle elapsed usage, for tasks and for cpus.

use std::time::Instant;

use crate::providers::{CpuTicks, ProcessSnapshot};

/// One remembered task: its pid and the cumulative cpu ticks it had
/// when last seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryEntry {
    pub pid: i32,
    pub ticks: u64,
}

/// Task counts by state for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateTotals {
    pub total: usize,
    pub running: usize,
    pub sleeping: usize,
    pub stopped: usize,
    pub zombie: usize,
}

/// Capacity growth rule for the history buffers: at least 25% plus an
/// absolute floor, and always enough for `need`.
pub fn grown_capacity(cap: usize, need: usize) -> usize {
    (cap + cap / 4 + 100).max(need)
}

/// Two-generation (pid, ticks) store.
///
/// The buffers are swapped by role each cycle, never copied, and never
/// shrink.  Matching against the previous generation is a linear scan
/// bounded by the prior cycle's task count; O(n*k) is accepted at
/// interactive refresh rates (an indexed lookup would be observably
/// identical).
#[derive(Debug, Default)]
pub struct TaskHistory {
    prev: Vec<HistoryEntry>,
    cur: Vec<HistoryEntry>,
    /// Number of tasks recorded in `prev` last cycle.
    prev_len: usize,
}

impl TaskHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this cycle's tasks, write each task's elapsed ticks and
    /// return the per-state totals.
    ///
    /// A pid seen for the first time gets elapsed 0, as does any task
    /// whose counter went backwards (counter reset or pid reuse).
    pub fn refresh(&mut self, tasks: &mut [ProcessSnapshot]) -> StateTotals {
        std::mem::swap(&mut self.prev, &mut self.cur);
        let prev_len = self.prev_len;

        if tasks.len() > self.cur.capacity() {
            let target = grown_capacity(self.cur.capacity(), tasks.len());
            self.cur.reserve(target - self.cur.len());
            self.prev.reserve(target.saturating_sub(self.prev.len()));
        }
        self.cur.clear();

        let mut totals = StateTotals::default();
        for task in tasks.iter_mut() {
            match task.state {
                'S' | 'D' => totals.sleeping += 1,
                'T' | 't' => totals.stopped += 1,
                'Z' => totals.zombie += 1,
                'R' => totals.running += 1,
                _ => {}
            }

            let ticks = task.utime + task.stime;
            self.cur.push(HistoryEntry { pid: task.pid, ticks });

            let mut elapsed = 0;
            for old in &self.prev[..prev_len.min(self.prev.len())] {
                if old.pid == task.pid {
                    elapsed = ticks.saturating_sub(old.ticks);
                    break;
                }
            }
            task.elapsed_ticks = elapsed;
            totals.total += 1;
        }

        self.prev_len = totals.total;
        totals
    }
}

/// Per-cpu usage percentages for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuPercents {
    pub user: f32,
    pub nice: f32,
    pub system: f32,
    pub idle: f32,
    pub iowait: f32,
}

/// Keeps the previously seen cumulative ticks per cpu slot and turns
/// each new sample into percentages of that slot's own elapsed total.
#[derive(Debug, Default)]
pub struct CpuTracker {
    prev: Vec<CpuTicks>,
}

impl CpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentages for each sample slot.  The very first call reports
    /// against a zero baseline, i.e. the since-boot distribution.
    pub fn delta(&mut self, samples: &[CpuTicks]) -> Vec<CpuPercents> {
        if self.prev.len() != samples.len() {
            self.prev.resize(samples.len(), CpuTicks::default());
        }
        let mut out = Vec::with_capacity(samples.len());
        for (cur, prev) in samples.iter().zip(self.prev.iter()) {
            let u = cur.user.saturating_sub(prev.user);
            let n = cur.nice.saturating_sub(prev.nice);
            let s = cur.system.saturating_sub(prev.system);
            let i = cur.idle.saturating_sub(prev.idle);
            let w = cur.iowait.saturating_sub(prev.iowait);
            // total floored at 1 so a stalled slot cannot divide by zero
            let total = (u + n + s + i + w).max(1);
            let scale = 100.0 / total as f32;
            out.push(CpuPercents {
                user: u as f32 * scale,
                nice: n as f32 * scale,
                system: s as f32 * scale,
                idle: i as f32 * scale,
                iowait: w as f32 * scale,
            });
        }
        self.prev.copy_from_slice(samples);
        out
    }
}

/// Wall-clock frame scale: converts a task's elapsed ticks into %CPU
/// for the frame just measured.
#[derive(Debug)]
pub struct FrameClock {
    last: Instant,
    hertz: u64,
}

impl FrameClock {
    pub fn new(hertz: u64) -> Self {
        Self { last: Instant::now(), hertz: hertz.max(1) }
    }

    /// %CPU per elapsed tick since the previous call.  In Solaris
    /// (non-Irix) mode the scale is further divided across all cpus.
    pub fn tick_scale(&mut self, irix_mode: bool, cpu_count: usize) -> f32 {
        let now = Instant::now();
        let et = now.duration_since(self.last).as_secs_f32().max(0.000_001);
        self.last = now;
        let cpus = if irix_mode { 1 } else { cpu_count.max(1) };
        100.0 / (self.hertz as f32 * et * cpus as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(pid: i32, state: char, utime: u64, stime: u64) -> ProcessSnapshot {
        ProcessSnapshot { pid, state, utime, stime, ..Default::default() }
    }

    #[test]
    fn elapsed_is_delta_between_cycles() {
        let mut h = TaskHistory::new();
        let mut gen1 = vec![task(10, 'R', 300, 200)];
        h.refresh(&mut gen1);
        assert_eq!(gen1[0].elapsed_ticks, 0, "first observation yields 0");

        let mut gen2 = vec![task(10, 'R', 310, 220)];
        h.refresh(&mut gen2);
        assert_eq!(gen2[0].elapsed_ticks, 30);
    }

    #[test]
    fn counter_regression_clamps_to_zero() {
        let mut h = TaskHistory::new();
        let mut gen1 = vec![task(10, 'R', 530, 0)];
        h.refresh(&mut gen1);
        let mut gen2 = vec![task(10, 'R', 500, 0)];
        h.refresh(&mut gen2);
        assert_eq!(gen2[0].elapsed_ticks, 0, "never negative");
    }

    #[test]
    fn unmatched_pid_gets_zero_even_with_history() {
        let mut h = TaskHistory::new();
        let mut gen1 = vec![task(10, 'R', 100, 0)];
        h.refresh(&mut gen1);
        let mut gen2 = vec![task(11, 'R', 9999, 0)];
        h.refresh(&mut gen2);
        assert_eq!(gen2[0].elapsed_ticks, 0);
    }

    #[test]
    fn state_totals_are_conserved() {
        let mut h = TaskHistory::new();
        let mut tasks = vec![
            task(1, 'R', 0, 0),
            task(2, 'S', 0, 0),
            task(3, 'D', 0, 0),
            task(4, 'T', 0, 0),
            task(5, 'Z', 0, 0),
            task(6, 'R', 0, 0),
        ];
        let t = h.refresh(&mut tasks);
        assert_eq!(t.total, 6);
        assert_eq!(t.running + t.sleeping + t.stopped + t.zombie, t.total);
        assert_eq!(t.running, 2);
        assert_eq!(t.sleeping, 2);
    }

    #[test]
    fn growth_rule_is_geometric_with_floor() {
        assert_eq!(grown_capacity(0, 1), 100);
        assert_eq!(grown_capacity(100, 101), 225);
        assert!(grown_capacity(1000, 5000) >= 5000);
        // never shrinks below current need
        assert!(grown_capacity(8, 4) >= 8);
    }

    #[test]
    fn matching_survives_reordering() {
        let mut h = TaskHistory::new();
        let mut gen1 = vec![task(1, 'R', 100, 0), task(2, 'R', 200, 0)];
        h.refresh(&mut gen1);
        // order flips between snapshots; identity match is by pid
        let mut gen2 = vec![task(2, 'R', 230, 0), task(1, 'R', 105, 0)];
        h.refresh(&mut gen2);
        assert_eq!(gen2[0].elapsed_ticks, 30);
        assert_eq!(gen2[1].elapsed_ticks, 5);
    }

    #[test]
    fn cpu_percentages_sum_to_hundred() {
        let mut c = CpuTracker::new();
        let gen1 = vec![CpuTicks { user: 100, nice: 0, system: 50, idle: 800, iowait: 50 }];
        c.delta(&gen1);
        // deltas: 50 user, 10 system, 130 idle, 10 iowait, 200 total
        let gen2 = vec![CpuTicks { user: 150, nice: 0, system: 60, idle: 930, iowait: 60 }];
        let pcts = c.delta(&gen2);
        let p = pcts[0];
        let sum = p.user + p.nice + p.system + p.idle + p.iowait;
        assert!((sum - 100.0).abs() < 0.001, "sum was {sum}");
        assert!((p.user - 25.0).abs() < 0.001);
    }

    #[test]
    fn cpu_delta_clamps_regressions() {
        let mut c = CpuTracker::new();
        c.delta(&[CpuTicks { user: 100, ..Default::default() }]);
        let pcts = c.delta(&[CpuTicks { user: 50, idle: 100, ..Default::default() }]);
        assert_eq!(pcts[0].user, 0.0);
    }
}
