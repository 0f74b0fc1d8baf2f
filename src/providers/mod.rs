//! External provider contracts.
//!
//! The refresh engine never talks to the operating system directly; it
//! consumes two narrow interfaces, one for the process table and one
//! for system-wide cpu/memory counters.  Both support repeated calls
//! that reuse caller-owned storage, so a steady-state refresh cycle
//! performs no per-task allocation.

pub mod proc_table;
pub mod sys_stats;

pub use proc_table::ProcTableReader;
pub use sys_stats::ProcStatsReader;

use crate::error::Result;

/// One process, sampled fresh each cycle.
///
/// Counters are cumulative as reported by the kernel; `elapsed_ticks`
/// is the only derived member, written by the history tracker after
/// matching this snapshot against the previous cycle.
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    pub pid: i32,
    pub ppid: i32,
    pub pgrp: i32,
    pub uid: u32,
    pub gid: u32,
    /// Resolved owner name, only when a window displays it.
    pub user: Option<String>,
    /// Resolved group name, only when a window displays it.
    pub group: Option<String>,
    pub priority: i64,
    pub nice: i64,
    /// Last-used cpu.
    pub processor: i32,
    /// Single-letter state code (R, S, D, T, Z, ...).
    pub state: char,
    /// Raw kernel task flags.
    pub flags: u64,
    pub tty_nr: i32,
    /// Memory sizes, in pages (from statm).
    pub size_pages: u64,
    pub resident_pages: u64,
    pub shared_pages: u64,
    pub text_pages: u64,
    pub data_pages: u64,
    pub dirty_pages: u64,
    pub maj_flt: u64,
    /// Cumulative cpu times, in ticks.
    pub utime: u64,
    pub stime: u64,
    pub cutime: u64,
    pub cstime: u64,
    /// Short name from the stat comm field.
    pub name: String,
    /// Argument vector, only when requested.
    pub cmdline: Option<Vec<String>>,
    /// Kernel wait location, only when requested.
    pub wchan: Option<String>,
    /// Ticks accumulated since the previous cycle (history-derived).
    pub elapsed_ticks: u64,
}

/// Optional, costly per-process data a cycle may ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub argv: bool,
    pub user_names: bool,
    pub group_names: bool,
    pub wchan: bool,
}

/// Cumulative tick counters for one cpu line of /proc/stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
}

/// System memory and swap totals, in kilobytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemSnapshot {
    pub total_kb: u64,
    pub used_kb: u64,
    pub free_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
    pub swap_total_kb: u64,
    pub swap_used_kb: u64,
    pub swap_free_kb: u64,
}

/// Supplies the per-cycle process table.
///
/// `refresh` replaces the contents of `table` with an ordered sequence
/// of fresh snapshots, reusing the existing entries' storage where it
/// can.  When `pids` is non-empty only those processes are returned.
pub trait ProcessTableProvider {
    fn refresh(
        &mut self,
        table: &mut Vec<ProcessSnapshot>,
        req: &SnapshotRequest,
        pids: &[i32],
    ) -> Result<()>;
}

/// Supplies system-wide counters on demand.
pub trait SystemStatsProvider {
    /// Number of cpus; fixed for the session.
    fn cpu_count(&self) -> usize;

    /// Fills `out` with `cpu_count() + 1` entries, one per cpu plus a
    /// final slot holding the aggregate line.
    fn sample_cpus(&mut self, out: &mut Vec<CpuTicks>) -> Result<()>;

    fn memory(&mut self) -> Result<MemSnapshot>;

    /// 1, 5 and 15 minute load averages.
    fn load_average(&self) -> Result<(f64, f64, f64)>;

    /// Seconds since boot.
    fn uptime(&self) -> Result<f64>;
}
