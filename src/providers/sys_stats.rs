//! System-wide counters from /proc: per-cpu ticks, memory and swap
//! totals, load averages and uptime.

use std::fs;

use crate::error::{Result, RtopError};
use crate::providers::{CpuTicks, MemSnapshot, SystemStatsProvider};

/// Clock ticks per second, as the kernel accounts cpu time.
pub fn clock_ticks() -> u64 {
    #[cfg(unix)]
    {
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if hz > 0 {
            return hz as u64;
        }
    }
    100
}

/// Page size in kilobytes, for the statm-based memory columns.
pub fn page_size_kb() -> u64 {
    #[cfg(unix)]
    {
        let ps = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if ps > 0 {
            return (ps as u64) / 1024;
        }
    }
    4
}

/// /proc-backed implementation of [`SystemStatsProvider`].
#[derive(Debug)]
pub struct ProcStatsReader {
    cpu_count: usize,
}

impl ProcStatsReader {
    pub fn new() -> Result<Self> {
        let text = fs::read_to_string("/proc/stat")
            .map_err(|e| RtopError::startup(format!("failed /proc/stat open: {e}")))?;
        let cpu_count = text
            .lines()
            .filter(|l| l.starts_with("cpu") && !l.starts_with("cpu "))
            .count()
            .max(1);
        Ok(ProcStatsReader { cpu_count })
    }

    fn parse_cpu_line(line: &str) -> Option<CpuTicks> {
        let mut it = line.split_ascii_whitespace().skip(1);
        let mut next = || it.next()?.parse::<u64>().ok();
        Some(CpuTicks {
            user: next()?,
            nice: next()?,
            system: next()?,
            idle: next()?,
            // iowait is absent on very old kernels; treat as zero
            iowait: next().unwrap_or(0),
        })
    }
}

impl SystemStatsProvider for ProcStatsReader {
    fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    /// Slots 0..n are the individual cpus, slot n is the aggregate
    /// first line of /proc/stat.
    fn sample_cpus(&mut self, out: &mut Vec<CpuTicks>) -> Result<()> {
        let text = fs::read_to_string("/proc/stat")
            .map_err(|e| RtopError::provider(format!("failed /proc/stat read: {e}")))?;
        out.clear();
        out.resize(self.cpu_count + 1, CpuTicks::default());
        for line in text.lines() {
            if let Some(rest) = line.strip_prefix("cpu") {
                let ticks = Self::parse_cpu_line(line)
                    .ok_or_else(|| RtopError::provider("failed /proc/stat read"))?;
                if rest.starts_with(' ') {
                    out[self.cpu_count] = ticks;
                } else if let Ok(n) = rest
                    .split_ascii_whitespace()
                    .next()
                    .unwrap_or("")
                    .parse::<usize>()
                {
                    if n < self.cpu_count {
                        out[n] = ticks;
                    }
                }
            }
        }
        Ok(())
    }

    fn memory(&mut self) -> Result<MemSnapshot> {
        let text = fs::read_to_string("/proc/meminfo")
            .map_err(|e| RtopError::provider(format!("failed /proc/meminfo read: {e}")))?;
        let mut mem = MemSnapshot::default();
        for line in text.lines() {
            let (key, rest) = match line.split_once(':') {
                Some(kv) => kv,
                None => continue,
            };
            let kb: u64 = rest
                .trim()
                .split_ascii_whitespace()
                .next()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            match key {
                "MemTotal" => mem.total_kb = kb,
                "MemFree" => mem.free_kb = kb,
                "Buffers" => mem.buffers_kb = kb,
                "Cached" => mem.cached_kb = kb,
                "SwapTotal" => mem.swap_total_kb = kb,
                "SwapFree" => mem.swap_free_kb = kb,
                _ => {}
            }
        }
        mem.used_kb = mem.total_kb.saturating_sub(mem.free_kb);
        mem.swap_used_kb = mem.swap_total_kb.saturating_sub(mem.swap_free_kb);
        Ok(mem)
    }

    fn load_average(&self) -> Result<(f64, f64, f64)> {
        let text = fs::read_to_string("/proc/loadavg")
            .map_err(|e| RtopError::provider(format!("failed /proc/loadavg read: {e}")))?;
        let mut it = text.split_ascii_whitespace();
        let mut next = || -> f64 { it.next().and_then(|v| v.parse().ok()).unwrap_or(0.0) };
        Ok((next(), next(), next()))
    }

    fn uptime(&self) -> Result<f64> {
        let text = fs::read_to_string("/proc/uptime")
            .map_err(|e| RtopError::provider(format!("failed /proc/uptime read: {e}")))?;
        text.split_ascii_whitespace()
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| RtopError::provider("failed /proc/uptime parse"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_line_parses_all_five_categories() {
        let t = ProcStatsReader::parse_cpu_line("cpu0 100 5 60 900 30 0 7 0 0 0").unwrap();
        assert_eq!(t.user, 100);
        assert_eq!(t.nice, 5);
        assert_eq!(t.system, 60);
        assert_eq!(t.idle, 900);
        assert_eq!(t.iowait, 30);
    }

    #[test]
    fn cpu_line_tolerates_missing_iowait() {
        let t = ProcStatsReader::parse_cpu_line("cpu0 100 5 60 900").unwrap();
        assert_eq!(t.iowait, 0);
    }

    #[test]
    fn constants_have_sane_fallbacks() {
        assert!(clock_ticks() >= 1);
        assert!(page_size_kb() >= 1);
    }
}
