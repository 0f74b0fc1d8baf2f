//! Per-process table from /proc.
//!
//! One directory scan per cycle, reading stat, statm and (on demand)
//! status, cmdline and wchan for each task.  A process can vanish
//! between the scan and the reads; those races are skipped silently.
//! User and group names are resolved once from the account databases
//! and cached for the lifetime of the reader.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::error::{Result, RtopError};
use crate::providers::{ProcessSnapshot, ProcessTableProvider, SnapshotRequest};

/// /proc-backed implementation of [`ProcessTableProvider`].
#[derive(Debug, Default)]
pub struct ProcTableReader {
    users: HashMap<u32, String>,
    groups: HashMap<u32, String>,
    names_loaded: bool,
}

impl ProcTableReader {
    pub fn new() -> Self {
        ProcTableReader::default()
    }

    fn load_names(&mut self) {
        if self.names_loaded {
            return;
        }
        self.names_loaded = true;
        load_id_map("/etc/passwd", &mut self.users);
        load_id_map("/etc/group", &mut self.groups);
    }

    fn fill(&self, snap: &mut ProcessSnapshot, pid: i32, req: &SnapshotRequest) -> Option<()> {
        let base = PathBuf::from(format!("/proc/{pid}"));

        let stat = fs::read_to_string(base.join("stat")).ok()?;
        parse_stat(&stat, snap)?;
        snap.pid = pid;

        let statm = fs::read_to_string(base.join("statm")).ok()?;
        parse_statm(&statm, snap);

        let status = fs::read_to_string(base.join("status")).ok()?;
        parse_ids(&status, snap);
        snap.user = if req.user_names {
            self.users.get(&snap.uid).cloned()
        } else {
            None
        };
        snap.group = if req.group_names {
            self.groups.get(&snap.gid).cloned()
        } else {
            None
        };

        snap.cmdline = if req.argv {
            read_cmdline(&base)
        } else {
            None
        };

        snap.wchan = if req.wchan {
            match fs::read_to_string(base.join("wchan")) {
                Ok(w) => {
                    let w = w.trim();
                    if w.is_empty() || w == "0" {
                        None
                    } else {
                        Some(w.to_string())
                    }
                }
                Err(_) => None,
            }
        } else {
            None
        };

        snap.elapsed_ticks = 0;
        Some(())
    }
}

impl ProcessTableProvider for ProcTableReader {
    /// Refill `table` in place.  With a nonempty `pids` allow-list only
    /// those processes are sampled; otherwise the whole of /proc.
    fn refresh(
        &mut self,
        table: &mut Vec<ProcessSnapshot>,
        req: &SnapshotRequest,
        pids: &[i32],
    ) -> Result<()> {
        if req.user_names || req.group_names {
            self.load_names();
        }

        let mut count = 0usize;
        let mut keep = |this: &Self, pid: i32, table: &mut Vec<ProcessSnapshot>| {
            if count == table.len() {
                table.push(ProcessSnapshot::default());
            }
            match this.fill(&mut table[count], pid, req) {
                Some(()) => count += 1,
                None => debug!("pid {pid} vanished mid-scan"),
            }
        };

        if pids.is_empty() {
            let dir = fs::read_dir("/proc")
                .map_err(|e| RtopError::provider(format!("failed /proc scan: {e}")))?;
            for entry in dir.flatten() {
                if let Some(pid) = entry
                    .file_name()
                    .to_str()
                    .and_then(|n| n.parse::<i32>().ok())
                {
                    keep(self, pid, table);
                }
            }
        } else {
            for &pid in pids {
                keep(self, pid, table);
            }
        }

        table.truncate(count);
        if table.is_empty() {
            return Err(RtopError::provider("no processes visible under /proc"));
        }
        Ok(())
    }
}

/// /proc/pid/stat.  The comm field may itself contain spaces and
/// parentheses, so everything before the last ')' is name territory.
fn parse_stat(text: &str, snap: &mut ProcessSnapshot) -> Option<()> {
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    snap.name.clear();
    snap.name.push_str(&text[open + 1..close]);

    let mut it = text[close + 1..].split_ascii_whitespace();
    snap.state = it.next()?.chars().next()?;
    snap.ppid = it.next()?.parse().ok()?;
    snap.pgrp = it.next()?.parse().ok()?;
    let _session = it.next()?;
    snap.tty_nr = it.next()?.parse().ok()?;
    let _tpgid = it.next()?;
    snap.flags = it.next()?.parse().ok()?;
    let _minflt = it.next()?;
    let _cminflt = it.next()?;
    snap.maj_flt = it.next()?.parse().ok()?;
    let _cmajflt = it.next()?;
    snap.utime = it.next()?.parse().ok()?;
    snap.stime = it.next()?.parse().ok()?;
    snap.cutime = it.next()?.parse().ok()?;
    snap.cstime = it.next()?.parse().ok()?;
    snap.priority = it.next()?.parse().ok()?;
    snap.nice = it.next()?.parse().ok()?;
    // skip num_threads .. exit_signal to reach the last-run cpu
    let mut it = it.skip(19);
    snap.processor = it.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    Some(())
}

/// /proc/pid/statm, all counts in pages.
fn parse_statm(text: &str, snap: &mut ProcessSnapshot) {
    let mut it = text.split_ascii_whitespace();
    let mut next = || it.next().and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
    snap.size_pages = next();
    snap.resident_pages = next();
    snap.shared_pages = next();
    snap.text_pages = next();
    let _lib = next();
    snap.data_pages = next();
    snap.dirty_pages = next();
}

/// Effective uid and gid from /proc/pid/status.
fn parse_ids(text: &str, snap: &mut ProcessSnapshot) {
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("Uid:") {
            snap.uid = nth_id(rest, 1);
        } else if let Some(rest) = line.strip_prefix("Gid:") {
            snap.gid = nth_id(rest, 1);
            break;
        }
    }
}

fn nth_id(rest: &str, n: usize) -> u32 {
    rest.split_ascii_whitespace()
        .nth(n)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// NUL-separated argv; kernel threads have none.
fn read_cmdline(base: &std::path::Path) -> Option<Vec<String>> {
    let raw = fs::read(base.join("cmdline")).ok()?;
    if raw.is_empty() {
        return None;
    }
    let args: Vec<String> = raw
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect();
    if args.is_empty() {
        None
    } else {
        Some(args)
    }
}

/// name:passwd:id:... records, keyed by numeric id.
fn load_id_map(path: &str, map: &mut HashMap<u32, String>) {
    let Ok(text) = fs::read_to_string(path) else {
        debug!("cannot read {path}, ids will show numerically");
        return;
    };
    for line in text.lines() {
        let mut it = line.split(':');
        let name = it.next().unwrap_or("");
        let id = it.nth(1).and_then(|v| v.parse::<u32>().ok());
        if let Some(id) = id {
            map.entry(id).or_insert_with(|| name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_parses_around_parenthesized_names() {
        let line = "1234 (weird) name) R 1 1234 1234 0 -1 4194560 10 0 3 0 50 25 7 2 20 0 1 0 100 1000000 250 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 5 0 0 0 0 0";
        let mut snap = ProcessSnapshot::default();
        parse_stat(line, &mut snap).expect("parse");
        assert_eq!(snap.name, "weird) name");
        assert_eq!(snap.state, 'R');
        assert_eq!(snap.ppid, 1);
        assert_eq!(snap.utime, 50);
        assert_eq!(snap.stime, 25);
        assert_eq!(snap.cutime, 7);
        assert_eq!(snap.cstime, 2);
        assert_eq!(snap.priority, 20);
        assert_eq!(snap.nice, 0);
        assert_eq!(snap.maj_flt, 3);
        assert_eq!(snap.processor, 5);
    }

    #[test]
    fn statm_fills_page_counts() {
        let mut snap = ProcessSnapshot::default();
        parse_statm("500 120 40 8 0 90 0\n", &mut snap);
        assert_eq!(snap.size_pages, 500);
        assert_eq!(snap.resident_pages, 120);
        assert_eq!(snap.shared_pages, 40);
        assert_eq!(snap.text_pages, 8);
        assert_eq!(snap.data_pages, 90);
    }

    #[test]
    fn status_yields_effective_ids() {
        let mut snap = ProcessSnapshot::default();
        parse_ids("Name:\tx\nUid:\t1000\t1001\t1000\t1000\nGid:\t100\t101\t100\t100\n", &mut snap);
        assert_eq!(snap.uid, 1001);
        assert_eq!(snap.gid, 101);
    }

    #[test]
    fn id_map_prefers_first_record_per_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("passwd");
        fs::write(&path, "root:x:0:0::/root:/bin/sh\ntoor:x:0:0::/:/bin/sh\nme:x:1000:1000::/home/me:/bin/sh\n")
            .expect("write");
        let mut map = HashMap::new();
        load_id_map(path.to_str().unwrap(), &mut map);
        assert_eq!(map.get(&0).map(String::as_str), Some("root"));
        assert_eq!(map.get(&1000).map(String::as_str), Some("me"));
    }
}
