//! A whole display cycle in batch mode: history deltas feed the sort,
//! the sort feeds the renderer, and the output is plain aligned text.

use rtop::core::engine::sort_tasks;
use rtop::core::fields::FieldContext;
use rtop::core::history::{CpuTracker, TaskHistory};
use rtop::core::window::WindowManager;
use rtop::providers::{CpuTicks, MemSnapshot, ProcessSnapshot};
use rtop::ui::caps::TermCaps;
use rtop::ui::render::{self, SummaryData};

fn task(pid: i32, state: char, utime: u64) -> ProcessSnapshot {
    ProcessSnapshot {
        pid,
        state,
        utime,
        name: format!("proc{pid}"),
        resident_pages: pid as u64 * 10,
        ..Default::default()
    }
}

#[test]
fn busiest_task_rises_to_the_top() {
    let mut history = TaskHistory::new();
    let mut gen1 = vec![task(100, 'S', 1000), task(200, 'R', 1000), task(300, 'S', 1000)];
    history.refresh(&mut gen1);

    // pid 200 burns 90 ticks this cycle, pid 300 burns 10
    let mut gen2 = vec![task(100, 'S', 1000), task(200, 'R', 1090), task(300, 'S', 1010)];
    let totals = history.refresh(&mut gen2);
    assert_eq!(totals.total, 3);
    assert_eq!(totals.running, 1);

    let caps = TermCaps::new(true);
    let mut wins = WindowManager::new();
    wins.rebuild_all(100, &caps);
    let win = wins.current();
    assert_eq!(win.sort_field.letter(), 'k', "Def window sorts by %CPU");

    let ctx = FieldContext {
        tscale: 1.0,
        max_cmd_len: win.max_cmd_len,
        ..Default::default()
    };
    sort_tasks(&mut gen2, win, &ctx);
    let pids: Vec<i32> = gen2.iter().map(|t| t.pid).collect();
    assert_eq!(pids, [200, 300, 100]);

    let mut out = String::new();
    let rows = render::window_tasks(&mut out, win, &gen2, &ctx, &caps, 100, 10);
    assert_eq!(rows, 3);
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].contains("PID"));
    assert!(lines[1].contains("200"));
    assert!(lines[1].contains("proc200"));
    assert!(lines[3].contains("100"));
    assert!(!out.contains('\x1b'), "batch output carries no control sequences");
}

#[test]
fn summary_reflects_cpu_and_memory_counters() {
    let mut tracker = CpuTracker::new();
    let gen1 = vec![
        CpuTicks { user: 100, idle: 900, ..Default::default() },
        CpuTicks { user: 100, idle: 900, ..Default::default() },
    ];
    tracker.delta(&gen1);
    let gen2 = vec![
        CpuTicks { user: 180, idle: 920, ..Default::default() },
        CpuTicks { user: 150, idle: 950, ..Default::default() },
    ];

    let caps = TermCaps::new(true);
    let mut wins = WindowManager::new();
    wins.rebuild_all(100, &caps);

    let data = SummaryData {
        uptime_secs: 125.0,
        load: (0.50, 0.40, 0.30),
        totals: Default::default(),
        cpus: tracker.delta(&gen2),
        mem: MemSnapshot { total_kb: 8000, used_kb: 3000, free_kb: 5000, ..Default::default() },
    };

    let mut out = String::new();
    let lines = render::summary(&mut out, wins.current(), &data, &caps, 100, false);
    assert!(lines >= 4);
    assert!(out.contains("up 0:02"));
    // the aggregate slot is the final sample: 50 user of 100 total
    assert!(out.contains("Cpu(s):  50.0% us"));
    assert!(out.contains("8000k total"));
    assert!(out.contains("3000k used"));
}
