//! Apportions the remaining screen rows across the windows still to be
//! drawn this cycle.

use crate::core::window::{Window, WINDOW_COUNT};

/// Row allotment for the visible windows from `start` onward, given
/// `budget` remaining usable rows.
///
/// Windows with an explicit nonzero cap keep it exactly, first come
/// first served, even if that starves later windows -- caps are user
/// chosen.  The cap scan stops as soon as the running sum reaches the
/// budget.  Every uncapped window receives `(budget - wins) / wins`
/// rows, one header row per window having been set aside.  The floor
/// division can under-allot by up to `wins - 1` rows; that slack is
/// absorbed by the end-of-cycle screen clear, deliberately not
/// redistributed.  A zero allotment still renders a header.
pub fn apportion(budget: usize, windows: &[Window; WINDOW_COUNT], start: usize) -> [usize; WINDOW_COUNT] {
    let mut wins = 0usize;
    let mut reserved = 0usize;
    for w in windows.iter().skip(start) {
        if w.flags.visible {
            reserved += w.max_tasks;
            wins += 1;
            if reserved >= budget {
                break;
            }
        }
    }
    let wins = wins.max(1);
    let share = budget.saturating_sub(wins) / wins;

    let mut out = [0usize; WINDOW_COUNT];
    for (i, w) in windows.iter().enumerate().skip(start) {
        if w.flags.visible {
            out[i] = if w.max_tasks > 0 { w.max_tasks } else { share };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::WindowManager;

    fn windows_with_caps(caps: [usize; WINDOW_COUNT], visible: [bool; WINDOW_COUNT]) -> [Window; WINDOW_COUNT] {
        let mut wm = WindowManager::new();
        for i in 0..WINDOW_COUNT {
            wm.get_mut(i).max_tasks = caps[i];
            wm.get_mut(i).flags.visible = visible[i];
        }
        std::array::from_fn(|i| wm.get(i).clone())
    }

    #[test]
    fn capped_window_keeps_cap_uncapped_gets_floor_share() {
        let wins = windows_with_caps([5, 0, 0, 0], [true, true, false, false]);
        let got = apportion(20, &wins, 0);
        assert_eq!(got[0], 5);
        assert_eq!(got[1], (20 - 2) / 2); // 9
        assert!(got[0] + got[1] <= 20, "slack is left to the screen clear");
    }

    #[test]
    fn invisible_windows_get_nothing() {
        let wins = windows_with_caps([0, 0, 0, 0], [true, false, true, false]);
        let got = apportion(10, &wins, 0);
        assert_eq!(got[1], 0);
        assert_eq!(got[3], 0);
        assert_eq!(got[0], (10 - 2) / 2);
        assert_eq!(got[2], (10 - 2) / 2);
    }

    #[test]
    fn start_index_skips_already_drawn_windows() {
        let wins = windows_with_caps([7, 0, 0, 0], [true, true, true, true]);
        let got = apportion(9, &wins, 1);
        assert_eq!(got[0], 0, "window before start is not re-allotted");
        assert_eq!(got[1], (9 - 3) / 3);
    }

    #[test]
    fn tiny_budget_yields_header_only_windows() {
        let wins = windows_with_caps([0, 0, 0, 0], [true, true, true, true]);
        let got = apportion(4, &wins, 0);
        assert_eq!(got, [0, 0, 0, 0], "zero rows still means a header each");
    }

    #[test]
    fn greedy_caps_can_starve_later_windows() {
        let wins = windows_with_caps([30, 0, 0, 0], [true, true, false, false]);
        let got = apportion(20, &wins, 0);
        // the cap scan stopped at the first window, so wins == 1 and
        // the uncapped window falls back to the full floor share
        assert_eq!(got[0], 30);
        assert_eq!(got[1], (20 - 1) / 1);
    }
}
