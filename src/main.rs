use std::io::{self, Write};

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use crossterm::style::{Attribute, ResetColor, SetAttribute};
use crossterm::{cursor, execute, terminal};
use log::warn;

use rtop::core::engine::{validate_settings, FrameEngine, Settings};
use rtop::providers::{sys_stats, ProcStatsReader, ProcTableReader};
use rtop::{RcFile, Result, RtopError};

fn cli() -> Command {
    Command::new("rtop")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Interactive process and resource monitor")
        .arg(
            Arg::new("batch")
                .short('b')
                .long("batch")
                .action(ArgAction::SetTrue)
                .help("Plain-text output suitable for redirection"),
        )
        .arg(
            Arg::new("cmdline")
                .short('c')
                .action(ArgAction::SetTrue)
                .help("Start with full command lines instead of names"),
        )
        .arg(
            Arg::new("delay")
                .short('d')
                .long("delay")
                .value_name("SECS")
                .value_parser(value_parser!(f32))
                .help("Seconds between refreshes"),
        )
        .arg(
            Arg::new("idle")
                .short('i')
                .action(ArgAction::SetTrue)
                .help("Start with idle tasks suppressed"),
        )
        .arg(
            Arg::new("iterations")
                .short('n')
                .long("iterations")
                .value_name("COUNT")
                .value_parser(value_parser!(usize))
                .help("Exit after this many refreshes"),
        )
        .arg(
            Arg::new("pid")
                .short('p')
                .long("pid")
                .value_name("PID")
                .action(ArgAction::Append)
                .value_parser(value_parser!(i32))
                .help("Monitor only this process (repeatable)"),
        )
        .arg(
            Arg::new("secure")
                .short('s')
                .long("secure")
                .action(ArgAction::SetTrue)
                .help("Disable kill, renice and delay changes"),
        )
        .arg(
            Arg::new("cumulative")
                .short('S')
                .action(ArgAction::SetTrue)
                .help("Start with cumulative (child-inclusive) times"),
        )
}

/// Puts the terminal into raw mode for the session and restores it on
/// every exit path, including panics and errors.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().map_err(|e| RtopError::term(format!("raw mode: {e}")))?;
        let mut so = io::stdout();
        execute!(so, cursor::Hide, terminal::Clear(terminal::ClearType::All))
            .map_err(|e| RtopError::term(format!("terminal setup: {e}")))?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut so = io::stdout();
        let _ = execute!(so, SetAttribute(Attribute::Reset), ResetColor, cursor::Show);
        let _ = terminal::disable_raw_mode();
        let _ = writeln!(so);
    }
}

fn main() {
    rtop::init_logging();
    if let Err(e) = run() {
        eprintln!("rtop: {e}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let rc = match RcFile::default_path() {
        Some(path) => RcFile::load(&path).context("reading the configuration file")?,
        None => {
            warn!("no home directory, skipping the rcfile");
            None
        }
    };

    let settings = Settings {
        batch: matches.get_flag("batch"),
        delay: matches
            .get_one::<f32>("delay")
            .copied()
            .or(rc.as_ref().map(|r| r.delay))
            .unwrap_or(3.0),
        iterations: matches.get_one::<usize>("iterations").copied(),
        secure: matches.get_flag("secure"),
        pids: matches.get_many::<i32>("pid").unwrap_or_default().copied().collect(),
        irix_mode: true,
    };
    validate_settings(&settings)?;

    let stats = ProcStatsReader::new()?;
    let procs = ProcTableReader::new();
    let page_kb = sys_stats::page_size_kb();
    let hertz = sys_stats::clock_ticks();

    let interactive = !settings.batch;
    let mut engine = FrameEngine::new(procs, stats, settings, rc, page_kb, hertz);
    if matches.get_flag("cmdline") {
        engine.toggle_all(|w| w.flags.show_cmdline = !w.flags.show_cmdline);
    }
    if matches.get_flag("idle") {
        engine.toggle_all(|w| w.flags.show_idle = !w.flags.show_idle);
    }
    if matches.get_flag("cumulative") {
        engine.toggle_all(|w| w.flags.show_ctimes = !w.flags.show_ctimes);
    }

    let guard = if interactive { Some(TerminalGuard::enter()?) } else { None };
    let outcome = engine.run();
    drop(guard);
    Ok(outcome?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }
}
