//! rtop: a terminal-resident process and resource monitor.
//!
//! The crate splits into three layers: `providers` samples raw kernel
//! counters, `core` owns the windows, field catalog, history deltas and
//! the refresh engine, and `ui` handles capability strings, keyboard
//! input and frame rendering.

pub mod error;
pub use error::{Result, RtopError};

pub mod core;
pub mod providers;
pub mod ui;

pub use crate::core::config::RcFile;
pub use crate::core::engine::FrameEngine;

/// Initialize logging from `RUST_LOG`, warnings by default.  Log output
/// goes to stderr so it never corrupts the display.
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
}
