//! # Long Habit
//!
//! Effective tracking for long-term habits. Add the tasks you want to keep up,
//! give each an optional goal ("every 3 days"), and mark them done on the days
//! you do them. The task list shows when each habit was last completed and how
//! many days remain before it is due, or how many days it is late.
//!
//! The core is split in two:
//! *   [`status`] derives the display text, lateness and urgency of a task
//!     from its goal and completion history, given an explicit `now`.
//! *   [`table`] turns a task list into typed rows with category and name
//!     filters, row selection, and column sorting that orders by urgency.
//!
//! Around it sit JSON [`storage`], TOML settings in [`config`], the
//! [`commands`] shared by the CLI and the [`tui`].

pub mod commands;
pub mod config;
pub mod models;
pub mod status;
pub mod storage;
pub mod table;
pub mod tui;

use std::io::IsTerminal;

use anyhow::anyhow;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber. `RUST_LOG` wins over the flags.
pub fn init_tracing(verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
