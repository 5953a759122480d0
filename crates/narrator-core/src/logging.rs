//! Structured logs for long batch runs.
//!
//! Runs can take hours, so the default sink is an append-only file under the
//! XDG state dir that survives the terminal. Console output stays reserved for
//! progress lines; `init_logging_stderr` is the fallback when the file cannot
//! be opened.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,narrator=debug,narrator_core=debug";

/// `RUST_LOG` when set and valid, else [`DEFAULT_FILTER`].
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `~/.local/state/narrator/narrator.log`; the directory is created if needed.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("narrator")?;
    dirs.place_state_file("narrator.log")
        .context("create narrator state directory")
}

/// Install a subscriber that appends to [`log_file_path`]. Errors (unwritable
/// state dir, subscriber already set) are returned so the caller can fall back.
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {}", e))?;

    tracing::info!(pid = std::process::id(), "narrator logging to {}", path.display());
    Ok(())
}

/// Log to stderr only. Never fails; a second subscriber is silently ignored.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
