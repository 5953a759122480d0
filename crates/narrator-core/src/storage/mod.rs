//! Disk I/O and file lifecycle.
//!
//! Every artifact is written to `<name>.part`, fsynced, then atomically
//! renamed to its final name, so a crash never leaves a truncated file under
//! a final name. WAV encoding and decoding live in [`wav`].

pub mod wav;

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.wav` → `a.wav.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Write `bytes` to `final_path` via `<final_path>.part` + fsync + rename.
pub fn write_atomic(final_path: &Path, bytes: &[u8]) -> Result<()> {
    let tp = temp_path(final_path);
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tp)
        .with_context(|| format!("failed to create temp file: {}", tp.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("failed to write temp file: {}", tp.display()))?;
    file.sync_all().context("storage sync failed")?;
    drop(file);
    finalize(&tp, final_path)
}

/// Atomically rename a finished temp file onto its final path.
pub fn finalize(temp_path: &Path, final_path: &Path) -> Result<()> {
    std::fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp_path.display(),
            final_path.display()
        )
    })
}

/// Remove a file, treating "already gone" as success. Returns whether it existed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

/// True when `path` exists and is a non-empty regular file.
pub fn is_nonempty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
