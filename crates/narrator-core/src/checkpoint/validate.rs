//! Decide whether a stored checkpoint can be trusted for resume.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::store::read_raw;
use super::{Checkpoint, CHECKPOINT_VERSION};
use crate::storage;

/// Why a stored checkpoint was rejected.
#[derive(Debug)]
pub struct CheckpointInvalid {
    pub kind: CheckpointInvalidKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointInvalidKind {
    /// The document no longer exists.
    SourceMissing,
    /// The document bytes hash differently from the stored fingerprint.
    SourceChanged,
    /// Chunking now yields a different unit count (e.g. token budget changed).
    UnitCountChanged { stored: usize, current: usize },
    /// Unparseable JSON, wrong version, or out-of-range indices.
    InvalidFormat(String),
    /// Listed units whose artifact is gone or empty.
    MissingArtifacts(Vec<usize>),
}

impl fmt::Display for CheckpointInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CheckpointInvalidKind::SourceMissing => write!(f, "source file no longer exists"),
            CheckpointInvalidKind::SourceChanged => {
                write!(f, "source file has been modified since checkpoint")
            }
            CheckpointInvalidKind::UnitCountChanged { stored, current } => write!(
                f,
                "document now splits into {} units (checkpoint has {})",
                current, stored
            ),
            CheckpointInvalidKind::InvalidFormat(why) => {
                write!(f, "invalid checkpoint format: {}", why)
            }
            CheckpointInvalidKind::MissingArtifacts(units) => {
                write!(f, "{} completed unit file(s) missing", units.len())?;
                let shown: Vec<String> = units.iter().take(8).map(|u| u.to_string()).collect();
                write!(f, " (units {}", shown.join(", "))?;
                if units.len() > shown.len() {
                    write!(f, ", ...")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl std::error::Error for CheckpointInvalid {}

fn invalid(kind: CheckpointInvalidKind) -> CheckpointInvalid {
    CheckpointInvalid { kind }
}

/// Check `checkpoint` against the current document and artifacts.
/// Returns the completed indices on success.
pub fn validate<F>(
    checkpoint: &Checkpoint,
    source: &Path,
    current_hash: &str,
    current_units: usize,
    artifact_for: F,
) -> Result<Vec<usize>, CheckpointInvalid>
where
    F: Fn(usize) -> PathBuf,
{
    if checkpoint.version != CHECKPOINT_VERSION {
        return Err(invalid(CheckpointInvalidKind::InvalidFormat(format!(
            "unsupported version {:?}",
            checkpoint.version
        ))));
    }
    if !source.exists() {
        return Err(invalid(CheckpointInvalidKind::SourceMissing));
    }
    if checkpoint.file_hash != current_hash {
        return Err(invalid(CheckpointInvalidKind::SourceChanged));
    }
    if checkpoint.total_chunks != current_units {
        return Err(invalid(CheckpointInvalidKind::UnitCountChanged {
            stored: checkpoint.total_chunks,
            current: current_units,
        }));
    }
    if let Some(bad) = checkpoint
        .completed_chunks
        .iter()
        .find(|i| **i >= current_units)
    {
        return Err(invalid(CheckpointInvalidKind::InvalidFormat(format!(
            "unit {} out of range (total {})",
            bad, current_units
        ))));
    }

    let mut completed = checkpoint.completed_chunks.clone();
    completed.sort_unstable();
    completed.dedup();

    let missing: Vec<usize> = completed
        .iter()
        .copied()
        .filter(|i| !storage::is_nonempty_file(&artifact_for(*i)))
        .collect();
    if !missing.is_empty() {
        return Err(invalid(CheckpointInvalidKind::MissingArtifacts(missing)));
    }
    Ok(completed)
}

/// Outcome of looking for a checkpoint before dispatch.
#[derive(Debug)]
pub enum ResumeDecision {
    /// No checkpoint on disk.
    Fresh,
    /// Valid checkpoint; these units are already done.
    Resume(Vec<usize>),
    /// A checkpoint exists but cannot be trusted; the caller discards it.
    Discard(CheckpointInvalid),
}

/// Load and validate the checkpoint at `path`. I/O errors other than
/// "not found" propagate; everything else becomes a decision.
pub fn resume_from<F>(
    path: &Path,
    source: &Path,
    current_hash: &str,
    current_units: usize,
    artifact_for: F,
) -> Result<ResumeDecision>
where
    F: Fn(usize) -> PathBuf,
{
    let Some(bytes) = read_raw(path)? else {
        return Ok(ResumeDecision::Fresh);
    };
    let checkpoint: Checkpoint = match serde_json::from_slice(&bytes) {
        Ok(c) => c,
        Err(e) => {
            return Ok(ResumeDecision::Discard(invalid(
                CheckpointInvalidKind::InvalidFormat(e.to_string()),
            )))
        }
    };
    Ok(
        match validate(&checkpoint, source, current_hash, current_units, artifact_for) {
            Ok(done) => ResumeDecision::Resume(done),
            Err(e) => ResumeDecision::Discard(e),
        },
    )
}
