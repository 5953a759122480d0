//! Durable record of which units of a document are already synthesized.
//!
//! One JSON file per document (`.checkpoint_<stem>.json` in the output dir),
//! rewritten atomically after every completed unit. A checkpoint is only used
//! for resume while it still describes the same document bytes and every
//! unit it lists still has a non-empty artifact on disk.

mod store;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use store::CheckpointStore;
pub use validate::{
    resume_from, validate, CheckpointInvalid, CheckpointInvalidKind, ResumeDecision,
};

/// Format tag written into every checkpoint.
pub const CHECKPOINT_VERSION: &str = "2.0";

/// On-disk checkpoint record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Document file name.
    pub file: String,
    /// Absolute document path at the time of the run.
    pub file_path: String,
    /// SHA-256 hex of the document bytes.
    pub file_hash: String,
    pub total_chunks: usize,
    /// Sorted, de-duplicated indices of completed units.
    pub completed_chunks: Vec<usize>,
    /// Local time of the last update.
    pub timestamp: String,
    pub voice: String,
    pub version: String,
}

impl Checkpoint {
    /// Read the checkpoint at `path` without validating it. `None` when absent.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let Some(bytes) = store::read_raw(path)? else {
            return Ok(None);
        };
        let checkpoint = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse checkpoint: {}", path.display()))?;
        Ok(Some(checkpoint))
    }
}
