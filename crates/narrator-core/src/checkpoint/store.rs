//! Checkpoint file writer shared by all workers of one document.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::Local;

use super::{Checkpoint, CHECKPOINT_VERSION};
use crate::storage;

/// Owns the checkpoint path and the completed set behind one mutex.
/// `mark_completed` rewrites the whole file before releasing the lock.
pub struct CheckpointStore {
    path: PathBuf,
    file: String,
    file_path: String,
    file_hash: String,
    total_chunks: usize,
    voice: String,
    completed: Mutex<BTreeSet<usize>>,
}

impl CheckpointStore {
    pub fn new(
        path: impl Into<PathBuf>,
        source: &Path,
        file_hash: impl Into<String>,
        total_chunks: usize,
        voice: impl Into<String>,
    ) -> Self {
        let file = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_path = source
            .canonicalize()
            .unwrap_or_else(|_| source.to_path_buf())
            .to_string_lossy()
            .into_owned();
        Self {
            path: path.into(),
            file,
            file_path,
            file_hash: file_hash.into(),
            total_chunks,
            voice: voice.into(),
            completed: Mutex::new(BTreeSet::new()),
        }
    }

    /// Seed the completed set (from a validated checkpoint). Nothing is written.
    pub fn with_completed(self, done: impl IntoIterator<Item = usize>) -> Self {
        self.lock().extend(done);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `index` as done and persist the whole checkpoint.
    pub fn mark_completed(&self, index: usize) -> Result<()> {
        let mut completed = self.lock();
        completed.insert(index);
        let record = self.record(&completed);
        let json = serde_json::to_vec_pretty(&record).context("serialize checkpoint")?;
        storage::write_atomic(&self.path, &json)
            .with_context(|| format!("write checkpoint: {}", self.path.display()))?;
        tracing::debug!(
            unit = index,
            done = completed.len(),
            total = self.total_chunks,
            "checkpoint updated"
        );
        Ok(())
    }

    /// Completed indices in ascending order.
    pub fn completed(&self) -> Vec<usize> {
        self.lock().iter().copied().collect()
    }

    pub fn is_completed(&self, index: usize) -> bool {
        self.lock().contains(&index)
    }

    /// Delete the checkpoint file (after successful assembly).
    pub fn remove(&self) -> Result<()> {
        storage::remove_if_exists(&self.path)?;
        storage::remove_if_exists(&storage::temp_path(&self.path))?;
        Ok(())
    }

    fn record(&self, completed: &BTreeSet<usize>) -> Checkpoint {
        Checkpoint {
            file: self.file.clone(),
            file_path: self.file_path.clone(),
            file_hash: self.file_hash.clone(),
            total_chunks: self.total_chunks,
            completed_chunks: completed.iter().copied().collect(),
            timestamp: Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            voice: self.voice.clone(),
            version: CHECKPOINT_VERSION.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<usize>> {
        self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read a checkpoint file. `Ok(None)` when it does not exist.
pub(super) fn read_raw(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read checkpoint: {}", path.display())),
    }
}
