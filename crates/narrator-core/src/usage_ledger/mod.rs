//! Durable per-credential daily request counters and load-balanced assignment.
//!
//! The ledger is persisted as JSON under the XDG state dir after every
//! mutation, while the ledger lock is still held. All records are dropped
//! when the local date changes.

mod record;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::credential::Credential;
use record::UsageFile;

pub use record::{RequestOutcome, UsageRecord};

/// Every candidate credential is at or over the daily threshold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("all {total} API key(s) have reached the daily limit of {threshold} requests")]
pub struct AllExhausted {
    pub total: usize,
    pub threshold: u32,
}

/// Point-in-time copy of the ledger for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub date: String,
    pub threshold: u32,
    /// Records keyed by credential fingerprint.
    pub keys: Vec<(String, UsageRecord)>,
}

impl UsageSnapshot {
    pub fn requests(&self, fingerprint: &str) -> u32 {
        self.keys
            .iter()
            .find(|(fp, _)| fp == fingerprint)
            .map(|(_, r)| r.requests)
            .unwrap_or(0)
    }
}

pub struct UsageLedger {
    path: Option<PathBuf>,
    threshold: u32,
    inner: Mutex<UsageFile>,
}

impl UsageLedger {
    /// Default ledger location: `~/.local/state/narrator/usage.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("narrator")?;
        Ok(xdg_dirs.get_state_home().join("narrator").join("usage.json"))
    }

    /// Open (or start) the ledger stored at `path`.
    ///
    /// A missing file starts a fresh day. An unreadable or corrupt file is
    /// logged and replaced on the next write, since the counters are advisory.
    pub fn open(path: impl Into<PathBuf>, threshold: u32) -> Result<Self> {
        let path = path.into();
        let today = today();
        let mut file = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<UsageFile>(&bytes) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "usage ledger unreadable, starting fresh: {}", e);
                    UsageFile::fresh(today)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => UsageFile::fresh(today),
            Err(e) => {
                return Err(e).with_context(|| format!("read usage ledger: {}", path.display()))
            }
        };
        if file.roll_over(today) {
            tracing::info!(date = %file.date, "new day, usage counters reset");
        }
        let ledger = Self {
            path: Some(path),
            threshold,
            inner: Mutex::new(file),
        };
        {
            let guard = ledger.lock();
            ledger.persist(&guard)?;
        }
        Ok(ledger)
    }

    /// Ledger that is never written to disk.
    pub fn in_memory(threshold: u32) -> Self {
        Self {
            path: None,
            threshold,
            inner: Mutex::new(UsageFile::fresh(today())),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Count one request against `credential` and persist.
    pub fn record(&self, credential: &Credential, outcome: RequestOutcome) -> Result<()> {
        self.record_at(credential, outcome, Local::now().naive_local())
    }

    /// [`record`](Self::record) with an explicit local time.
    pub fn record_at(
        &self,
        credential: &Credential,
        outcome: RequestOutcome,
        now: NaiveDateTime,
    ) -> Result<()> {
        let mut file = self.lock();
        if file.roll_over(now.date()) {
            tracing::info!(date = %file.date, "new day, usage counters reset");
        }
        file.bump(credential.fingerprint(), outcome, now);
        let requests = file.requests(credential.fingerprint());
        tracing::debug!(key = %credential, requests, threshold = self.threshold, ?outcome, "request recorded");
        self.persist(&file)
    }

    pub fn is_exhausted(&self, credential: &Credential) -> bool {
        self.usage(credential) >= self.threshold
    }

    /// Requests recorded today for `credential`.
    pub fn usage(&self, credential: &Credential) -> u32 {
        let mut file = self.lock();
        file.roll_over(today());
        file.requests(credential.fingerprint())
    }

    /// Pick the credential for `unit_index`: `healthy[unit_index % healthy.len()]`
    /// where `healthy` keeps the configured order and skips exhausted keys.
    pub fn assign(
        &self,
        unit_index: usize,
        candidates: &[Credential],
    ) -> Result<Credential, AllExhausted> {
        let mut file = self.lock();
        file.roll_over(today());
        let healthy: Vec<&Credential> = candidates
            .iter()
            .filter(|c| file.requests(c.fingerprint()) < self.threshold)
            .collect();
        if healthy.is_empty() {
            return Err(AllExhausted {
                total: candidates.len(),
                threshold: self.threshold,
            });
        }
        let chosen = healthy[unit_index % healthy.len()];
        let natural = candidates.get(unit_index % candidates.len().max(1));
        if natural != Some(chosen) {
            tracing::debug!(
                unit = unit_index,
                key = %chosen,
                requests = file.requests(chosen.fingerprint()),
                "unit re-routed past exhausted key(s)"
            );
        }
        Ok(chosen.clone())
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let mut file = self.lock();
        file.roll_over(today());
        UsageSnapshot {
            date: file.date.clone(),
            threshold: self.threshold,
            keys: file
                .keys
                .iter()
                .map(|(fp, r)| (fp.clone(), r.clone()))
                .collect(),
        }
    }

    /// Write the whole file through a temp file in the same dir and rename it.
    fn persist(&self, file: &UsageFile) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir: {}", parent.display()))?;
        let json = serde_json::to_string_pretty(file).context("serialize usage ledger")?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("create temp file in {}", parent.display()))?;
        tmp.write_all(json.as_bytes())
            .context("write usage ledger temp file")?;
        tmp.as_file().sync_all().context("sync usage ledger temp file")?;
        tmp.persist(path)
            .with_context(|| format!("replace usage ledger: {}", path.display()))?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, UsageFile> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests;
