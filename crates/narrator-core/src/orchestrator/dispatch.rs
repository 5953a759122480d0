//! Bounded worker pool for the pending units of one document.
//!
//! Workers pull units from a shared queue and report back over a channel;
//! the collector on the calling thread is the only writer of the status table.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

use crate::checkpoint::CheckpointStore;
use crate::chunker::Unit;
use crate::key_pool::KeyPool;
use crate::retry::{KeyedAttempts, RetryPolicy, UnitError};
use crate::storage::{self, wav::{self, WavSpec}};
use crate::synth::Synthesizer;
use crate::usage_ledger::{RequestOutcome, UsageLedger};

use super::paths::RunPaths;
use super::progress::ProgressReporter;

/// Status of one unit as seen by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Pending,
    InFlight,
    Done,
    Failed,
}

/// Everything a worker needs, shared by `Arc`.
pub(super) struct WorkerContext {
    pub(super) pool: Arc<KeyPool>,
    pub(super) ledger: Arc<UsageLedger>,
    pub(super) synthesizer: Arc<dyn Synthesizer>,
    pub(super) checkpoint: Arc<CheckpointStore>,
    pub(super) paths: RunPaths,
    pub(super) policy: RetryPolicy,
    pub(super) voice: String,
    pub(super) audio: WavSpec,
}

enum WorkerEvent {
    Started(usize),
    Finished(usize, Result<u32, UnitError>),
}

pub(super) struct DispatchSummary {
    pub(super) status: Vec<UnitStatus>,
    pub(super) failed: Vec<(usize, UnitError)>,
}

/// Run `pending` with at most `workers` threads. `status` holds every unit of
/// the document (resumed ones already `Done`).
pub(super) fn dispatch(
    ctx: Arc<WorkerContext>,
    pending: Vec<Unit>,
    mut status: Vec<UnitStatus>,
    workers: usize,
    progress: &ProgressReporter<'_>,
) -> DispatchSummary {
    let count = pending.len();
    let work: Arc<Mutex<VecDeque<Unit>>> = Arc::new(Mutex::new(pending.into_iter().collect()));
    let (tx, rx) = mpsc::channel();
    let num_workers = workers.min(count).max(1);
    tracing::info!(units = count, workers = num_workers, "dispatching units");

    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let ctx = Arc::clone(&ctx);
        handles.push(std::thread::spawn(move || loop {
            let unit = match work.lock().unwrap_or_else(PoisonError::into_inner).pop_front() {
                Some(u) => u,
                None => break,
            };
            let _ = tx.send(WorkerEvent::Started(unit.index));
            let res = process_unit(&ctx, &unit);
            if tx.send(WorkerEvent::Finished(unit.index, res)).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    let mut failed = Vec::new();
    let mut to_receive = count;
    while to_receive > 0 {
        let event = match rx.recv() {
            Ok(ev) => ev,
            Err(_) => {
                tracing::error!("worker result channel closed (worker may have panicked)");
                break;
            }
        };
        match event {
            WorkerEvent::Started(index) => status[index] = UnitStatus::InFlight,
            WorkerEvent::Finished(index, res) => {
                to_receive -= 1;
                match res {
                    Ok(attempts) => {
                        status[index] = UnitStatus::Done;
                        tracing::info!(unit = index, attempts, "unit done");
                    }
                    Err(e) => {
                        status[index] = UnitStatus::Failed;
                        tracing::error!(unit = index, "unit failed: {}", e);
                        failed.push((index, e));
                    }
                }
                progress.report(count_of(&status, UnitStatus::Done), failed.len());
            }
        }
    }
    for h in handles {
        if h.join().is_err() {
            tracing::error!("worker thread panicked");
        }
    }
    failed.sort_by_key(|(i, _)| *i);
    DispatchSummary { status, failed }
}

pub(super) fn count_of(status: &[UnitStatus], wanted: UnitStatus) -> usize {
    status.iter().filter(|s| **s == wanted).count()
}

/// assign -> attempts -> artifact -> release + record -> checkpoint.
fn process_unit(ctx: &WorkerContext, unit: &Unit) -> Result<u32, UnitError> {
    let live = ctx.pool.live_credentials();
    if live.is_empty() {
        tracing::warn!(unit = unit.index, "no API keys left for unit");
        return Err(UnitError::NoKeysLeft);
    }
    let assigned = ctx.ledger.assign(unit.index, &live)?;
    tracing::debug!(unit = unit.index, key = %assigned, tokens = unit.tokens, "unit assigned");

    let attempts = KeyedAttempts {
        pool: &ctx.pool,
        ledger: &ctx.ledger,
        synthesizer: ctx.synthesizer.as_ref(),
        policy: ctx.policy,
        voice: &ctx.voice,
    };
    let done = attempts.run(unit.index, &assigned, &unit.text)?;

    let artifact = ctx.paths.unit_artifact(unit.index);
    let stored = wav::encode(&ctx.audio, &done.pcm)
        .and_then(|bytes| storage::write_atomic(&artifact, &bytes));

    ctx.pool.release(&done.credential);
    if let Err(e) = ctx.ledger.record(&done.credential, RequestOutcome::Success) {
        tracing::warn!(key = %done.credential, "failed to persist usage ledger: {:#}", e);
    }
    if let Err(e) = stored {
        return Err(UnitError::Storage(format!("{:#}", e)));
    }

    // The artifact on disk is what assembly trusts; a lost checkpoint
    // update only means this unit is redone on resume.
    if let Err(e) = ctx.checkpoint.mark_completed(unit.index) {
        tracing::warn!(unit = unit.index, "failed to update checkpoint: {:#}", e);
    }
    Ok(done.attempts)
}
