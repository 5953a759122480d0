//! One document from source text to final audio.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::Sender;

use crate::checkpoint::{self, CheckpointStore, ResumeDecision};
use crate::checksum::sha256_bytes;
use crate::chunker;
use crate::markdown::clean_markdown;
use crate::storage;

use super::assemble::{assemble, remove_unit_artifacts};
use super::dispatch::{count_of, dispatch, DispatchSummary, UnitStatus, WorkerContext};
use super::paths::RunPaths;
use super::phase::{PhaseTracker, RunPhase};
use super::progress::{ProgressReporter, ProgressStats};
use super::{Orchestrator, RunOptions, RunOutcome};

impl Orchestrator {
    /// Process one document. Returns `Err` when the document cannot be read or
    /// split, or when assembly fails; unit failures yield `RunOutcome::Partial`.
    pub fn run_document(
        &self,
        source: &Path,
        opts: RunOptions,
        progress_tx: Option<&Sender<ProgressStats>>,
    ) -> Result<RunOutcome> {
        let paths = RunPaths::new(source, &self.settings.output_subdir)?;
        let document = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| paths.stem.clone());
        let mut phase = PhaseTracker::new(document.clone());

        let bytes = std::fs::read(source)
            .with_context(|| format!("read document: {}", source.display()))?;
        let file_hash = sha256_bytes(&bytes);
        let text = String::from_utf8(bytes)
            .with_context(|| format!("document is not valid UTF-8: {}", source.display()))?;

        phase.advance(RunPhase::Splitting);
        let cleaned = clean_markdown(&text);
        let report = chunker::chunk_with_report(
            &cleaned,
            self.settings.max_tokens_per_unit,
            self.counter.as_ref(),
        );
        if report.units.is_empty() {
            anyhow::bail!("{}: no speakable text", source.display());
        }
        let unit_count = report.units.len();
        tracing::info!(
            document = %document,
            units = unit_count,
            paragraphs = report.paragraphs,
            tokens = report.total_tokens(),
            max_tokens = self.settings.max_tokens_per_unit,
            "document split"
        );
        paths.ensure_out_dir()?;

        let store = CheckpointStore::new(
            paths.checkpoint(),
            source,
            file_hash.clone(),
            unit_count,
            self.settings.voice.clone(),
        );
        let mut done: BTreeSet<usize> = BTreeSet::new();
        if opts.resume {
            phase.advance(RunPhase::Resuming);
            let decision = checkpoint::resume_from(
                &paths.checkpoint(),
                source,
                &file_hash,
                unit_count,
                |i| paths.unit_artifact(i),
            )?;
            match decision {
                ResumeDecision::Fresh => {
                    tracing::info!(document = %document, "no checkpoint found, starting fresh")
                }
                ResumeDecision::Resume(completed) => {
                    tracing::info!(
                        document = %document,
                        completed = completed.len(),
                        total = unit_count,
                        "resuming from checkpoint"
                    );
                    done.extend(completed);
                }
                ResumeDecision::Discard(why) => {
                    tracing::warn!(document = %document, "checkpoint discarded: {}", why);
                    store.remove()?;
                }
            }
        } else {
            store.remove()?;
        }
        let store = Arc::new(store.with_completed(done.iter().copied()));

        let status: Vec<UnitStatus> = (0..unit_count)
            .map(|i| {
                if done.contains(&i) {
                    UnitStatus::Done
                } else {
                    UnitStatus::Pending
                }
            })
            .collect();
        let pending: Vec<chunker::Unit> = report
            .units
            .into_iter()
            .filter(|u| !done.contains(&u.index))
            .collect();

        phase.advance(RunPhase::Dispatching);
        let reporter = ProgressReporter::new(progress_tx, document.clone(), unit_count, done.len());
        reporter.report(done.len(), 0);
        let workers = self
            .settings
            .workers
            .min(self.pool.len().max(1))
            .min(pending.len().max(1));
        let summary = if pending.is_empty() {
            tracing::info!(document = %document, "all units already done");
            DispatchSummary {
                status,
                failed: Vec::new(),
            }
        } else {
            let ctx = Arc::new(WorkerContext {
                pool: Arc::clone(&self.pool),
                ledger: Arc::clone(&self.ledger),
                synthesizer: Arc::clone(&self.synthesizer),
                checkpoint: Arc::clone(&store),
                paths: paths.clone(),
                policy: self.settings.retry,
                voice: self.settings.voice.clone(),
                audio: self.settings.audio,
            });
            dispatch(ctx, pending, status, workers, &reporter)
        };
        tracing::info!(
            document = %document,
            done = count_of(&summary.status, UnitStatus::Done),
            failed = summary.failed.len(),
            pool = %self.pool.stats(),
            "dispatch finished"
        );

        // A stale artifact from an earlier run does not make a unit done.
        let missing: Vec<usize> = summary
            .status
            .iter()
            .enumerate()
            .filter(|(i, s)| {
                **s != UnitStatus::Done || !storage::is_nonempty_file(&paths.unit_artifact(*i))
            })
            .map(|(i, _)| i)
            .collect();
        if !missing.is_empty() {
            phase.advance(RunPhase::Failed);
            tracing::warn!(
                document = %document,
                missing = missing.len(),
                "units missing; partial progress kept, rerun with --resume to finish"
            );
            return Ok(RunOutcome::Partial {
                missing,
                failed: summary.failed,
                units: unit_count,
            });
        }

        phase.advance(RunPhase::Assembling);
        let assembled = match assemble(&paths, unit_count) {
            Ok(a) => a,
            Err(e) => {
                phase.advance(RunPhase::Failed);
                return Err(e.context(format!("assemble {}", document)));
            }
        };

        let mut output = assembled.path.clone();
        let mut transcoded = None;
        if let Some(t) = &self.transcoder {
            let target = paths.final_with_extension(t.extension());
            match t.transcode(&assembled.path, &target) {
                Ok(report) => {
                    output = report.output.clone();
                    transcoded = Some(report);
                }
                Err(e) => tracing::warn!(
                    document = %document,
                    "conversion failed, keeping WAV: {:#}",
                    e
                ),
            }
        }

        remove_unit_artifacts(&paths, unit_count);
        if let Err(e) = store.remove() {
            tracing::warn!(document = %document, "failed to delete checkpoint: {:#}", e);
        }
        phase.advance(RunPhase::Done);
        tracing::info!(
            document = %document,
            output = %output.display(),
            frames = assembled.frames,
            pool = %self.pool.stats(),
            "document complete"
        );
        debug_assert_eq!(phase.current(), RunPhase::Done);

        Ok(RunOutcome::Completed {
            output,
            assembled,
            transcoded,
            units: unit_count,
        })
    }
}
