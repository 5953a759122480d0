//! Document pipeline: split, resume, dispatch, assemble.
//!
//! One [`Orchestrator`] is built per process and reused for every document,
//! so the key pool and usage ledger are shared across documents:
//! read + fingerprint → clean markdown → chunk → checkpoint validation →
//! worker pool → completeness check → ordered assembly → optional
//! transcode → cleanup.

mod assemble;
mod dispatch;
mod paths;
mod phase;
mod progress;
mod run;

use std::sync::Arc;
use std::time::Duration;

use crate::chunker::TokenCounter;
use crate::config::NarratorConfig;
use crate::key_pool::KeyPool;
use crate::retry::{RetryPolicy, UnitError};
use crate::storage::wav::WavSpec;
use crate::synth::Synthesizer;
use crate::transcode::{TranscodeReport, Transcoder};
use crate::usage_ledger::UsageLedger;

pub use assemble::Assembled;
pub use dispatch::UnitStatus;
pub use paths::RunPaths;
pub use phase::RunPhase;
pub use progress::ProgressStats;

/// Per-process run settings derived from config.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub max_tokens_per_unit: usize,
    pub workers: usize,
    pub voice: String,
    pub output_subdir: String,
    pub audio: WavSpec,
    pub retry: RetryPolicy,
}

impl RunSettings {
    /// `credential_count` bounds workers and is the default attempt budget.
    pub fn from_config(cfg: &NarratorConfig, credential_count: usize) -> Self {
        let audio = cfg.audio_or_default();
        let max_attempts = cfg
            .max_attempts
            .unwrap_or(credential_count as u32)
            .max(1);
        Self {
            max_tokens_per_unit: cfg.max_tokens_per_unit.max(1),
            workers: cfg.workers.max(1),
            voice: cfg.voice.clone(),
            output_subdir: cfg.output_subdir.clone(),
            audio: WavSpec {
                sample_rate: audio.sample_rate,
                channels: audio.channels,
                bits_per_sample: audio.bits_per_sample,
            },
            retry: RetryPolicy {
                max_attempts,
                cooldown: cfg.cooldown(),
            },
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.retry.cooldown = cooldown;
        self
    }
}

/// Per-document options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip units listed in a valid checkpoint.
    pub resume: bool,
}

/// Result of one document run that got as far as dispatch.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every unit synthesized and assembled; artifacts and checkpoint removed.
    Completed {
        output: std::path::PathBuf,
        assembled: Assembled,
        transcoded: Option<TranscodeReport>,
        units: usize,
    },
    /// Some units have no audio. Artifacts and checkpoint are kept for `--resume`.
    Partial {
        missing: Vec<usize>,
        failed: Vec<(usize, UnitError)>,
        units: usize,
    },
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

pub struct Orchestrator {
    pool: Arc<KeyPool>,
    ledger: Arc<UsageLedger>,
    synthesizer: Arc<dyn Synthesizer>,
    transcoder: Option<Arc<dyn Transcoder>>,
    counter: Arc<dyn TokenCounter>,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        pool: Arc<KeyPool>,
        ledger: Arc<UsageLedger>,
        synthesizer: Arc<dyn Synthesizer>,
        counter: Arc<dyn TokenCounter>,
        settings: RunSettings,
    ) -> Self {
        Self {
            pool,
            ledger,
            synthesizer,
            transcoder: None,
            counter,
            settings,
        }
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn pool(&self) -> &KeyPool {
        &self.pool
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }
}
