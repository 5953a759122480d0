//! Shared fixtures for pipeline integration tests.
//!
//! [`ScriptedSynth`] stands in for the remote service: it returns one 16-bit
//! mono frame per word of the unit text, and fails with a scripted error for
//! any unit that contains a configured marker word.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use narrator_core::chunker::WordCounter;
use narrator_core::credential::{from_secrets, Credential};
use narrator_core::key_pool::KeyPool;
use narrator_core::orchestrator::{Orchestrator, RunSettings};
use narrator_core::retry::{RetryPolicy, SynthesisError};
use narrator_core::storage::wav::WavSpec;
use narrator_core::synth::Synthesizer;
use narrator_core::usage_ledger::UsageLedger;

pub const MONO_16: WavSpec = WavSpec {
    sample_rate: 24_000,
    channels: 1,
    bits_per_sample: 16,
};

#[derive(Default)]
pub struct ScriptedSynth {
    failure: Option<(String, SynthesisError)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSynth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any unit whose text contains `marker` fails with HTTP 429 quota.
    pub fn quota_on(marker: &str) -> Self {
        Self::fail_on(
            marker,
            SynthesisError::Http {
                status: 429,
                message: "RESOURCE_EXHAUSTED: quota exceeded".into(),
            },
        )
    }

    /// Any unit whose text contains `marker` fails with `error`.
    pub fn fail_on(marker: &str, error: SynthesisError) -> Self {
        Self {
            failure: Some((marker.to_string(), error)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Unit texts seen so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Synthesizer for ScriptedSynth {
    fn synthesize(
        &self,
        _credential: &Credential,
        text: &str,
        _voice: &str,
    ) -> Result<Vec<u8>, SynthesisError> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some((marker, error)) = &self.failure {
            if text.contains(marker.as_str()) {
                return Err(error.clone());
            }
        }
        let words = text.split_whitespace().count();
        Ok((0..words)
            .flat_map(|i| (i as i16).to_le_bytes())
            .collect())
    }
}

pub fn settings(max_tokens: usize, workers: usize, max_attempts: u32) -> RunSettings {
    RunSettings {
        max_tokens_per_unit: max_tokens,
        workers,
        voice: "Kore".into(),
        output_subdir: "TTS".into(),
        audio: MONO_16,
        retry: RetryPolicy {
            max_attempts,
            cooldown: Duration::from_millis(20),
        },
    }
}

/// Orchestrator over `secrets` with an in-memory ledger and word budgeting.
pub fn orchestrator(
    secrets: &[&str],
    synth: Arc<ScriptedSynth>,
    settings: RunSettings,
) -> Orchestrator {
    let pool = Arc::new(KeyPool::new(from_secrets(secrets.iter().copied())));
    Orchestrator::new(
        pool,
        Arc::new(UsageLedger::in_memory(9)),
        synth,
        Arc::new(WordCounter),
        settings,
    )
}

/// Four paragraphs of five words each; the third carries `gamma`.
pub fn four_paragraphs() -> String {
    [
        "alpha one two three four",
        "beta one two three four",
        "gamma one two three four",
        "delta one two three four",
    ]
    .join("\n\n")
}

pub fn write_doc(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// Names of hidden files (`.chunk_*`, `.checkpoint_*`) left in `dir`.
pub fn hidden_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('.'))
        .collect();
    names.sort();
    names
}
