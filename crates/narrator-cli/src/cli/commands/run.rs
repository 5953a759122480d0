//! `narrator run` – synthesize documents one after another with a shared key pool.

use anyhow::{bail, Context, Result};
use narrator_core::chunker::Cl100kCounter;
use narrator_core::config::NarratorConfig;
use narrator_core::credential;
use narrator_core::key_pool::KeyPool;
use narrator_core::orchestrator::{Orchestrator, ProgressStats, RunOptions, RunOutcome, RunSettings};
use narrator_core::synth::CommandSynthesizer;
use narrator_core::transcode::FfmpegTranscoder;
use narrator_core::usage_ledger::UsageLedger;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::usage::print_usage;

/// Parsed `run` arguments.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub files: Vec<PathBuf>,
    pub workers: Option<usize>,
    pub resume: bool,
    pub voice: Option<String>,
    pub no_transcode: bool,
}

/// Config values with command-line overrides applied.
pub(crate) fn settings_for(cfg: &NarratorConfig, args: &RunArgs, credentials: usize) -> RunSettings {
    let mut settings = RunSettings::from_config(cfg, credentials);
    if let Some(w) = args.workers {
        settings.workers = w.max(1);
    }
    if let Some(v) = &args.voice {
        settings.voice = v.clone();
    }
    settings
}

pub async fn run_documents(cfg: &NarratorConfig, args: RunArgs) -> Result<()> {
    let Some(synth_cfg) = cfg.synth_command.as_ref() else {
        bail!("no [synth_command] configured; set program and args in the config file");
    };
    let creds = credential::load_from_env(&cfg.credential_env_prefix)?;
    let ledger = Arc::new(UsageLedger::open(
        UsageLedger::default_path()?,
        cfg.daily_request_threshold,
    )?);
    print_usage(&ledger, &creds);

    let settings = settings_for(cfg, &args, creds.len());
    tracing::info!(
        documents = args.files.len(),
        keys = creds.len(),
        workers = settings.workers,
        voice = %settings.voice,
        "starting run"
    );
    let pool = Arc::new(KeyPool::new(creds));
    let mut orch = Orchestrator::new(
        pool,
        ledger,
        Arc::new(CommandSynthesizer::from_config(synth_cfg)),
        Arc::new(Cl100kCounter::new()?),
        settings,
    );
    let transcode = cfg.transcode_or_default();
    if transcode.enabled && !args.no_transcode {
        orch = orch.with_transcoder(Arc::new(FfmpegTranscoder::new(transcode)));
    }
    let orch = Arc::new(orch);

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(16);
    const PROGRESS_INTERVAL_MS: u64 = 500;
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        while let Some(stats) = progress_rx.recv().await {
            let now = Instant::now();
            let finished = stats.units_done + stats.units_failed >= stats.unit_count;
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS || finished {
                let eta = stats
                    .eta_secs()
                    .map(|s| format!("{:.0}s", s))
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "  {}: {}/{} units ({:.1}%)  {} failed  {:.1} units/min  ETA {}",
                    stats.document,
                    stats.units_done,
                    stats.unit_count,
                    stats.fraction() * 100.0,
                    stats.units_failed,
                    stats.units_per_min(),
                    eta
                );
                last_print = now;
            }
        }
    });

    let opts = RunOptions {
        resume: args.resume,
    };
    let mut failures = 0usize;
    for file in &args.files {
        println!("{}", file.display());
        let orch = Arc::clone(&orch);
        let tx = progress_tx.clone();
        let path = file.clone();
        let result = tokio::task::spawn_blocking(move || orch.run_document(&path, opts, Some(&tx)))
            .await
            .context("document task panicked")?;
        match result {
            Ok(RunOutcome::Completed {
                output,
                transcoded,
                units,
                ..
            }) => {
                println!("  done: {} ({} units)", output.display(), units);
                if let Some(t) = transcoded {
                    println!("  size reduced by {:.1}%", t.reduction_percent());
                }
            }
            Ok(RunOutcome::Partial {
                missing,
                failed,
                units,
            }) => {
                failures += 1;
                println!(
                    "  incomplete: {} of {} units missing; rerun with --resume",
                    missing.len(),
                    units
                );
                for (index, err) in failed {
                    println!("    unit {}: {}", index, err);
                }
            }
            Err(e) => {
                failures += 1;
                tracing::error!(document = %file.display(), "document failed: {:#}", e);
                println!("  failed: {:#}", e);
            }
        }
    }
    drop(progress_tx);
    let _ = progress_handle.await;

    tracing::info!(pool = %orch.pool().stats(), "run finished");
    if failures > 0 {
        bail!("{} of {} document(s) did not complete", failures, args.files.len());
    }
    Ok(())
}
