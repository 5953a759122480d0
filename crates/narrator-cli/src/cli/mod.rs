//! CLI for narrator.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use narrator_core::config;
use std::path::PathBuf;

use commands::{run_documents, run_extract, run_split, run_status, run_usage, RunArgs};

/// Top-level CLI for narrator.
#[derive(Debug, Parser)]
#[command(name = "narrator")]
#[command(about = "narrator: markdown to audiobook with pooled API keys and resumable runs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Synthesize one or more markdown documents into audio.
    Run {
        /// Markdown files, processed one after another.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Concurrent workers per document (default from config; clamped to the key count).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Skip units recorded in a valid checkpoint from an earlier run.
        #[arg(long)]
        resume: bool,
        /// Voice passed to the synthesizer (default from config).
        #[arg(long)]
        voice: Option<String>,
        /// Keep the assembled WAV and skip conversion.
        #[arg(long)]
        no_transcode: bool,
    },

    /// Split a markdown file into `Chunks/<stem>_part_NNN.md` files.
    Split {
        /// Path to the markdown file.
        file: PathBuf,
        /// Max tokens per part.
        #[arg(long, default_value = "500", value_name = "N")]
        tokens: usize,
    },

    /// Write one cleaned unit of a document to `chunk_<index>.md`.
    Extract {
        /// Path to the markdown file.
        file: PathBuf,
        /// Zero-based unit index.
        index: usize,
        /// Max tokens per unit (default from config, matching `run`).
        #[arg(long, value_name = "N")]
        tokens: Option<usize>,
    },

    /// Show today's request count per API key.
    Usage,

    /// Show checkpoint progress for a document.
    Status {
        /// Path to the markdown file.
        file: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                files,
                workers,
                resume,
                voice,
                no_transcode,
            } => {
                let args = RunArgs {
                    files,
                    workers,
                    resume,
                    voice,
                    no_transcode,
                };
                run_documents(&cfg, args).await?;
            }
            CliCommand::Split { file, tokens } => run_split(&file, tokens)?,
            CliCommand::Extract {
                file,
                index,
                tokens,
            } => {
                let tokens = tokens.unwrap_or(cfg.max_tokens_per_unit);
                let cwd = std::env::current_dir()?;
                run_extract(&file, index, tokens, &cwd)?;
            }
            CliCommand::Usage => run_usage(&cfg)?,
            CliCommand::Status { file } => run_status(&cfg, &file)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
