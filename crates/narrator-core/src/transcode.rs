//! Optional conversion of the assembled WAV to a compressed format.
//!
//! Failure never loses audio: the WAV is only removed after the encoder
//! exited cleanly and produced a non-empty file.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::TranscodeConfig;
use crate::storage;

/// Sizes before and after conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeReport {
    pub output: PathBuf,
    pub source_bytes: u64,
    pub output_bytes: u64,
}

impl TranscodeReport {
    /// Percentage saved relative to the source (0 when the source is empty).
    pub fn reduction_percent(&self) -> f64 {
        if self.source_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.output_bytes as f64 / self.source_bytes as f64) * 100.0
    }
}

pub trait Transcoder: Send + Sync {
    /// Convert `wav` into `output`. On success the WAV has been deleted.
    fn transcode(&self, wav: &Path, output: &Path) -> Result<TranscodeReport>;

    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &str;
}

/// MP3 via an ffmpeg-compatible program (`-codec:a libmp3lame`).
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    cfg: TranscodeConfig,
}

impl FfmpegTranscoder {
    pub fn new(cfg: TranscodeConfig) -> Self {
        Self { cfg }
    }

    fn args(&self, wav: &Path, out: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = Vec::new();
        for a in ["-y", "-loglevel", "error", "-i"] {
            args.push(a.into());
        }
        args.push(wav.as_os_str().to_owned());
        for a in ["-codec:a", "libmp3lame", "-b:a"] {
            args.push(a.into());
        }
        args.push(self.cfg.bitrate.clone().into());
        args.push("-q:a".into());
        args.push(self.cfg.quality.to_string().into());
        // Output goes to a `.part` name, so the container must be explicit.
        args.push("-f".into());
        args.push("mp3".into());
        args.push(out.as_os_str().to_owned());
        args
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, wav: &Path, output: &Path) -> Result<TranscodeReport> {
        let source_bytes = std::fs::metadata(wav)
            .with_context(|| format!("WAV file not found: {}", wav.display()))?
            .len();
        let tmp = storage::temp_path(output);
        tracing::debug!(program = %self.cfg.program, wav = %wav.display(), "transcoding");

        let result = Command::new(&self.cfg.program)
            .args(self.args(wav, &tmp))
            .output()
            .with_context(|| format!("run {}", self.cfg.program))?;
        if !result.status.success() {
            let _ = storage::remove_if_exists(&tmp);
            let stderr = String::from_utf8_lossy(&result.stderr);
            bail!(
                "{} exited with {}: {}",
                self.cfg.program,
                result.status,
                stderr.trim()
            );
        }
        if !storage::is_nonempty_file(&tmp) {
            let _ = storage::remove_if_exists(&tmp);
            bail!("{} produced no output", self.cfg.program);
        }
        storage::finalize(&tmp, output)?;
        let output_bytes = std::fs::metadata(output)
            .with_context(|| format!("stat {}", output.display()))?
            .len();
        storage::remove_if_exists(wav)?;

        let report = TranscodeReport {
            output: output.to_path_buf(),
            source_bytes,
            output_bytes,
        };
        tracing::info!(
            output = %output.display(),
            source_mb = source_bytes as f64 / 1_048_576.0,
            output_mb = output_bytes as f64 / 1_048_576.0,
            "converted ({:.0}% smaller)",
            report.reduction_percent()
        );
        Ok(report)
    }

    fn extension(&self) -> &str {
        "mp3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_percent_handles_empty_source() {
        let r = TranscodeReport {
            output: PathBuf::from("a.mp3"),
            source_bytes: 0,
            output_bytes: 10,
        };
        assert_eq!(r.reduction_percent(), 0.0);
        let r = TranscodeReport {
            output: PathBuf::from("a.mp3"),
            source_bytes: 1000,
            output_bytes: 250,
        };
        assert!((r.reduction_percent() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn args_follow_encoder_settings() {
        let t = FfmpegTranscoder::new(TranscodeConfig::default());
        let args: Vec<String> = t
            .args(Path::new("in.wav"), Path::new("out.mp3.part"))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let joined = args.join(" ");
        assert!(joined.contains("-i in.wav"));
        assert!(joined.contains("-codec:a libmp3lame -b:a 128k -q:a 2"));
        assert!(joined.ends_with("-f mp3 out.mp3.part"));
    }

    #[test]
    fn failed_encoder_keeps_wav() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("book.wav");
        std::fs::write(&wav, b"RIFF").unwrap();
        let t = FfmpegTranscoder::new(TranscodeConfig {
            program: "/nonexistent/ffmpeg".into(),
            ..TranscodeConfig::default()
        });
        assert!(t.transcode(&wav, &dir.path().join("book.mp3")).is_err());
        assert!(wav.exists());
    }

    #[cfg(unix)]
    #[test]
    fn successful_encoder_replaces_wav() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("book.wav");
        std::fs::write(&wav, vec![0u8; 1000]).unwrap();
        let script = dir.path().join("fake-ffmpeg.sh");
        // Last argument is the output path.
        std::fs::write(&script, "#!/bin/sh\nfor last; do :; done\nprintf 'mp3data' > \"$last\"\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let t = FfmpegTranscoder::new(TranscodeConfig {
            program: script.to_string_lossy().into_owned(),
            ..TranscodeConfig::default()
        });
        let out = dir.path().join("book.mp3");
        let report = t.transcode(&wav, &out).unwrap();
        assert!(!wav.exists());
        assert_eq!(std::fs::read(&out).unwrap(), b"mp3data");
        assert_eq!(report.source_bytes, 1000);
        assert_eq!(report.output_bytes, 7);
    }
}
