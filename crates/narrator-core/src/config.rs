use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Raw audio format returned by the synthesizer (optional section in config.toml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Frames per second.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Bits per sample (PCM, little endian).
    pub bits_per_sample: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

/// Compressed-output conversion via an external encoder (optional section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// When false the assembled WAV is the final artifact.
    pub enabled: bool,
    /// Encoder executable (looked up on PATH).
    pub program: String,
    /// Target bitrate passed as `-b:a`.
    pub bitrate: String,
    /// VBR quality passed as `-q:a` (0-9, lower is better).
    pub quality: u8,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "ffmpeg".to_string(),
            bitrate: "128k".to_string(),
            quality: 2,
        }
    }
}

/// External synthesis program used by the CLI (`[synth_command]`).
///
/// The program receives the unit text on stdin, the credential in
/// `NARRATOR_API_KEY` and the voice in `NARRATOR_VOICE`, and writes raw PCM to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthCommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Global configuration loaded from `~/.config/narrator/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarratorConfig {
    /// Token budget per unit handed to the synthesizer.
    pub max_tokens_per_unit: usize,
    /// Concurrent workers per document (clamped to the credential count).
    pub workers: usize,
    /// Daily requests after which a credential stops receiving assignments.
    pub daily_request_threshold: u32,
    /// Cooldown applied to a credential after a transient failure.
    pub cooldown_secs: u64,
    /// Voice identifier passed to the synthesizer.
    pub voice: String,
    /// Output directory name, created beside each source document.
    pub output_subdir: String,
    /// Credentials are read from `<prefix>1`, `<prefix>2`, ... until the first gap.
    pub credential_env_prefix: String,
    /// Attempts per unit; defaults to the number of configured credentials.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub audio: Option<AudioConfig>,
    #[serde(default)]
    pub transcode: Option<TranscodeConfig>,
    #[serde(default)]
    pub synth_command: Option<SynthCommandConfig>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_unit: 1000,
            workers: 3,
            daily_request_threshold: 9,
            cooldown_secs: 30,
            voice: "Kore".to_string(),
            output_subdir: "TTS".to_string(),
            credential_env_prefix: "NARRATOR_API_KEY_".to_string(),
            max_attempts: None,
            audio: None,
            transcode: None,
            synth_command: None,
        }
    }
}

impl NarratorConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn audio_or_default(&self) -> AudioConfig {
        self.audio.unwrap_or_default()
    }

    pub fn transcode_or_default(&self) -> TranscodeConfig {
        self.transcode.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("narrator")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<NarratorConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = NarratorConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: NarratorConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = NarratorConfig::default();
        assert_eq!(cfg.max_tokens_per_unit, 1000);
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.daily_request_threshold, 9);
        assert_eq!(cfg.cooldown(), Duration::from_secs(30));
        assert_eq!(cfg.voice, "Kore");
        assert_eq!(cfg.audio_or_default(), AudioConfig::default());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = NarratorConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: NarratorConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_tokens_per_unit, cfg.max_tokens_per_unit);
        assert_eq!(parsed.workers, cfg.workers);
        assert_eq!(parsed.output_subdir, cfg.output_subdir);
        assert_eq!(parsed.credential_env_prefix, cfg.credential_env_prefix);
    }

    #[test]
    fn config_toml_custom_sections() {
        let toml = r#"
            max_tokens_per_unit = 600
            workers = 7
            daily_request_threshold = 20
            cooldown_secs = 5
            voice = "Puck"
            output_subdir = "audio"
            credential_env_prefix = "TTS_KEY_"
            max_attempts = 4

            [audio]
            sample_rate = 16000
            channels = 2
            bits_per_sample = 16

            [transcode]
            enabled = false
            program = "/usr/bin/ffmpeg"
            bitrate = "96k"
            quality = 4

            [synth_command]
            program = "tts-gemini"
            args = ["--model", "flash"]
        "#;
        let cfg: NarratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_attempts, Some(4));
        assert_eq!(cfg.audio_or_default().channels, 2);
        let transcode = cfg.transcode_or_default();
        assert!(!transcode.enabled);
        assert_eq!(transcode.bitrate, "96k");
        let synth = cfg.synth_command.as_ref().unwrap();
        assert_eq!(synth.program, "tts-gemini");
        assert_eq!(synth.args, vec!["--model", "flash"]);
    }

    #[test]
    fn optional_sections_default_when_missing() {
        let toml = r#"
            max_tokens_per_unit = 1000
            workers = 3
            daily_request_threshold = 9
            cooldown_secs = 30
            voice = "Kore"
            output_subdir = "TTS"
            credential_env_prefix = "NARRATOR_API_KEY_"
        "#;
        let cfg: NarratorConfig = toml::from_str(toml).unwrap();
        assert!(cfg.max_attempts.is_none());
        assert!(cfg.synth_command.is_none());
        assert!(cfg.transcode_or_default().enabled);
    }
}
