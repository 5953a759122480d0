//! Synthesizer backed by an external program.
//!
//! Contract: the program receives the text on stdin and `NARRATOR_API_KEY` /
//! `NARRATOR_VOICE` in its environment, and writes raw PCM to stdout. On
//! failure it exits non-zero and its last stderr line is one of
//! `HTTP <status> <message>` or `NO_CONTENT <reason>`; anything else is
//! treated as a transport failure.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::config::SynthCommandConfig;
use crate::credential::Credential;
use crate::retry::SynthesisError;

use super::Synthesizer;

pub const ENV_API_KEY: &str = "NARRATOR_API_KEY";
pub const ENV_VOICE: &str = "NARRATOR_VOICE";

#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(cfg: &SynthCommandConfig) -> Self {
        Self::new(cfg.program.clone(), cfg.args.clone())
    }
}

impl Synthesizer for CommandSynthesizer {
    fn synthesize(
        &self,
        credential: &Credential,
        text: &str,
        voice: &str,
    ) -> Result<Vec<u8>, SynthesisError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(ENV_API_KEY, credential.expose_secret())
            .env(ENV_VOICE, voice)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SynthesisError::Transport(format!("spawn {}: {}", self.program, e)))?;

        // Feed stdin from its own thread so a chatty program cannot fill the
        // stdout pipe while we are still writing.
        let feeder = child.stdin.take().map(|mut stdin| {
            let input = text.to_owned();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child
            .wait_with_output()
            .map_err(|e| SynthesisError::Transport(format!("wait {}: {}", self.program, e)))?;

        if let Some(Ok(Err(e))) = feeder.map(|h| h.join()) {
            // Exit status is what matters; a program may exit without reading stdin.
            tracing::debug!(program = %self.program, "stdin write failed: {}", e);
        }

        if output.status.success() {
            return Ok(output.stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(parse_failure(&stderr, output.status.code()))
    }
}

/// Interpret the last non-empty stderr line of a failed run.
pub(crate) fn parse_failure(stderr: &str, exit_code: Option<i32>) -> SynthesisError {
    let line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    if let Some(rest) = line.strip_prefix("HTTP ") {
        let (code, message) = rest.split_once(' ').unwrap_or((rest, ""));
        if let Ok(status) = code.trim().parse::<u16>() {
            return SynthesisError::Http {
                status,
                message: message.trim().to_string(),
            };
        }
    }
    if let Some(reason) = line.strip_prefix("NO_CONTENT") {
        return SynthesisError::NoContent {
            reason: reason.trim().to_string(),
        };
    }
    let code = exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    if line.is_empty() {
        SynthesisError::Transport(format!("synthesizer exited with {}", code))
    } else {
        SynthesisError::Transport(format!("synthesizer exited with {}: {}", code, line))
    }
}
