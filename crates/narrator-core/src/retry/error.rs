//! Synthesis and per-unit error types.

use std::fmt;

use crate::usage_ledger::AllExhausted;

/// Error returned by a single synthesis call.
/// Kept structured so the attempt loop can classify it before giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// The service answered with an HTTP-style error status.
    Http { status: u16, message: String },
    /// The service answered but produced no content (e.g. finish reason `OTHER`).
    NoContent { reason: String },
    /// The call itself failed (process spawn, connection, malformed reply).
    Transport(String),
    /// A successful reply carried no audio.
    EmptyAudio,
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisError::Http { status, message } if message.is_empty() => {
                write!(f, "HTTP {}", status)
            }
            SynthesisError::Http { status, message } => write!(f, "HTTP {}: {}", status, message),
            SynthesisError::NoContent { reason } => {
                write!(f, "no content returned (finish reason {})", reason)
            }
            SynthesisError::Transport(msg) => write!(f, "transport: {}", msg),
            SynthesisError::EmptyAudio => write!(f, "no audio data in response"),
        }
    }
}

impl std::error::Error for SynthesisError {}

/// Why one unit could not be synthesized. Stops only that unit.
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error(transparent)]
    AllExhausted(#[from] AllExhausted),
    #[error("no API keys left in the pool")]
    NoKeysLeft,
    #[error("gave up after {attempts} attempt(s); last error: {last}")]
    AttemptsExhausted { attempts: u32, last: SynthesisError },
    #[error("synthesis failed: {0}")]
    Synthesis(SynthesisError),
    #[error("could not store unit audio: {0}")]
    Storage(String),
}
