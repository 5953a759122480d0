//! Speech synthesis boundary.
//!
//! The pipeline only needs "text + voice + key in, raw PCM out". The remote
//! wire protocol lives behind [`Synthesizer`]; [`CommandSynthesizer`] adapts
//! any external program that speaks a small stdin/stdout contract.

mod command;

pub use command::CommandSynthesizer;

use crate::credential::Credential;
use crate::retry::SynthesisError;

/// One blocking synthesis call. Implementations are shared by all workers.
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with `voice` using `credential`; returns raw
    /// little-endian PCM in the configured audio format.
    fn synthesize(
        &self,
        credential: &Credential,
        text: &str,
        voice: &str,
    ) -> Result<Vec<u8>, SynthesisError>;
}

impl<T: Synthesizer + ?Sized> Synthesizer for std::sync::Arc<T> {
    fn synthesize(
        &self,
        credential: &Credential,
        text: &str,
        voice: &str,
    ) -> Result<Vec<u8>, SynthesisError> {
        (**self).synthesize(credential, text, voice)
    }
}
