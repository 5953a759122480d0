//! Attempt loop: synthesize one unit, moving to a different key after each
//! classified failure until it succeeds or the policy says stop.

use crate::credential::Credential;
use crate::key_pool::KeyPool;
use crate::synth::Synthesizer;
use crate::usage_ledger::{RequestOutcome, UsageLedger};

use super::classify::{classify, FailureKind, Outcome};
use super::error::UnitError;
use super::policy::{KeyAction, RetryDecision, RetryPolicy};

/// Shared collaborators for the attempt loop.
pub struct KeyedAttempts<'a> {
    pub pool: &'a KeyPool,
    pub ledger: &'a UsageLedger,
    pub synthesizer: &'a dyn Synthesizer,
    pub policy: RetryPolicy,
    pub voice: &'a str,
}

/// Successful synthesis. The key is still held by the caller, who must
/// release it and record the success once the audio is stored.
#[derive(Debug)]
pub struct Synthesized {
    pub credential: Credential,
    pub pcm: Vec<u8>,
    pub attempts: u32,
}

impl KeyedAttempts<'_> {
    /// Run up to `policy.max_attempts` attempts for `unit`, starting with the
    /// ledger's `assigned` key when the pool has it queued.
    pub fn run(
        &self,
        unit: usize,
        assigned: &Credential,
        text: &str,
    ) -> Result<Synthesized, UnitError> {
        let mut attempt = 1u32;
        loop {
            let key = if attempt == 1 {
                self.pool.acquire_preferred(assigned)
            } else {
                self.pool.acquire()
            };
            let Some(key) = key else {
                tracing::warn!(unit, attempt, "no API keys left for unit");
                return Err(UnitError::NoKeysLeft);
            };
            tracing::debug!(unit, attempt, key = %key, "synthesizing");

            let (kind, error) = match classify(self.synthesizer.synthesize(&key, text, self.voice)) {
                Outcome::Success(pcm) => {
                    return Ok(Synthesized {
                        credential: key,
                        pcm,
                        attempts: attempt,
                    })
                }
                Outcome::Failure { kind, error } => (kind, error),
            };

            let decision = self.policy.decide(attempt, kind);
            match decision.key {
                KeyAction::Release => self.pool.release(&key),
                KeyAction::Cooldown(d) => self.pool.fail(&key, d),
                KeyAction::Revoke => self.pool.revoke(&key),
            }
            if decision.key.records_failure() {
                if let Err(e) = self.ledger.record(&key, RequestOutcome::Failure) {
                    tracing::warn!(key = %key, "failed to persist usage ledger: {:#}", e);
                }
            }
            tracing::info!(unit, attempt, key = %key, ?kind, "attempt failed: {}", error);

            match decision.then {
                RetryDecision::NextKey => attempt += 1,
                RetryDecision::Stop if kind == FailureKind::Unknown => {
                    return Err(UnitError::Synthesis(error))
                }
                RetryDecision::Stop => {
                    return Err(UnitError::AttemptsExhausted {
                        attempts: attempt,
                        last: error,
                    })
                }
            }
        }
    }
}
