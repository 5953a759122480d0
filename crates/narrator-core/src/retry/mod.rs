//! Failure classification and per-unit retry across keys.
//!
//! Every synthesis result is classified into an [`Outcome`]; the
//! [`RetryPolicy`] maps each failure kind to a key action (release, cooldown,
//! revoke) and a decision to try the next key or stop. [`KeyedAttempts`]
//! drives that loop against the key pool and usage ledger.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_error, FailureKind, Outcome};
pub use error::{SynthesisError, UnitError};
pub use policy::{Decision, KeyAction, RetryDecision, RetryPolicy};
pub use run::{KeyedAttempts, Synthesized};
