use std::time::Duration;

use super::classify::FailureKind;

/// What to do with the key that just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Back to the queue.
    Release,
    /// Park until the cooldown elapses.
    Cooldown(Duration),
    /// Remove for the rest of the process.
    Revoke,
}

impl KeyAction {
    /// Whether the failed request counts against the key in the usage ledger.
    pub fn records_failure(&self) -> bool {
        !matches!(self, KeyAction::Release)
    }
}

/// Whether the unit gets another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again with the next key from the pool.
    NextKey,
    /// Give up on this unit.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub key: KeyAction,
    pub then: RetryDecision,
}

/// Per-unit retry policy: each attempt uses a different key, no backoff
/// beyond the per-key cooldown.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts per unit (including the first).
    pub max_attempts: u32,
    /// Cooldown applied to rate-limited, overloaded or soft-failed keys.
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// `attempt` is 1-based (1 = first attempt).
    pub fn decide(&self, attempt: u32, kind: FailureKind) -> Decision {
        let key = match kind {
            FailureKind::QuotaExhausted => KeyAction::Revoke,
            FailureKind::RateLimited | FailureKind::Overloaded | FailureKind::SoftFail => {
                KeyAction::Cooldown(self.cooldown)
            }
            FailureKind::Unknown => KeyAction::Release,
        };
        let then = if kind == FailureKind::Unknown || attempt >= self.max_attempts {
            RetryDecision::Stop
        } else {
            RetryDecision::NextKey
        };
        Decision { key, then }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            cooldown: Duration::from_secs(30),
        }
    }

    #[test]
    fn quota_revokes_and_moves_on() {
        let d = policy(3).decide(1, FailureKind::QuotaExhausted);
        assert_eq!(d.key, KeyAction::Revoke);
        assert_eq!(d.then, RetryDecision::NextKey);
        assert!(d.key.records_failure());
    }

    #[test]
    fn transient_failures_cool_down() {
        for kind in [
            FailureKind::RateLimited,
            FailureKind::Overloaded,
            FailureKind::SoftFail,
        ] {
            let d = policy(3).decide(1, kind);
            assert_eq!(d.key, KeyAction::Cooldown(Duration::from_secs(30)));
            assert_eq!(d.then, RetryDecision::NextKey);
        }
    }

    #[test]
    fn unknown_releases_and_stops() {
        let d = policy(5).decide(1, FailureKind::Unknown);
        assert_eq!(d.key, KeyAction::Release);
        assert_eq!(d.then, RetryDecision::Stop);
        assert!(!d.key.records_failure());
    }

    #[test]
    fn respects_max_attempts() {
        let p = policy(3);
        assert_eq!(p.decide(2, FailureKind::RateLimited).then, RetryDecision::NextKey);
        assert_eq!(p.decide(3, FailureKind::RateLimited).then, RetryDecision::Stop);
        // The key is still parked even on the last attempt.
        assert_eq!(
            p.decide(3, FailureKind::QuotaExhausted).key,
            KeyAction::Revoke
        );
    }
}
