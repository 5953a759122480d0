//! Thread-safe credential pool.
//!
//! Credentials rotate through a FIFO queue. A credential that hits a transient
//! limit is parked in a cooldown map until an absolute instant; one that hits
//! its quota is removed for the rest of the process. `acquire` blocks on a
//! condition variable until the soonest cooldown expires or another worker
//! hands a credential back.

mod state;

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::credential::Credential;
use state::PoolState;

/// Partition sizes at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub available: usize,
    pub cooldown: usize,
    pub removed: usize,
    pub held: usize,
    pub total: usize,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} available, {} cooling down, {} removed, {} in use ({} total)",
            self.available, self.cooldown, self.removed, self.held, self.total
        )
    }
}

/// Shared by all workers through an `Arc`.
pub struct KeyPool {
    credentials: Vec<Credential>,
    state: Mutex<PoolState>,
    wake: Condvar,
}

impl KeyPool {
    pub fn new(credentials: Vec<Credential>) -> Self {
        let state = PoolState::new(credentials.len());
        tracing::debug!(keys = credentials.len(), "key pool created");
        Self {
            credentials,
            state: Mutex::new(state),
            wake: Condvar::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// The configured credentials, in order.
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Credentials not yet revoked, in configured order. Cooling and held
    /// credentials are included; they come back.
    pub fn live_credentials(&self) -> Vec<Credential> {
        let state = self.lock();
        self.credentials
            .iter()
            .enumerate()
            .filter(|(slot, _)| !state.removed.contains(slot))
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Next credential from the front of the queue, waiting out cooldowns.
    /// Returns `None` once every credential has been removed.
    pub fn acquire(&self) -> Option<Credential> {
        self.acquire_inner(None)
    }

    /// Like [`acquire`](Self::acquire), but hands out `preferred` when it is
    /// waiting in the queue.
    pub fn acquire_preferred(&self, preferred: &Credential) -> Option<Credential> {
        self.acquire_inner(self.slot_of(preferred))
    }

    fn acquire_inner(&self, preferred: Option<usize>) -> Option<Credential> {
        let mut state = self.lock();
        loop {
            let now = Instant::now();
            state.refresh(now);

            let taken = match preferred {
                Some(slot) if state.take(slot) => Some(slot),
                _ => state.take_front(),
            };
            if let Some(slot) = taken {
                return Some(self.credentials[slot].clone());
            }

            if let Some(until) = state.soonest_cooldown() {
                let wait = until.saturating_duration_since(now);
                tracing::debug!(wait_ms = wait.as_millis() as u64, "all keys cooling down, waiting");
                state = self
                    .wake
                    .wait_timeout(state, wait)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            } else if state.drained() {
                return None;
            } else {
                // Only held keys remain; wait for a release/fail/revoke.
                state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    /// Return a held credential to the back of the queue.
    pub fn release(&self, credential: &Credential) {
        let Some(slot) = self.slot_of(credential) else {
            return;
        };
        if self.lock().release(slot) {
            self.wake.notify_all();
        }
    }

    /// Park a credential until `now + cooldown`.
    pub fn fail(&self, credential: &Credential, cooldown: Duration) {
        let Some(slot) = self.slot_of(credential) else {
            return;
        };
        let until = Instant::now() + cooldown;
        if self.lock().cool(slot, until) {
            tracing::info!(
                key = %credential,
                cooldown_secs = cooldown.as_secs_f64(),
                "key cooling down"
            );
            self.wake.notify_all();
        }
    }

    /// Remove a credential for the rest of the process.
    pub fn revoke(&self, credential: &Credential) {
        let Some(slot) = self.slot_of(credential) else {
            return;
        };
        let stats = {
            let mut state = self.lock();
            if !state.remove(slot) {
                return;
            }
            state.stats(self.credentials.len())
        };
        tracing::warn!(key = %credential, remaining = stats.total - stats.removed, "key removed from pool");
        self.wake.notify_all();
    }

    pub fn stats(&self) -> PoolStats {
        self.lock().stats(self.credentials.len())
    }

    fn slot_of(&self, credential: &Credential) -> Option<usize> {
        match self.credentials.get(credential.slot()) {
            Some(c) if c == credential => Some(credential.slot()),
            _ => self.credentials.iter().position(|c| c == credential),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
