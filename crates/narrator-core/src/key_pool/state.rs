//! Partition bookkeeping behind the pool mutex.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use super::PoolStats;

/// Every slot is in exactly one of `available`, `cooling`, `removed`, `held`.
#[derive(Debug)]
pub(super) struct PoolState {
    pub(super) available: VecDeque<usize>,
    pub(super) cooling: HashMap<usize, Instant>,
    pub(super) removed: HashSet<usize>,
    pub(super) held: HashSet<usize>,
}

impl PoolState {
    pub(super) fn new(slots: usize) -> Self {
        Self {
            available: (0..slots).collect(),
            cooling: HashMap::new(),
            removed: HashSet::new(),
            held: HashSet::new(),
        }
    }

    /// Move expired cooldowns to the back of the queue, soonest expiry first.
    pub(super) fn refresh(&mut self, now: Instant) {
        let mut expired: Vec<(Instant, usize)> = self
            .cooling
            .iter()
            .filter(|(_, until)| **until <= now)
            .map(|(slot, until)| (*until, *slot))
            .collect();
        if expired.is_empty() {
            return;
        }
        expired.sort();
        for (_, slot) in expired {
            self.cooling.remove(&slot);
            self.available.push_back(slot);
        }
    }

    pub(super) fn soonest_cooldown(&self) -> Option<Instant> {
        self.cooling.values().min().copied()
    }

    pub(super) fn take_front(&mut self) -> Option<usize> {
        let slot = self.available.pop_front()?;
        self.held.insert(slot);
        Some(slot)
    }

    /// Take `slot` out of the queue if it is waiting there.
    pub(super) fn take(&mut self, slot: usize) -> bool {
        match self.available.iter().position(|s| *s == slot) {
            Some(pos) => {
                self.available.remove(pos);
                self.held.insert(slot);
                true
            }
            None => false,
        }
    }

    pub(super) fn release(&mut self, slot: usize) -> bool {
        if self.removed.contains(&slot) || !self.held.remove(&slot) {
            return false;
        }
        self.available.push_back(slot);
        true
    }

    pub(super) fn cool(&mut self, slot: usize, until: Instant) -> bool {
        if self.removed.contains(&slot) {
            return false;
        }
        self.held.remove(&slot);
        self.available.retain(|s| *s != slot);
        self.cooling.insert(slot, until);
        true
    }

    pub(super) fn remove(&mut self, slot: usize) -> bool {
        if !self.removed.insert(slot) {
            return false;
        }
        self.held.remove(&slot);
        self.cooling.remove(&slot);
        self.available.retain(|s| *s != slot);
        true
    }

    /// Nothing left to hand out now or later.
    pub(super) fn drained(&self) -> bool {
        self.available.is_empty() && self.cooling.is_empty() && self.held.is_empty()
    }

    pub(super) fn stats(&self, total: usize) -> PoolStats {
        PoolStats {
            available: self.available.len(),
            cooldown: self.cooling.len(),
            removed: self.removed.len(),
            held: self.held.len(),
            total,
        }
    }
}
