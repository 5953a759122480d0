//! On-disk shape of the usage ledger.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Per-credential counters for one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub requests: u32,
    /// Local timestamp of the last request, ISO-8601 without offset.
    #[serde(default)]
    pub last_used: Option<String>,
    /// Local timestamp of the last failed request.
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Outcome of one synthesis request, as far as usage accounting cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failure,
}

/// The whole ledger file: `{ "date": "YYYY-MM-DD", "keys": { "<fp>": {...} } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct UsageFile {
    pub(super) date: String,
    #[serde(default)]
    pub(super) keys: BTreeMap<String, UsageRecord>,
}

impl UsageFile {
    pub(super) fn fresh(today: NaiveDate) -> Self {
        Self {
            date: format_date(today),
            keys: BTreeMap::new(),
        }
    }

    /// Drop every record when the stored date is not `today`. Returns true on reset.
    pub(super) fn roll_over(&mut self, today: NaiveDate) -> bool {
        let today = format_date(today);
        if self.date == today {
            return false;
        }
        self.date = today;
        self.keys.clear();
        true
    }

    pub(super) fn requests(&self, fingerprint: &str) -> u32 {
        self.keys.get(fingerprint).map(|r| r.requests).unwrap_or(0)
    }

    pub(super) fn bump(&mut self, fingerprint: &str, outcome: RequestOutcome, now: NaiveDateTime) {
        let stamp = now.format(TIMESTAMP_FORMAT).to_string();
        let record = self.keys.entry(fingerprint.to_string()).or_default();
        record.requests = record.requests.saturating_add(1);
        record.last_used = Some(stamp.clone());
        if outcome == RequestOutcome::Failure {
            record.last_error = Some(stamp);
        }
    }
}

pub(super) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
