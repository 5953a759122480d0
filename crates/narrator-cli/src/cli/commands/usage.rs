//! `narrator usage` – today's request count per API key.

use anyhow::Result;
use narrator_core::config::NarratorConfig;
use narrator_core::credential::{self, Credential};
use narrator_core::usage_ledger::UsageLedger;

pub fn run_usage(cfg: &NarratorConfig) -> Result<()> {
    let creds = credential::load_from_env(&cfg.credential_env_prefix)?;
    let ledger = UsageLedger::open(UsageLedger::default_path()?, cfg.daily_request_threshold)?;
    print_usage(&ledger, &creds);
    Ok(())
}

/// Print one line per key, marking keys at or over the threshold.
pub(super) fn print_usage(ledger: &UsageLedger, creds: &[Credential]) {
    for line in usage_lines(ledger, creds) {
        println!("{}", line);
    }
}

pub(super) fn usage_lines(ledger: &UsageLedger, creds: &[Credential]) -> Vec<String> {
    let snapshot = ledger.snapshot();
    let mut lines = vec![format!("API key usage for {}:", snapshot.date)];
    for c in creds {
        let used = snapshot.requests(c.fingerprint());
        let marker = if used >= snapshot.threshold {
            "  (limit reached)"
        } else {
            ""
        };
        lines.push(format!("  {}: {}/{}{}", c, used, snapshot.threshold, marker));
    }
    lines
}
