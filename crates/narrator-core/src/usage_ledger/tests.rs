use super::*;
use crate::credential::from_secrets;
use chrono::{Duration as ChronoDuration, NaiveDate};

fn creds(n: usize) -> Vec<Credential> {
    from_secrets((0..n).map(|i| format!("ledger-secret-{i}")))
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[test]
fn record_counts_requests_and_error_timestamps() {
    let ledger = UsageLedger::in_memory(9);
    let c = creds(1).remove(0);
    ledger.record(&c, RequestOutcome::Success).unwrap();
    ledger.record(&c, RequestOutcome::Failure).unwrap();
    assert_eq!(ledger.usage(&c), 2);

    let snap = ledger.snapshot();
    let (fp, rec) = &snap.keys[0];
    assert_eq!(fp, c.fingerprint());
    assert_eq!(rec.requests, 2);
    assert!(rec.last_used.is_some());
    assert!(rec.last_error.is_some());
}

#[test]
fn exhausted_at_threshold() {
    let ledger = UsageLedger::in_memory(3);
    let c = creds(1).remove(0);
    for _ in 0..2 {
        ledger.record(&c, RequestOutcome::Success).unwrap();
    }
    assert!(!ledger.is_exhausted(&c));
    ledger.record(&c, RequestOutcome::Success).unwrap();
    assert!(ledger.is_exhausted(&c));
}

#[test]
fn assign_spreads_units_evenly_over_healthy_keys() {
    let ledger = UsageLedger::in_memory(9);
    let keys = creds(3);
    let mut counts = [0usize; 3];
    for unit in 0..10 {
        let c = ledger.assign(unit, &keys).unwrap();
        counts[c.slot()] += 1;
    }
    let mut sorted = counts;
    sorted.sort();
    assert_eq!(sorted, [3, 3, 4]);
}

#[test]
fn assign_skips_exhausted_keys_and_keeps_order() {
    let ledger = UsageLedger::in_memory(1);
    let keys = creds(3);
    ledger.record(&keys[1], RequestOutcome::Success).unwrap();
    // healthy = [k0, k2]
    assert_eq!(ledger.assign(0, &keys).unwrap(), keys[0]);
    assert_eq!(ledger.assign(1, &keys).unwrap(), keys[2]);
    assert_eq!(ledger.assign(2, &keys).unwrap(), keys[0]);
}

#[test]
fn assign_fails_when_every_key_is_exhausted() {
    let ledger = UsageLedger::in_memory(1);
    let keys = creds(2);
    for k in &keys {
        ledger.record(k, RequestOutcome::Success).unwrap();
    }
    let err = ledger.assign(0, &keys).unwrap_err();
    assert_eq!(err, AllExhausted { total: 2, threshold: 1 });
    assert!(err.to_string().contains("daily limit"));
}

#[test]
fn counters_reset_when_date_changes() {
    let ledger = UsageLedger::in_memory(9);
    let c = creds(1).remove(0);
    let yesterday = now() - ChronoDuration::days(1);
    for _ in 0..5 {
        ledger.record_at(&c, RequestOutcome::Success, yesterday).unwrap();
    }
    assert_eq!(ledger.snapshot().requests(c.fingerprint()), 0);

    ledger.record(&c, RequestOutcome::Success).unwrap();
    assert_eq!(ledger.usage(&c), 1);
}

#[test]
fn ledger_persists_and_reloads_same_day() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("usage.json");
    let c = creds(1).remove(0);
    {
        let ledger = UsageLedger::open(&path, 9).unwrap();
        ledger.record(&c, RequestOutcome::Success).unwrap();
        ledger.record(&c, RequestOutcome::Failure).unwrap();
    }
    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["keys"][c.fingerprint()]["requests"], 2);
    assert!(raw["date"].as_str().is_some());

    let reopened = UsageLedger::open(&path, 9).unwrap();
    assert_eq!(reopened.usage(&c), 2);
}

#[test]
fn stale_file_from_another_day_is_reset_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.json");
    let c = creds(1).remove(0);
    let old = format!(
        r#"{{"date":"2001-01-01","keys":{{"{}":{{"requests":42,"last_used":null,"last_error":null}}}}}}"#,
        c.fingerprint()
    );
    std::fs::write(&path, old).unwrap();

    let ledger = UsageLedger::open(&path, 9).unwrap();
    assert_eq!(ledger.usage(&c), 0);
    assert_ne!(ledger.snapshot().date, "2001-01-01");
}

#[test]
fn corrupt_file_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.json");
    std::fs::write(&path, b"{ not json").unwrap();
    let ledger = UsageLedger::open(&path, 9).unwrap();
    assert!(ledger.snapshot().keys.is_empty());
    let fixed: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(fixed["keys"].as_object().unwrap().is_empty());
}

#[test]
fn date_format_is_iso_day() {
    let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    assert_eq!(record::format_date(d), "2024-03-09");
}
