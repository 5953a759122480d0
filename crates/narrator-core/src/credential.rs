//! API credentials: opaque secret handles with a short, irreversible fingerprint.
//!
//! The secret is only ever handed to the synthesizer. Everything else (logs,
//! the usage ledger, progress output) identifies a credential by its 1-based
//! slot number and fingerprint.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Number of hex digits kept from the SHA-256 of the secret.
const FINGERPRINT_LEN: usize = 8;

/// A configured credential. Cloning is cheap (the secret is shared).
#[derive(Clone)]
pub struct Credential {
    slot: usize,
    secret: Arc<str>,
    fingerprint: Arc<str>,
}

impl Credential {
    /// Build a credential for configuration slot `slot` (0-based position in the configured list).
    pub fn new(slot: usize, secret: impl Into<String>) -> Self {
        let secret: String = secret.into();
        let fingerprint = fingerprint(&secret);
        Self {
            slot,
            secret: Arc::from(secret),
            fingerprint: Arc::from(fingerprint),
        }
    }

    /// 0-based position in the configured credential list.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Short hex fingerprint, safe to log.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The secret itself. Only the synthesizer should call this.
    pub fn expose_secret(&self) -> &str {
        &self.secret
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.secret == other.secret
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("slot", &self.slot)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key #{} ({})", self.slot + 1, self.fingerprint)
    }
}

/// First eight hex digits of SHA-256(secret).
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Build credentials from an ordered list of secrets, dropping blanks.
pub fn from_secrets<I, S>(secrets: I) -> Vec<Credential>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    secrets
        .into_iter()
        .map(Into::into)
        .filter(|s: &String| !s.trim().is_empty())
        .enumerate()
        .map(|(slot, s)| Credential::new(slot, s.trim()))
        .collect()
}

/// Collect numbered secrets `<prefix>1`, `<prefix>2`, ... from `lookup` until the first gap.
pub fn collect_numbered<F>(prefix: &str, mut lookup: F) -> Vec<Credential>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut secrets = Vec::new();
    let mut n = 1usize;
    while let Some(value) = lookup(&format!("{}{}", prefix, n)) {
        if value.trim().is_empty() {
            break;
        }
        secrets.push(value);
        n += 1;
    }
    from_secrets(secrets)
}

/// Load numbered credentials from the process environment. Errors if none are set.
pub fn load_from_env(prefix: &str) -> Result<Vec<Credential>> {
    let creds = collect_numbered(prefix, |name| std::env::var(name).ok());
    if creds.is_empty() {
        anyhow::bail!(
            "no API keys found; set {}1, {}2, ... in the environment",
            prefix,
            prefix
        );
    }
    tracing::info!("loaded {} API key(s)", creds.len());
    Ok(creds)
}
