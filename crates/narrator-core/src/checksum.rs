//! SHA-256 content fingerprints for source documents.
//!
//! A checkpoint is only trusted while the document it was made for hashes to
//! the same value.

use sha2::{Digest, Sha256};

/// SHA-256 of an in-memory buffer as lowercase hex.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
