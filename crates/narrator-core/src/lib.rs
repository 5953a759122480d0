pub mod config;
pub mod logging;

// Pipeline building blocks, leaves first.
pub mod checksum;
pub mod chunker;
pub mod credential;
pub mod markdown;
pub mod storage;
pub mod synth;
pub mod transcode;

// Shared, thread-safe state.
pub mod checkpoint;
pub mod key_pool;
pub mod usage_ledger;

pub mod orchestrator;
pub mod retry;
