//! Token counting used to bound unit sizes.
//!
//! The chunker only needs a deterministic measure. [`Cl100kCounter`] matches
//! the `cl100k_base` encoding used to size synthesis requests; [`WordCounter`]
//! is exact and additive, which keeps tests readable.

use anyhow::Result;
use tiktoken_rs::CoreBPE;

/// Deterministic token measure. Must return the same count for the same text.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// One token per whitespace-delimited word. Exact and additive; used in tests
/// and by callers that budget in words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// BPE token count under `cl100k_base`, special tokens treated as text.
pub struct Cl100kCounter {
    bpe: CoreBPE,
}

impl Cl100kCounter {
    /// Load the embedded `cl100k_base` ranks.
    pub fn new() -> Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
        })
    }
}

impl std::fmt::Debug for Cl100kCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cl100kCounter")
    }
}

impl TokenCounter for Cl100kCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_counter_counts_words() {
        assert_eq!(WordCounter.count(""), 0);
        assert_eq!(WordCounter.count("one two\n\nthree "), 3);
    }

    #[test]
    fn cl100k_counts_known_text() {
        let c = Cl100kCounter::new().unwrap();
        assert_eq!(c.count(""), 0);
        assert_eq!(c.count("hello world"), 2);
        // Special-token markup is counted as plain text, not rejected.
        assert!(c.count("<|endoftext|>") > 1);
    }

    #[test]
    fn cl100k_is_deterministic_and_grows_with_text() {
        let c = Cl100kCounter::new().unwrap();
        let short = "Hello world.";
        let long = "Hello world. Hello world. Hello world.";
        assert_eq!(c.count(short), c.count(short));
        assert!(c.count(long) > c.count(short));
    }
}
