//! Hierarchical, token-bounded text chunking.
//!
//! A document is split into paragraphs which are packed greedily into units
//! under the token budget. A paragraph that is too large on its own falls back
//! to sentence packing, and a sentence that is still too large falls back to
//! word packing. The result is a pure function of (text, budget, counter).

mod levels;
mod tokens;

pub use tokens::{Cl100kCounter, TokenCounter, WordCounter};

/// Separator between packed paragraphs (keeps the blank-line structure).
const PARAGRAPH_SEP: &str = "\n\n";
/// Separator between packed sentences and words.
const SPACE_SEP: &str = " ";

/// One token-bounded slice of the document; the atomic item of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// 0-based position in the document, stable for the whole run.
    pub index: usize,
    pub text: String,
    /// Token count measured on `text` after packing.
    pub tokens: usize,
}

/// Chunking result plus diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ChunkReport {
    pub units: Vec<Unit>,
    /// Number of non-empty paragraphs in the input.
    pub paragraphs: usize,
    /// Indices of units whose measured size exceeds the budget (a single
    /// word/token larger than the budget on its own).
    pub oversized: Vec<usize>,
}

impl ChunkReport {
    pub fn total_tokens(&self) -> usize {
        self.units.iter().map(|u| u.tokens).sum()
    }
}

/// Split `text` into units of at most `max_tokens` tokens.
pub fn chunk(text: &str, max_tokens: usize, counter: &dyn TokenCounter) -> Vec<Unit> {
    chunk_with_report(text, max_tokens, counter).units
}

/// Like [`chunk`] but also returns paragraph count and any over-budget units.
pub fn chunk_with_report(text: &str, max_tokens: usize, counter: &dyn TokenCounter) -> ChunkReport {
    let max_tokens = max_tokens.max(1);
    let paragraphs = levels::paragraphs(text);
    tracing::debug!(paragraphs = paragraphs.len(), max_tokens, "chunking document");

    let mut pieces: Vec<String> = Vec::new();
    let mut packer = Packer::new(PARAGRAPH_SEP, max_tokens);

    for (para_idx, para) in paragraphs.iter().enumerate() {
        let para_tokens = counter.count(para);
        if para_tokens > max_tokens {
            tracing::debug!(
                paragraph = para_idx + 1,
                tokens = para_tokens,
                max_tokens,
                "paragraph over budget, splitting by sentences"
            );
            packer.flush(&mut pieces);
            pieces.extend(split_paragraph(para, max_tokens, counter));
            continue;
        }
        packer.push(para, para_tokens, counter, &mut pieces);
    }
    packer.flush(&mut pieces);

    let mut oversized = Vec::new();
    let units: Vec<Unit> = pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let tokens = counter.count(&text);
            if tokens > max_tokens {
                tracing::warn!(
                    unit = index,
                    tokens,
                    max_tokens,
                    "unit exceeds token budget (single token larger than budget)"
                );
                oversized.push(index);
            }
            Unit {
                index,
                text,
                tokens,
            }
        })
        .collect();

    tracing::info!(
        units = units.len(),
        paragraphs = paragraphs.len(),
        "chunking complete"
    );

    ChunkReport {
        units,
        paragraphs: paragraphs.len(),
        oversized,
    }
}

/// Level 2: sentence packing for a paragraph larger than the budget.
fn split_paragraph(para: &str, max_tokens: usize, counter: &dyn TokenCounter) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut packer = Packer::new(SPACE_SEP, max_tokens);
    for sentence in levels::sentences(para) {
        let sentence_tokens = counter.count(sentence);
        if sentence_tokens > max_tokens {
            tracing::debug!(
                tokens = sentence_tokens,
                max_tokens,
                "sentence over budget, splitting by words"
            );
            packer.flush(&mut pieces);
            pieces.extend(split_sentence(sentence, max_tokens, counter));
            continue;
        }
        packer.push(sentence, sentence_tokens, counter, &mut pieces);
    }
    packer.flush(&mut pieces);
    pieces
}

/// Level 3: word packing. Each word costs `count(word + " ")`.
fn split_sentence(sentence: &str, max_tokens: usize, counter: &dyn TokenCounter) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;
    for word in levels::words(sentence) {
        let word_tokens = counter.count(&format!("{}{}", word, SPACE_SEP));
        if !current.is_empty() && current_tokens + word_tokens > max_tokens {
            pieces.push(current.join(SPACE_SEP));
            current.clear();
            current_tokens = 0;
        }
        current.push(word);
        current_tokens += word_tokens;
    }
    if !current.is_empty() {
        pieces.push(current.join(SPACE_SEP));
    }
    pieces
}

/// Greedy accumulator for paragraphs or sentences. The running count is the
/// measured size of the joined unit so far, so separators are accounted for.
struct Packer<'a> {
    sep: &'a str,
    max_tokens: usize,
    current: String,
    current_tokens: usize,
}

impl<'a> Packer<'a> {
    fn new(sep: &'a str, max_tokens: usize) -> Self {
        Self {
            sep,
            max_tokens,
            current: String::new(),
            current_tokens: 0,
        }
    }

    /// Add `part` (already known to fit the budget on its own).
    fn push(
        &mut self,
        part: &str,
        part_tokens: usize,
        counter: &dyn TokenCounter,
        out: &mut Vec<String>,
    ) {
        if self.current.is_empty() {
            self.current.push_str(part);
            self.current_tokens = part_tokens;
            return;
        }
        let candidate = format!("{}{}{}", self.current, self.sep, part);
        let candidate_tokens = counter.count(&candidate);
        if candidate_tokens <= self.max_tokens {
            self.current = candidate;
            self.current_tokens = candidate_tokens;
        } else {
            self.flush(out);
            self.current.push_str(part);
            self.current_tokens = part_tokens;
        }
    }

    fn flush(&mut self, out: &mut Vec<String>) {
        if !self.current.is_empty() {
            tracing::trace!(tokens = self.current_tokens, "closed unit");
            out.push(std::mem::take(&mut self.current));
            self.current_tokens = 0;
        }
    }
}

#[cfg(test)]
mod tests;
