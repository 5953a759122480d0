//! Splitting primitives for the three chunking levels.

use regex::Regex;
use std::sync::OnceLock;

/// A boundary is `.`, `!`, `?` or `…` followed by a whitespace run.
fn sentence_boundary() -> Option<&'static Regex> {
    static BOUNDARY: OnceLock<Option<Regex>> = OnceLock::new();
    BOUNDARY
        .get_or_init(|| Regex::new(r"[.!?…]\s+").ok())
        .as_ref()
}

/// Level 1: paragraphs are runs of non-blank lines. Blank (or whitespace-only)
/// lines separate paragraphs; each paragraph is trimmed, empty ones are dropped.
pub(super) fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut current, &mut out);
        } else {
            current.push(line);
        }
    }
    flush_paragraph(&mut current, &mut out);
    out
}

fn flush_paragraph(lines: &mut Vec<&str>, out: &mut Vec<String>) {
    if lines.is_empty() {
        return;
    }
    let para = lines.join("\n");
    let trimmed = para.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    lines.clear();
}

/// Level 2: split after `.`, `!`, `?` or `…` when followed by whitespace.
/// The whitespace run is consumed; sentences are trimmed and never empty.
pub(super) fn sentences(paragraph: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let Some(boundary) = sentence_boundary() else {
        push_trimmed(paragraph, &mut out);
        return out;
    };
    let mut start = 0usize;
    for m in boundary.find_iter(paragraph) {
        let terminator = m.as_str().chars().next().map_or(0, char::len_utf8);
        push_trimmed(&paragraph[start..m.start() + terminator], &mut out);
        start = m.end();
    }
    push_trimmed(&paragraph[start..], &mut out);
    out
}

fn push_trimmed<'a>(s: &'a str, out: &mut Vec<&'a str>) {
    let t = s.trim();
    if !t.is_empty() {
        out.push(t);
    }
}

/// Level 3: whitespace-delimited words.
pub(super) fn words(sentence: &str) -> Vec<&str> {
    sentence.split_whitespace().collect()
}
