//! Light markdown stripping before chunking.
//!
//! Ordered regex substitutions: fenced code blocks are dropped, headers lose
//! their `#` markers, emphasis is unwrapped, images and links keep only their
//! text, and inline code spans are unwrapped. Nothing here understands
//! nesting; it only has to make the text pleasant to read aloud.

use regex::Regex;
use std::sync::OnceLock;

/// One substitution pass: pattern and replacement template.
struct Pass {
    re: Regex,
    with: &'static str,
}

const PATTERNS: [(&str, &str); 7] = [
    // Fences first so their backticks never reach the inline-code pass.
    (r"(?s)```.*?```", ""),
    (r"(?m)^#+[ \t]+", ""),
    (r"\*\*([^*]+)\*\*", "$1"),
    (r"\*([^*]+)\*", "$1"),
    (r"!\[([^\]]*)\]\([^)]+\)", "$1"),
    (r"\[([^\[\]]+)\]\([^)]+\)", "$1"),
    (r"`([^`\n]+)`", "$1"),
];

fn passes() -> &'static [Pass] {
    static PASSES: OnceLock<Vec<Pass>> = OnceLock::new();
    PASSES.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|&(pattern, with)| match Regex::new(pattern) {
                Ok(re) => Some(Pass { re, with }),
                Err(e) => {
                    tracing::error!(pattern, "invalid markdown pattern: {}", e);
                    None
                }
            })
            .collect()
    })
}

/// Strip markdown syntax that should not be spoken.
pub fn clean_markdown(text: &str) -> String {
    let mut out = text.to_string();
    for pass in passes() {
        out = pass.re.replace_all(&out, pass.with).into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_unmarked() {
        assert_eq!(clean_markdown("# Title\n## Sub title\nbody"), "Title\nSub title\nbody");
        assert_eq!(clean_markdown("#hashtag stays"), "#hashtag stays");
    }

    #[test]
    fn emphasis_is_unwrapped() {
        assert_eq!(clean_markdown("a **bold** and *it* word"), "a bold and it word");
        assert_eq!(clean_markdown("2 * 3 = 6"), "2 * 3 = 6");
    }

    #[test]
    fn links_and_images_keep_text() {
        assert_eq!(
            clean_markdown("see [the docs](https://x.test/a) now"),
            "see the docs now"
        );
        assert_eq!(clean_markdown("![a cat](cat.png) sat"), "a cat sat");
        assert_eq!(clean_markdown("x ![](empty.png) y"), "x  y");
        assert_eq!(clean_markdown("array[0] stays"), "array[0] stays");
    }

    #[test]
    fn code_blocks_dropped_and_inline_code_unwrapped() {
        let md = "before\n```rust\nfn main() {}\n```\nafter `x + 1` end";
        assert_eq!(clean_markdown(md), "before\n\nafter x + 1 end");
    }

    #[test]
    fn unclosed_fence_is_left_alone() {
        assert_eq!(clean_markdown("text ``` dangling"), "text ``` dangling");
    }

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(passes().len(), PATTERNS.len());
    }

    #[test]
    fn bullet_lists_keep_their_markers() {
        assert_eq!(clean_markdown("- one\n- *two*"), "- one\n- two");
    }

    #[test]
    fn paragraph_breaks_survive() {
        let md = "# One\n\nFirst paragraph.\n\nSecond **paragraph**.";
        assert_eq!(clean_markdown(md), "One\n\nFirst paragraph.\n\nSecond paragraph.");
    }
}
