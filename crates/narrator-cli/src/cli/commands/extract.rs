//! `narrator extract` – dump one unit exactly as `run` would send it.

use anyhow::{bail, Context, Result};
use narrator_core::chunker::{self, Cl100kCounter, TokenCounter};
use narrator_core::markdown::clean_markdown;
use std::path::{Path, PathBuf};

/// Clean and chunk `file`, then write unit `index` to `<out_dir>/chunk_<index>.md`.
pub(crate) fn extract_unit(
    file: &Path,
    index: usize,
    max_tokens: usize,
    counter: &dyn TokenCounter,
    out_dir: &Path,
) -> Result<(PathBuf, chunker::Unit, usize)> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("read document: {}", file.display()))?;
    let mut units = chunker::chunk(&clean_markdown(&text), max_tokens, counter);
    let total = units.len();
    if index >= total {
        if total == 0 {
            bail!("{} has no speakable text", file.display());
        }
        bail!("unit index {} is out of range; valid range is 0 to {}", index, total - 1);
    }
    let unit = units.swap_remove(index);
    let path = out_dir.join(format!("chunk_{}.md", index));
    std::fs::write(&path, &unit.text).with_context(|| format!("write {}", path.display()))?;
    Ok((path, unit, total))
}

pub fn run_extract(file: &Path, index: usize, max_tokens: usize, out_dir: &Path) -> Result<()> {
    let (path, unit, total) = extract_unit(file, index, max_tokens, &Cl100kCounter::new()?, out_dir)?;
    println!("Document has {} unit(s) at {} tokens", total, max_tokens);
    println!("Saved unit {} to {}", index, path.display());
    println!("  {} chars, {} tokens", unit.text.chars().count(), unit.tokens);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_core::chunker::WordCounter;

    #[test]
    fn writes_cleaned_unit_and_rejects_bad_index() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("book.md");
        std::fs::write(&doc, "# Intro\n\nSome **bold** words\n\nLast one here").unwrap();

        let (path, unit, total) = extract_unit(&doc, 1, 3, &WordCounter, dir.path()).unwrap();
        assert_eq!(total, 3);
        assert_eq!(path, dir.path().join("chunk_1.md"));
        assert_eq!(unit.text, "Some bold words");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Some bold words");

        let err = extract_unit(&doc, 3, 3, &WordCounter, dir.path()).unwrap_err();
        assert!(err.to_string().contains("0 to 2"));
    }
}
