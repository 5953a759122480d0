//! `narrator split` – write a document's units as separate markdown files.

use anyhow::{Context, Result};
use narrator_core::chunker::{self, Cl100kCounter, TokenCounter};
use std::path::{Path, PathBuf};

/// Split `file` (markdown kept as-is) into `<dir>/Chunks/<stem>_part_NNN.md`,
/// numbered from 1. Returns the written paths.
pub(crate) fn split_file(file: &Path, max_tokens: usize, counter: &dyn TokenCounter) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("read document: {}", file.display()))?;
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("no file name in {}", file.display()))?;
    let dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .join("Chunks");
    std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;

    let units = chunker::chunk(&text, max_tokens, counter);
    let mut written = Vec::with_capacity(units.len());
    for unit in &units {
        let path = dir.join(format!("{}_part_{:03}.md", stem, unit.index + 1));
        std::fs::write(&path, &unit.text).with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

pub fn run_split(file: &Path, max_tokens: usize) -> Result<()> {
    let counter = Cl100kCounter::new()?;
    let written = split_file(file, max_tokens, &counter)?;
    println!(
        "Split {} into {} part(s) (limit {} tokens)",
        file.display(),
        written.len(),
        max_tokens
    );
    for path in &written {
        let text = std::fs::read_to_string(path)?;
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        println!("  {} ({} tokens)", name, counter.count(&text));
    }
    Ok(())
}
