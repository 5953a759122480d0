//! Output locations for one document.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// `<document dir>/<output_subdir>/` plus the per-document file names in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub source: PathBuf,
    pub stem: String,
    pub out_dir: PathBuf,
}

impl RunPaths {
    pub fn new(source: &Path, output_subdir: &str) -> Result<Self> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("no file name in {}", source.display()))?;
        let parent = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self {
            source: source.to_path_buf(),
            stem,
            out_dir: parent.join(output_subdir),
        })
    }

    /// Create the output directory if needed.
    pub fn ensure_out_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("create output dir: {}", self.out_dir.display()))
    }

    /// Per-unit artifact: `.chunk_<index>_<stem>.wav`.
    pub fn unit_artifact(&self, index: usize) -> PathBuf {
        self.out_dir.join(format!(".chunk_{}_{}.wav", index, self.stem))
    }

    /// `.checkpoint_<stem>.json`.
    pub fn checkpoint(&self) -> PathBuf {
        self.out_dir.join(format!(".checkpoint_{}.json", self.stem))
    }

    pub fn final_wav(&self) -> PathBuf {
        self.final_with_extension("wav")
    }

    pub fn final_with_extension(&self, ext: &str) -> PathBuf {
        self.out_dir.join(format!("{}.{}", self.stem, ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_beside_document() {
        let p = RunPaths::new(Path::new("/books/ch01.md"), "TTS").unwrap();
        assert_eq!(p.stem, "ch01");
        assert_eq!(p.out_dir, PathBuf::from("/books/TTS"));
        assert_eq!(p.unit_artifact(7), PathBuf::from("/books/TTS/.chunk_7_ch01.wav"));
        assert_eq!(p.checkpoint(), PathBuf::from("/books/TTS/.checkpoint_ch01.json"));
        assert_eq!(p.final_wav(), PathBuf::from("/books/TTS/ch01.wav"));
        assert_eq!(p.final_with_extension("mp3"), PathBuf::from("/books/TTS/ch01.mp3"));
    }

    #[test]
    fn bare_file_name_uses_current_dir() {
        let p = RunPaths::new(Path::new("notes.md"), "out").unwrap();
        assert_eq!(p.out_dir, PathBuf::from("./out"));
    }
}
