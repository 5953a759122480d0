//! `narrator status` – show checkpoint progress for a document.

use anyhow::Result;
use narrator_core::checkpoint::Checkpoint;
use narrator_core::config::NarratorConfig;
use narrator_core::orchestrator::RunPaths;
use std::path::Path;

pub fn run_status(cfg: &NarratorConfig, file: &Path) -> Result<()> {
    let paths = RunPaths::new(file, &cfg.output_subdir)?;
    for line in status_lines(&paths)? {
        println!("{}", line);
    }
    Ok(())
}

pub(crate) fn status_lines(paths: &RunPaths) -> Result<Vec<String>> {
    let Some(cp) = Checkpoint::load(&paths.checkpoint())? else {
        let finished = ["wav", "mp3"]
            .iter()
            .map(|ext| paths.final_with_extension(ext))
            .find(|p| p.exists());
        return Ok(vec![match finished {
            Some(p) => format!("{}: complete ({})", paths.stem, p.display()),
            None => format!("{}: no checkpoint", paths.stem),
        }]);
    };
    let done = cp.completed_chunks.len();
    let pct = if cp.total_chunks == 0 {
        0.0
    } else {
        done as f64 / cp.total_chunks as f64 * 100.0
    };
    Ok(vec![
        format!(
            "{}: {}/{} units ({:.1}%)",
            cp.file, done, cp.total_chunks, pct
        ),
        format!("  voice: {}", cp.voice),
        format!("  updated: {}", cp.timestamp),
        format!("  checkpoint: {}", paths.checkpoint().display()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_core::checkpoint::CheckpointStore;

    #[test]
    fn reports_checkpoint_progress_or_absence() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("story.md");
        std::fs::write(&doc, "text").unwrap();
        let paths = RunPaths::new(&doc, "TTS").unwrap();

        assert_eq!(status_lines(&paths).unwrap(), vec!["story: no checkpoint"]);

        paths.ensure_out_dir().unwrap();
        let store = CheckpointStore::new(paths.checkpoint(), &doc, "abc", 4, "Kore");
        store.mark_completed(0).unwrap();
        let lines = status_lines(&paths).unwrap();
        assert_eq!(lines[0], "story.md: 1/4 units (25.0%)");
        assert_eq!(lines[1], "  voice: Kore");
    }
}
