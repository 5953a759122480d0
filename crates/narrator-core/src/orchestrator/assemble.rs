//! Ordered concatenation of per-unit WAV artifacts.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::storage::{self, wav};

use super::paths::RunPaths;

/// The assembled WAV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub path: PathBuf,
    pub frames: u64,
    pub spec: wav::WavSpec,
}

/// Append every unit's samples in index order into `<stem>.wav`. The format
/// is taken from unit 0; a unit in a different format is an error. On any
/// error the partial `<stem>.wav.part` is removed.
pub(super) fn assemble(paths: &RunPaths, unit_count: usize) -> Result<Assembled> {
    if unit_count == 0 {
        bail!("nothing to assemble");
    }
    let first = paths.unit_artifact(0);
    let (spec, first_data) =
        wav::read(&first).context("first unit missing, cannot determine audio format")?;

    let out = paths.final_wav();
    let frames = match append_units(paths, unit_count, spec, &first_data, &out) {
        Ok(frames) => frames,
        Err(e) => {
            let part = storage::temp_path(&out);
            if let Err(rm) = storage::remove_if_exists(&part) {
                tracing::warn!("failed to delete {}: {:#}", part.display(), rm);
            }
            return Err(e);
        }
    };
    tracing::info!(output = %out.display(), units = unit_count, frames, "audio assembled");
    Ok(Assembled {
        path: out,
        frames,
        spec,
    })
}

fn append_units(
    paths: &RunPaths,
    unit_count: usize,
    spec: wav::WavSpec,
    first_data: &[u8],
    out: &Path,
) -> Result<u64> {
    let mut appender = wav::WavAppender::create(out, spec)?;
    appender.append(first_data)?;
    for index in 1..unit_count {
        let path = paths.unit_artifact(index);
        let (unit_spec, data) =
            wav::read(&path).with_context(|| format!("unit {} unreadable", index))?;
        if unit_spec != spec {
            bail!(
                "unit {} has format {:?}, expected {:?}",
                index,
                unit_spec,
                spec
            );
        }
        appender.append(&data)?;
    }
    appender.finish(out)
}

/// Delete per-unit artifacts (and stray temp files). Failures are logged only.
pub(super) fn remove_unit_artifacts(paths: &RunPaths, unit_count: usize) {
    for index in 0..unit_count {
        let path = paths.unit_artifact(index);
        for p in [storage::temp_path(&path), path] {
            if let Err(e) = storage::remove_if_exists(&p) {
                tracing::warn!("failed to delete {}: {:#}", p.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONO_16: wav::WavSpec = wav::WavSpec {
        sample_rate: 24_000,
        channels: 1,
        bits_per_sample: 16,
    };

    fn store_unit(paths: &RunPaths, index: usize, spec: &wav::WavSpec, pcm: &[u8]) {
        let bytes = wav::encode(spec, pcm).unwrap();
        storage::write_atomic(&paths.unit_artifact(index), &bytes).unwrap();
    }

    fn run_paths(dir: &Path) -> RunPaths {
        let paths = RunPaths::new(&dir.join("book.md"), "TTS").unwrap();
        paths.ensure_out_dir().unwrap();
        paths
    }

    #[test]
    fn joins_units_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = run_paths(dir.path());
        store_unit(&paths, 0, &MONO_16, &[1, 0, 2, 0]);
        store_unit(&paths, 1, &MONO_16, &[3, 0]);

        let assembled = assemble(&paths, 2).unwrap();
        assert_eq!(assembled.frames, 3);
        let (_, data) = wav::read(&paths.final_wav()).unwrap();
        assert_eq!(data, vec![1, 0, 2, 0, 3, 0]);
        assert!(!storage::temp_path(&paths.final_wav()).exists());
    }

    #[test]
    fn missing_unit_leaves_no_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let paths = run_paths(dir.path());
        store_unit(&paths, 0, &MONO_16, &[1, 0, 2, 0]);

        let err = assemble(&paths, 2).unwrap_err();
        assert!(format!("{:#}", err).contains("unit 1"));
        assert!(!storage::temp_path(&paths.final_wav()).exists());
        assert!(!paths.final_wav().exists());
    }

    #[test]
    fn format_mismatch_leaves_no_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let paths = run_paths(dir.path());
        let stereo = wav::WavSpec {
            channels: 2,
            ..MONO_16
        };
        store_unit(&paths, 0, &MONO_16, &[1, 0]);
        store_unit(&paths, 1, &stereo, &[1, 0, 2, 0]);

        let err = assemble(&paths, 2).unwrap_err();
        assert!(err.to_string().contains("unit 1 has format"));
        assert!(!storage::temp_path(&paths.final_wav()).exists());
        assert!(!paths.final_wav().exists());
    }
}
