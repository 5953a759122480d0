//! Minimal RIFF/WAVE (PCM) codec.
//!
//! Only what the pipeline needs: wrap raw PCM from the synthesizer in a
//! canonical 44-byte header, read a file back into (spec, samples), and
//! stream many PCM blocks into one output file whose size fields are patched
//! on finish.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const HEADER_LEN: usize = 44;
const FORMAT_PCM: u16 = 1;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Sample format of a PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// Saturates for specs that [`WavSpec::validate`] would reject.
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(u32::from(self.block_align()))
    }

    /// Number of whole frames in `data_len` bytes of samples.
    pub fn frames(&self, data_len: usize) -> u64 {
        match self.block_align() {
            0 => 0,
            align => (data_len / usize::from(align)) as u64,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.sample_rate == 0 {
            bail!("invalid WAV format: {} channel(s) at {} Hz", self.channels, self.sample_rate);
        }
        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 {
            bail!("unsupported bits per sample: {}", self.bits_per_sample);
        }
        // Both header fields must fit their on-disk widths.
        let align = self
            .channels
            .checked_mul(self.bits_per_sample / 8)
            .with_context(|| {
                format!(
                    "invalid WAV format: block align overflows for {} channel(s) of {} bits",
                    self.channels, self.bits_per_sample
                )
            })?;
        if self.sample_rate.checked_mul(u32::from(align)).is_none() {
            bail!(
                "invalid WAV format: byte rate overflows at {} Hz with {}-byte frames",
                self.sample_rate,
                align
            );
        }
        Ok(())
    }
}

fn header(spec: &WavSpec, data_len: u32) -> [u8; HEADER_LEN] {
    let mut h = [0u8; HEADER_LEN];
    h[0..4].copy_from_slice(b"RIFF");
    h[4..8].copy_from_slice(&(36u32.saturating_add(data_len)).to_le_bytes());
    h[8..12].copy_from_slice(b"WAVE");
    h[12..16].copy_from_slice(b"fmt ");
    h[16..20].copy_from_slice(&16u32.to_le_bytes());
    h[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
    h[22..24].copy_from_slice(&spec.channels.to_le_bytes());
    h[24..28].copy_from_slice(&spec.sample_rate.to_le_bytes());
    h[28..32].copy_from_slice(&spec.byte_rate().to_le_bytes());
    h[32..34].copy_from_slice(&spec.block_align().to_le_bytes());
    h[34..36].copy_from_slice(&spec.bits_per_sample.to_le_bytes());
    h[36..40].copy_from_slice(b"data");
    h[40..44].copy_from_slice(&data_len.to_le_bytes());
    h
}

/// Wrap raw little-endian PCM in a WAV container.
pub fn encode(spec: &WavSpec, pcm: &[u8]) -> Result<Vec<u8>> {
    spec.validate()?;
    let data_len = u32::try_from(pcm.len()).context("PCM data too large for WAV")?;
    let mut out = Vec::with_capacity(HEADER_LEN + pcm.len());
    out.extend_from_slice(&header(spec, data_len));
    out.extend_from_slice(pcm);
    Ok(out)
}

fn u16_at(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn u32_at(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

/// Parse a WAV byte buffer into its format and sample bytes.
///
/// Unknown chunks (`LIST`, `fact`, ...) are skipped. A data chunk whose
/// declared size runs past the end of the buffer is clamped.
pub fn decode(bytes: &[u8]) -> Result<(WavSpec, &[u8])> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        bail!("not a RIFF/WAVE file");
    }
    let mut spec: Option<WavSpec> = None;
    let mut pos = 12usize;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = u32_at(bytes, pos + 4) as usize;
        let body = pos + 8;
        match id {
            b"fmt " => {
                if size < 16 || body + 16 > bytes.len() {
                    bail!("truncated fmt chunk");
                }
                let format = u16_at(bytes, body);
                if format != FORMAT_PCM && format != FORMAT_EXTENSIBLE {
                    bail!("unsupported WAV format code {}", format);
                }
                let parsed = WavSpec {
                    channels: u16_at(bytes, body + 2),
                    sample_rate: u32_at(bytes, body + 4),
                    bits_per_sample: u16_at(bytes, body + 14),
                };
                parsed.validate()?;
                spec = Some(parsed);
            }
            b"data" => {
                let Some(spec) = spec else {
                    bail!("data chunk before fmt chunk");
                };
                let end = body.saturating_add(size).min(bytes.len());
                return Ok((spec, &bytes[body..end]));
            }
            _ => {}
        }
        // Chunks are word aligned.
        pos = body.saturating_add(size).saturating_add(size & 1);
    }
    bail!("no data chunk")
}

/// Read a WAV file into (spec, sample bytes).
pub fn read(path: &Path) -> Result<(WavSpec, Vec<u8>)> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let (spec, data) = decode(&bytes).with_context(|| format!("decode {}", path.display()))?;
    Ok((spec, data.to_vec()))
}

/// Streams PCM blocks into `<final>.part`, then patches the header and renames.
pub struct WavAppender {
    file: File,
    temp_path: PathBuf,
    spec: WavSpec,
    data_len: u64,
}

impl WavAppender {
    pub fn create(final_path: &Path, spec: WavSpec) -> Result<Self> {
        spec.validate()?;
        let temp_path = super::temp_path(final_path);
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        file.write_all(&header(&spec, 0))
            .context("write WAV header")?;
        Ok(Self {
            file,
            temp_path,
            spec,
            data_len: 0,
        })
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Append raw sample bytes in the appender's format.
    pub fn append(&mut self, pcm: &[u8]) -> Result<()> {
        let new_len = self.data_len + pcm.len() as u64;
        if new_len > u64::from(u32::MAX) - 36 {
            bail!("assembled audio exceeds the 4 GiB WAV limit");
        }
        self.file.write_all(pcm).context("append WAV data")?;
        self.data_len = new_len;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.spec.frames(self.data_len as usize)
    }

    /// Patch sizes, fsync and rename to `final_path`. Returns total frames.
    pub fn finish(mut self, final_path: &Path) -> Result<u64> {
        let data_len = self.data_len as u32;
        self.file.seek(SeekFrom::Start(0)).context("seek WAV header")?;
        self.file
            .write_all(&header(&self.spec, data_len))
            .context("patch WAV header")?;
        self.file.sync_all().context("storage sync failed")?;
        let frames = self.frames();
        drop(self.file);
        super::finalize(&self.temp_path, final_path)?;
        Ok(frames)
    }
}
