//! WAV encoding — 16-bit mono PCM output.
//!
//! 16-bit PCM is the one format every consumer decodes reliably; float WAV
//! in particular trips up several mobile media stacks.  Samples are clamped
//! to `[-1, 1]` before scaling, so out-of-range vocoder output degrades to
//! hard clipping rather than wraparound.

use std::{io::Cursor, path::Path};

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

fn pcm_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).floor() as i16
}

/// Encode `samples` to an in-memory RIFF/WAVE byte buffer.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut buffer, pcm_spec(sample_rate)).context("WAV header error")?;
        for &s in samples {
            writer.write_sample(to_i16(s)).context("WAV write error")?;
        }
        writer.finalize().context("WAV finalise error")?;
    }
    Ok(buffer.into_inner())
}

/// Write `samples` to a WAV file at `path`.
pub fn write_wav(samples: &[f32], sample_rate: u32, path: &Path) -> Result<()> {
    let mut writer = WavWriter::create(path, pcm_spec(sample_rate))
        .with_context(|| format!("Cannot create WAV: {}", path.display()))?;
    for &s in samples {
        writer.write_sample(to_i16(s)).context("WAV write error")?;
    }
    writer.finalize().context("WAV finalise error")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
