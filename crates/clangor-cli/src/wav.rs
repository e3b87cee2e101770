//! 32-bit float WAV output.

use std::path::Path;

use anyhow::{Context, ensure};
use hound::{SampleFormat, WavSpec, WavWriter};

/// Writes equal-length channels as an interleaved 32-bit float WAV file.
pub fn write_wav(path: &Path, channels: &[Vec<f64>], sample_rate: u32) -> anyhow::Result<()> {
    ensure!(!channels.is_empty(), "no channels to write");
    let frames = channels[0].len();
    ensure!(
        channels.iter().all(|c| c.len() == frames),
        "channels differ in length"
    );

    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;

    for i in 0..frames {
        for channel in channels {
            writer.write_sample(channel[i] as f32)?;
        }
    }

    writer.finalize()?;
    Ok(())
}
