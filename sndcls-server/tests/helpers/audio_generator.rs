//! Audio Test Fixture Generator
//!
//! Utilities for generating WAV clips on disk or in memory

use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Tone frequency; `None` writes silence
    pub frequency: Option<f32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 4.0,
            sample_rate: 22050,
            channels: 1,
            frequency: Some(440.0),
        }
    }
}

fn write_wav<W: Write + Seek>(writer: W, config: &AudioConfig) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(writer, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..total_samples {
        let sample = match config.frequency {
            Some(freq) => {
                // Tone at 30% amplitude
                let t = i as f32 / config.sample_rate as f32;
                (0.3 * (2.0 * std::f32::consts::PI * freq * t).sin() * i16::MAX as f32) as i16
            }
            None => 0,
        };

        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Generate a test WAV file with specified configuration
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_wav(file, config)?;
    Ok(path.to_path_buf())
}

/// Generate WAV bytes, as a client would upload them
pub fn generate_wav_bytes(config: &AudioConfig) -> anyhow::Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, config)?;
    Ok(cursor.into_inner())
}
