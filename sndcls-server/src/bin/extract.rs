//! sndcls-extract - run the loader and feature extractor on one file
//!
//! Prints the tensor shape and summary statistics as JSON. Useful for
//! checking that an extraction config matches a model's input shape
//! before deploying it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sndcls_common::ExtractionConfig;
use sndcls_server::audio::SignalLoader;
use sndcls_server::features::FeatureExtractor;

#[derive(Parser, Debug)]
#[command(name = "sndcls-extract")]
#[command(about = "Extract a feature tensor from an audio file")]
#[command(version)]
struct Args {
    /// Audio file to analyze
    input: PathBuf,

    /// Feature extraction JSON document
    #[arg(
        short,
        long,
        env = "SNDCLS_EXTRACTION_CONFIG",
        default_value = "config/feature_extraction.json"
    )]
    extraction_config: PathBuf,
}

#[derive(Debug, Serialize)]
struct Report {
    input: String,
    mode: String,
    sample_rate: u32,
    samples: usize,
    duration_seconds: f64,
    frames: usize,
    shape: [usize; 3],
    min: f32,
    max: f32,
    mean: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sndcls_server=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = ExtractionConfig::load(&args.extraction_config).with_context(|| {
        format!(
            "Failed to load extraction config: {}",
            args.extraction_config.display()
        )
    })?;
    let extractor = FeatureExtractor::new(config)?;

    let waveform = SignalLoader::for_config(extractor.config())
        .load_path(&args.input)
        .with_context(|| format!("Failed to load audio: {}", args.input.display()))?;
    let frames = extractor.num_frames(waveform.len());
    let tensor = extractor.extract(&waveform)?;

    let values = tensor.as_slice();
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mean = values.iter().sum::<f32>() / values.len().max(1) as f32;

    let report = Report {
        input: args.input.display().to_string(),
        mode: extractor.config().mode.to_string(),
        sample_rate: waveform.sample_rate,
        samples: waveform.len(),
        duration_seconds: waveform.duration_seconds(),
        frames,
        shape: tensor.shape(),
        min,
        max,
        mean,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
