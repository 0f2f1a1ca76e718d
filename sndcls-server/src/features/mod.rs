//! Feature extraction
//!
//! Turns a loaded waveform into the fixed-shape `[bands, max_padding, 1]`
//! tensor the classifier was trained on:
//!
//! 1. Dispatch on `FeatureMode` to MFCC, STFT magnitude or mel power
//!    (MFCC frames always advance by `MFCC_HOP_LENGTH`)
//! 2. Zero-pad the frame axis to `max_padding`
//! 3. Append the channel axis
//!
//! Extraction is a pure function of (waveform, config): the extractor only
//! holds plans and filter banks derived from its configuration.

pub mod mel;
pub mod mfcc;
pub mod padding;
pub mod stft;
pub mod tensor;

pub use padding::pad_frames;
pub use tensor::{FeatureMap, FeatureTensor};

use sndcls_common::extraction::N_MELS;
use sndcls_common::{Error, ExtractionConfig, FeatureMode, Result};
use tracing::debug;

use crate::audio::Waveform;
use mel::MelFilterBank;
use mfcc::{DeltaOrder, Dct};
use stft::Stft;

/// Configured extractor, built once and shared read-only across requests
#[derive(Debug)]
pub struct FeatureExtractor {
    config: ExtractionConfig,
    stft: Stft,
    mel_bank: Option<MelFilterBank>,
    dct: Option<Dct>,
}

impl FeatureExtractor {
    /// Validate `config` and precompute the transforms its mode needs
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;

        let stft = Stft::new(config.n_fft, config.frame_hop());
        let mel_bank = match config.mode {
            FeatureMode::Mfcc | FeatureMode::MelSpectrogram => Some(MelFilterBank::full_band(
                N_MELS,
                config.n_fft,
                config.sample_rate,
            )),
            FeatureMode::Stft => None,
        };
        let dct = match config.mode {
            FeatureMode::Mfcc => Some(Dct::new(N_MELS, config.n_mfcc)),
            FeatureMode::Stft | FeatureMode::MelSpectrogram => None,
        };

        debug!(
            mode = %config.mode,
            shape = ?config.output_shape(),
            "Feature extractor ready"
        );

        Ok(Self {
            config,
            stft,
            mel_bank,
            dct,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Shape of every tensor this extractor returns
    pub fn output_shape(&self) -> [usize; 3] {
        self.config.output_shape()
    }

    /// Frames the transform yields for `num_samples` samples, before padding
    pub fn num_frames(&self, num_samples: usize) -> usize {
        self.stft.num_frames(num_samples)
    }

    /// Compute the padded `[bands, max_padding, 1]` tensor for `waveform`
    ///
    /// # Errors
    /// * `Error::Config` - waveform sample rate differs from the configuration
    /// * `Error::Decode` - waveform is empty
    /// * `Error::Shape` - transform produced more than `max_padding` frames
    pub fn extract(&self, waveform: &Waveform) -> Result<FeatureTensor> {
        if waveform.sample_rate != self.config.sample_rate {
            return Err(Error::Config(format!(
                "waveform sample rate {} Hz does not match configured {} Hz",
                waveform.sample_rate, self.config.sample_rate
            )));
        }
        if waveform.is_empty() {
            return Err(Error::Decode("waveform contains no samples".to_string()));
        }

        let map = self.compute(&waveform.samples)?;
        let padded = pad_frames(&map, self.config.max_padding)?;

        debug!(
            mode = %self.config.mode,
            frames = map.frames(),
            padded_to = self.config.max_padding,
            "Extracted features"
        );

        Ok(FeatureTensor::from_map(padded))
    }

    /// Unpadded `[bands, frames]` map for the configured mode
    ///
    /// # Errors
    /// * `Error::Shape` - delta blocks disagree on frame count
    pub fn compute(&self, samples: &[f32]) -> Result<FeatureMap> {
        match self.config.mode {
            FeatureMode::Mfcc if self.config.deltas => {
                let base = self.mfcc(samples);
                let first = mfcc::delta(&base, DeltaOrder::First);
                let second = mfcc::delta(&base, DeltaOrder::Second);
                FeatureMap::stack_bands(&[&base, &first, &second]).ok_or_else(|| {
                    Error::Shape(format!(
                        "delta blocks do not share the {} frames of the base mfcc",
                        base.frames()
                    ))
                })
            }
            FeatureMode::Mfcc => Ok(self.mfcc(samples)),
            FeatureMode::Stft => Ok(self.stft.magnitude(samples)),
            FeatureMode::MelSpectrogram => Ok(self.mel_power(samples)),
        }
    }

    /// Base cepstral coefficients without deltas
    pub fn mfcc(&self, samples: &[f32]) -> FeatureMap {
        let mel_power = self.mel_power(samples);
        match &self.dct {
            Some(dct) => mfcc::mfcc_from_mel(&mel_power, dct),
            None => mfcc::mfcc_from_mel(&mel_power, &Dct::new(N_MELS, self.config.n_mfcc)),
        }
    }

    /// Mel power spectrogram `[N_MELS, frames]`
    pub fn mel_power(&self, samples: &[f32]) -> FeatureMap {
        let power = self.stft.power_columns(samples);
        match &self.mel_bank {
            Some(bank) => bank.apply(&power),
            None => MelFilterBank::full_band(N_MELS, self.config.n_fft, self.config.sample_rate)
                .apply(&power),
        }
    }
}

/// One-shot extraction: build an extractor for `config` and run it on `waveform`
pub fn extract(waveform: &Waveform, config: &ExtractionConfig) -> Result<FeatureTensor> {
    FeatureExtractor::new(config.clone())?.extract(waveform)
}
