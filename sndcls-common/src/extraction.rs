//! Feature extraction configuration
//!
//! Loaded once from a JSON document when the extractor is constructed.
//! Every field is mandatory; unknown fields and unknown modes are rejected
//! at load time so a bad configuration never reaches a request.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Fixed clip duration handed to the extractor, in seconds
pub const CLIP_DURATION_SECS: u32 = 4;

/// Size of the mel filter bank used by the mel-spectrogram and mfcc modes
pub const N_MELS: usize = 128;

/// Frame hop of the mfcc mode; the configured `hop_length` does not apply to it
pub const MFCC_HOP_LENGTH: usize = 512;

/// Time-frequency representation computed by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureMode {
    /// Mel-frequency cepstral coefficients (optionally with deltas)
    #[serde(rename = "mfcc")]
    Mfcc,
    /// Short-time Fourier transform magnitude
    #[serde(rename = "stft")]
    Stft,
    /// Mel filter bank power spectrogram
    ///
    /// `mel-spectogram` is the spelling found in older configuration files.
    #[serde(rename = "mel-spectrogram", alias = "mel-spectogram")]
    MelSpectrogram,
}

impl FeatureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureMode::Mfcc => "mfcc",
            FeatureMode::Stft => "stft",
            FeatureMode::MelSpectrogram => "mel-spectrogram",
        }
    }
}

impl std::fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction parameters shared by all modes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Selected transform
    pub mode: FeatureMode,
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// FFT window length in samples
    pub n_fft: usize,
    /// Samples between successive frames (stft and mel-spectrogram only)
    pub hop_length: usize,
    /// Number of cepstral coefficients (mfcc only)
    pub n_mfcc: usize,
    /// Append first and second order deltas (mfcc only)
    pub deltas: bool,
    /// Number of time frames every output tensor is padded to
    pub max_padding: usize,
}

impl ExtractionConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ExtractionConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid extraction config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the configuration file at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read extraction config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_json_str(&content)?;
        debug!(
            "Loaded extraction config from {}: mode={}, sr={}, n_fft={}, hop={}, max_padding={}",
            path.display(),
            config.mode,
            config.sample_rate,
            config.n_fft,
            config.frame_hop(),
            config.max_padding
        );
        Ok(config)
    }

    /// Check field ranges and the padding invariant
    ///
    /// `max_padding` must hold the frames produced by the longest clip the
    /// loader emits (`CLIP_DURATION_SECS` at `sample_rate`).
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("sample_rate", self.sample_rate as usize),
            ("n_fft", self.n_fft),
            ("hop_length", self.frame_hop()),
            ("n_mfcc", self.n_mfcc),
            ("max_padding", self.max_padding),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::Config(format!("{} must be positive", name)));
            }
        }

        if self.mode == FeatureMode::Mfcc && self.n_mfcc > N_MELS {
            return Err(Error::Config(format!(
                "n_mfcc ({}) cannot exceed the number of mel bands ({})",
                self.n_mfcc, N_MELS
            )));
        }

        let longest = self.frames_for_samples(self.clip_samples());
        if longest > self.max_padding {
            return Err(Error::Config(format!(
                "max_padding ({}) is smaller than the {} frames produced by a {}s clip at {} Hz with hop {}",
                self.max_padding, longest, CLIP_DURATION_SECS, self.sample_rate, self.frame_hop()
            )));
        }

        Ok(())
    }

    /// Maximum waveform length the loader produces
    pub fn clip_samples(&self) -> usize {
        self.sample_rate as usize * CLIP_DURATION_SECS as usize
    }

    /// Hop actually used by the selected mode
    pub fn frame_hop(&self) -> usize {
        match self.mode {
            FeatureMode::Mfcc => MFCC_HOP_LENGTH,
            FeatureMode::Stft | FeatureMode::MelSpectrogram => self.hop_length,
        }
    }

    /// Frame count of a centered STFT over `num_samples` samples
    pub fn frames_for_samples(&self, num_samples: usize) -> usize {
        1 + num_samples / self.frame_hop()
    }

    /// Size of the feature-band axis for the selected mode
    pub fn feature_bands(&self) -> usize {
        match self.mode {
            FeatureMode::Mfcc if self.deltas => self.n_mfcc * 3,
            FeatureMode::Mfcc => self.n_mfcc,
            FeatureMode::Stft => self.n_fft / 2 + 1,
            FeatureMode::MelSpectrogram => N_MELS,
        }
    }

    /// Shape of every tensor produced with this configuration
    pub fn output_shape(&self) -> [usize; 3] {
        [self.feature_bands(), self.max_padding, 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = r#"{
        "mode": "mfcc",
        "sample_rate": 22050,
        "n_fft": 2048,
        "hop_length": 512,
        "n_mfcc": 13,
        "deltas": false,
        "max_padding": 174
    }"#;

    #[test]
    fn test_parse_reference_config() {
        let config = ExtractionConfig::from_json_str(REFERENCE).unwrap();
        assert_eq!(config.mode, FeatureMode::Mfcc);
        assert_eq!(config.sample_rate, 22050);
        assert_eq!(config.clip_samples(), 88200);
        assert_eq!(config.frames_for_samples(88200), 173);
        assert_eq!(config.output_shape(), [13, 174, 1]);
    }

    #[test]
    fn test_unknown_mode_is_config_error() {
        let json = REFERENCE.replace("\"mfcc\"", "\"chroma\"");
        let err = ExtractionConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_legacy_mel_spelling_accepted() {
        let json = REFERENCE.replace("\"mfcc\"", "\"mel-spectogram\"");
        let config = ExtractionConfig::from_json_str(&json).unwrap();
        assert_eq!(config.mode, FeatureMode::MelSpectrogram);
        assert_eq!(config.feature_bands(), N_MELS);
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = REFERENCE.replace("\"deltas\": false,", "");
        assert!(matches!(
            ExtractionConfig::from_json_str(&json),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_padding_invariant_checked_at_load() {
        let json = REFERENCE.replace("174", "100");
        let err = ExtractionConfig::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("max_padding"));
    }

    #[test]
    fn test_zero_hop_rejected_when_used() {
        let json = REFERENCE
            .replace("\"hop_length\": 512", "\"hop_length\": 0")
            .replace("\"mfcc\"", "\"stft\"");
        assert!(matches!(
            ExtractionConfig::from_json_str(&json),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_mfcc_frames_ignore_hop_length() {
        for hop in ["0", "256", "1024"] {
            let json = REFERENCE.replace("512", hop);
            let config = ExtractionConfig::from_json_str(&json).unwrap();
            assert_eq!(config.frame_hop(), MFCC_HOP_LENGTH);
            assert_eq!(config.frames_for_samples(config.clip_samples()), 173);
        }

        // The same hop drives the frame count in the other modes
        let json = REFERENCE
            .replace("512", "256")
            .replace("\"mfcc\"", "\"mel-spectrogram\"");
        let err = ExtractionConfig::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("345 frames"), "got {}", err);
    }

    #[test]
    fn test_feature_bands_per_mode() {
        let mut config = ExtractionConfig::from_json_str(REFERENCE).unwrap();
        config.deltas = true;
        assert_eq!(config.feature_bands(), 39);
        config.mode = FeatureMode::Stft;
        assert_eq!(config.feature_bands(), 1025);
    }
}
