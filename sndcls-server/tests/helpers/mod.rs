//! Test Helper Utilities
//!
//! Shared utilities for testing sndcls-server

#![allow(dead_code)]

pub mod audio_generator;

pub use audio_generator::{generate_test_wav, generate_wav_bytes, AudioConfig};

use sndcls_common::{ExtractionConfig, FeatureMode};

/// The configuration shipped with the reference model
pub fn reference_config() -> ExtractionConfig {
    ExtractionConfig {
        mode: FeatureMode::Mfcc,
        sample_rate: 22050,
        n_fft: 2048,
        hop_length: 512,
        n_mfcc: 13,
        deltas: false,
        max_padding: 174,
    }
}

/// Small configuration that keeps tests fast
pub fn small_config(mode: FeatureMode) -> ExtractionConfig {
    ExtractionConfig {
        mode,
        sample_rate: 8000,
        n_fft: 512,
        hop_length: 256,
        n_mfcc: 20,
        deltas: false,
        max_padding: 130,
    }
}
