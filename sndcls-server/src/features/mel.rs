//! Mel filter bank
//!
//! Slaney-scale triangular filters with Slaney area normalization, the
//! librosa `filters.mel(htk=False, norm="slaney")` default.

use super::FeatureMap;

/// Precomputed `[n_mels, n_fft/2 + 1]` filter weights
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    filters: Vec<Vec<f32>>,
}

impl MelFilterBank {
    /// Filters spanning `f_min..f_max` Hz
    pub fn new(n_mels: usize, n_fft: usize, sample_rate: u32, f_min: f64, f_max: f64) -> Self {
        let n_freqs = n_fft / 2 + 1;
        let sr = sample_rate as f64;

        let fft_freqs: Vec<f64> = (0..n_freqs)
            .map(|i| i as f64 * sr / n_fft as f64)
            .collect();

        let mel_min = hz_to_mel(f_min);
        let mel_max = hz_to_mel(f_max);
        let hz_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + i as f64 * (mel_max - mel_min) / (n_mels + 1) as f64))
            .collect();

        let filters = (0..n_mels)
            .map(|m| {
                let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
                let enorm = 2.0 / (right - left);
                fft_freqs
                    .iter()
                    .map(|&freq| {
                        let lower = (freq - left) / (center - left);
                        let upper = (right - freq) / (right - center);
                        (enorm * lower.min(upper).max(0.0)) as f32
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    /// Full-band bank (`0..sample_rate/2`)
    pub fn full_band(n_mels: usize, n_fft: usize, sample_rate: u32) -> Self {
        Self::new(n_mels, n_fft, sample_rate, 0.0, sample_rate as f64 / 2.0)
    }

    pub fn n_mels(&self) -> usize {
        self.filters.len()
    }

    pub fn filter(&self, mel: usize) -> &[f32] {
        &self.filters[mel]
    }

    /// Project power spectra (`columns[frame][bin]`) onto the mel bands
    pub fn apply(&self, power_columns: &[Vec<f32>]) -> FeatureMap {
        let columns: Vec<Vec<f32>> = power_columns
            .iter()
            .map(|frame| {
                self.filters
                    .iter()
                    .map(|filter| frame.iter().zip(filter).map(|(s, w)| s * w).sum::<f32>())
                    .collect()
            })
            .collect();
        FeatureMap::from_columns(self.n_mels(), &columns)
    }
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Slaney mel scale: linear below 1 kHz, logarithmic above
pub fn hz_to_mel(hz: f64) -> f64 {
    let min_log_mel = MIN_LOG_HZ / F_SP;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    let min_log_mel = MIN_LOG_HZ / F_SP;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (log_step() * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}
