//! Short-time Fourier transform
//!
//! Centered frames (the signal is zero-padded by `n_fft / 2` on both
//! sides) windowed with a periodic Hann window, matching librosa's
//! `stft(center=True, pad_mode="constant")`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use super::FeatureMap;

/// Planned STFT for a fixed window and hop
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .finish()
    }
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        Self {
            n_fft,
            hop_length,
            window: hann_window(n_fft),
            fft,
        }
    }

    /// Number of non-negative frequency bins
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frames produced for a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        let padded = len + 2 * (self.n_fft / 2);
        if padded < self.n_fft {
            return 0;
        }
        1 + (padded - self.n_fft) / self.hop_length
    }

    /// Complex spectrum per frame: `result[frame][bin]`
    pub fn spectrum(&self, samples: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let num_frames = self.num_frames(samples.len());
        let pad = (self.n_fft / 2) as isize;
        let n = samples.len() as isize;
        let bins = self.num_bins();

        let mut frames = Vec::with_capacity(num_frames);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];

        for frame_idx in 0..num_frames {
            let start = (frame_idx * self.hop_length) as isize - pad;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let idx = start + i as isize;
                let sample = if idx >= 0 && idx < n {
                    samples[idx as usize] * self.window[i]
                } else {
                    0.0
                };
                *slot = Complex::new(sample, 0.0);
            }

            self.fft.process(&mut buffer);
            frames.push(buffer[..bins].to_vec());
        }

        frames
    }

    /// Magnitude spectrogram `|X|` as `[bins, frames]`
    pub fn magnitude(&self, samples: &[f32]) -> FeatureMap {
        let columns: Vec<Vec<f32>> = self
            .spectrum(samples)
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect();
        FeatureMap::from_columns(self.num_bins(), &columns)
    }

    /// Power spectrum `|X|²` per frame: `result[frame][bin]`
    pub fn power_columns(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.spectrum(samples)
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
            .collect()
    }
}

/// Periodic Hann window
pub fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|n| 0.5 * (1.0 - (2.0 * PI * n as f32 / length as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = hann_window(400);
        assert_eq!(window.len(), 400);
        assert!(window[0].abs() < 1e-6);
        assert!((window[200] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_centered_frame_count() {
        let stft = Stft::new(2048, 512);
        assert_eq!(stft.num_frames(88200), 173);
        assert_eq!(stft.num_frames(1), 1);

        let odd = Stft::new(5, 2);
        assert_eq!(odd.num_frames(10), 5);
    }

    #[test]
    fn test_silence_has_zero_magnitude() {
        let stft = Stft::new(256, 64);
        let map = stft.magnitude(&vec![0.0; 1000]);
        assert_eq!(map.bands(), 129);
        assert_eq!(map.frames(), 1 + 1000 / 64);
        assert!(map.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let sr = 8000.0;
        let n_fft = 256;
        // Bin 32 → 32 * 8000 / 256 = 1000 Hz
        let samples: Vec<f32> = (0..4000)
            .map(|i| (2.0 * PI * 1000.0 * i as f32 / sr).sin())
            .collect();
        let stft = Stft::new(n_fft, 128);
        let map = stft.magnitude(&samples);

        let mid = map.frames() / 2;
        let peak = (0..map.bands())
            .max_by(|&a, &b| map.get(a, mid).total_cmp(&map.get(b, mid)))
            .unwrap();
        assert_eq!(peak, 32);
    }
}
