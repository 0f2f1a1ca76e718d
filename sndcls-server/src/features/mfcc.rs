//! Cepstral features
//!
//! MFCC = orthonormal DCT-II of the dB-scaled mel power spectrogram.
//! Deltas are Savitzky–Golay derivatives over a 9-frame window with the
//! frame index clamped at the sequence edges.

use super::FeatureMap;

/// Floor applied before the log in `power_to_db`
const AMIN: f64 = 1e-10;
/// Dynamic range kept below the peak, in dB
const TOP_DB: f64 = 80.0;
/// Savitzky–Golay window length for deltas
pub const DELTA_WIDTH: usize = 9;

/// Convert a power map to decibels (reference power 1.0)
///
/// Values below `max - 80 dB` (max over the whole map) are raised to that floor.
pub fn power_to_db(power: &FeatureMap) -> Vec<f64> {
    let mut db: Vec<f64> = power
        .as_slice()
        .iter()
        .map(|&p| 10.0 * (p as f64).max(AMIN).log10())
        .collect();

    let peak = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let floor = peak - TOP_DB;
    for value in db.iter_mut() {
        *value = value.max(floor);
    }
    db
}

/// Truncated orthonormal DCT-II basis
#[derive(Debug, Clone)]
pub struct Dct {
    n_input: usize,
    basis: Vec<Vec<f64>>,
}

impl Dct {
    /// First `n_output` coefficients of a length-`n_input` DCT-II
    pub fn new(n_input: usize, n_output: usize) -> Self {
        let n = n_input as f64;
        let basis = (0..n_output)
            .map(|k| {
                let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                (0..n_input)
                    .map(|i| {
                        scale
                            * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0)
                                / (2.0 * n))
                                .cos()
                    })
                    .collect()
            })
            .collect();
        Self { n_input, basis }
    }

    pub fn n_output(&self) -> usize {
        self.basis.len()
    }

    /// Transform each frame of a band-major `[n_input, frames]` buffer
    pub fn apply(&self, input: &[f64], frames: usize) -> FeatureMap {
        debug_assert_eq!(input.len(), self.n_input * frames);
        let mut out = FeatureMap::zeros(self.n_output(), frames);
        for (k, row) in self.basis.iter().enumerate() {
            for t in 0..frames {
                let sum: f64 = row
                    .iter()
                    .enumerate()
                    .map(|(i, w)| w * input[i * frames + t])
                    .sum();
                out.set(k, t, sum as f32);
            }
        }
        out
    }
}

/// Compute MFCCs from a mel power map
pub fn mfcc_from_mel(mel_power: &FeatureMap, dct: &Dct) -> FeatureMap {
    let db = power_to_db(mel_power);
    dct.apply(&db, mel_power.frames())
}

/// Derivative order for `delta`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOrder {
    First,
    Second,
}

impl DeltaOrder {
    /// Filter coefficient for offset `k` in `-4..=4`
    fn coefficient(self, k: isize) -> f64 {
        let k = k as f64;
        match self {
            // Slope of a least-squares line
            DeltaOrder::First => k / 60.0,
            // Second derivative of a least-squares quadratic
            DeltaOrder::Second => (3.0 * k * k - 20.0) / 462.0,
        }
    }
}

/// Time derivative of every band, edges handled by repeating the nearest frame
pub fn delta(features: &FeatureMap, order: DeltaOrder) -> FeatureMap {
    let half = (DELTA_WIDTH / 2) as isize;
    let coefficients: Vec<(isize, f64)> = (-half..=half)
        .map(|k| (k, order.coefficient(k)))
        .collect();

    let frames = features.frames();
    let last = frames as isize - 1;
    let mut out = FeatureMap::zeros(features.bands(), frames);

    for band in 0..features.bands() {
        let row = features.row(band);
        let out_row = out.row_mut(band);
        for (t, slot) in out_row.iter_mut().enumerate() {
            let value: f64 = coefficients
                .iter()
                .map(|&(k, c)| {
                    let idx = (t as isize + k).clamp(0, last) as usize;
                    c * row[idx] as f64
                })
                .sum();
            *slot = value as f32;
        }
    }

    out
}
