//! Feature containers
//!
//! `FeatureMap` is the two-dimensional `[bands, frames]` output of a
//! transform. `FeatureTensor` is the padded, rank-3 `[bands, frames, 1]`
//! value handed to the classifier. Both are row-major (band-major).

use candle_core::{Device, Tensor};

/// Row-major `[bands, frames]` matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMap {
    bands: usize,
    frames: usize,
    data: Vec<f32>,
}

impl FeatureMap {
    /// All-zero map
    pub fn zeros(bands: usize, frames: usize) -> Self {
        Self {
            bands,
            frames,
            data: vec![0.0; bands * frames],
        }
    }

    /// Build from band-major data; `None` if the length does not match
    pub fn from_vec(bands: usize, frames: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == bands * frames).then_some(Self {
            bands,
            frames,
            data,
        })
    }

    /// Build from per-frame columns (`columns[frame][band]`), the natural
    /// output order of a frame-by-frame transform
    pub fn from_columns(bands: usize, columns: &[Vec<f32>]) -> Self {
        let frames = columns.len();
        let mut map = Self::zeros(bands, frames);
        for (t, column) in columns.iter().enumerate() {
            for (b, &value) in column.iter().take(bands).enumerate() {
                map.data[b * frames + t] = value;
            }
        }
        map
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn get(&self, band: usize, frame: usize) -> f32 {
        self.data[band * self.frames + frame]
    }

    pub fn set(&mut self, band: usize, frame: usize, value: f32) {
        self.data[band * self.frames + frame] = value;
    }

    /// One band across all frames
    pub fn row(&self, band: usize) -> &[f32] {
        &self.data[band * self.frames..(band + 1) * self.frames]
    }

    pub fn row_mut(&mut self, band: usize) -> &mut [f32] {
        let frames = self.frames;
        &mut self.data[band * frames..(band + 1) * frames]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Concatenate maps along the band axis; all inputs must share a frame count
    pub fn stack_bands(maps: &[&FeatureMap]) -> Option<FeatureMap> {
        let frames = maps.first()?.frames;
        if maps.iter().any(|m| m.frames != frames) {
            return None;
        }
        let bands = maps.iter().map(|m| m.bands).sum();
        let mut data = Vec::with_capacity(bands * frames);
        for map in maps {
            data.extend_from_slice(&map.data);
        }
        Some(FeatureMap {
            bands,
            frames,
            data,
        })
    }
}

/// Rank-3 `[bands, frames, 1]` tensor with a fixed frame count
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    map: FeatureMap,
}

impl FeatureTensor {
    /// Append the trailing channel axis to a padded map
    pub fn from_map(map: FeatureMap) -> Self {
        Self { map }
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.map.bands, self.map.frames, 1]
    }

    pub fn get(&self, band: usize, frame: usize, channel: usize) -> f32 {
        debug_assert_eq!(channel, 0);
        self.map.get(band, frame)
    }

    /// Flattened row-major values
    pub fn as_slice(&self) -> &[f32] {
        self.map.as_slice()
    }

    /// Batch of one: `[1, bands, frames, 1]`
    pub fn to_candle(&self, device: &Device) -> candle_core::Result<Tensor> {
        Tensor::from_slice(
            self.map.as_slice(),
            (1, self.map.bands, self.map.frames, 1),
            device,
        )
    }
}
