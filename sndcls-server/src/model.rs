//! Classifier
//!
//! The trained model is an external artifact: a stack of dense layers
//! stored as safetensors (`layers.{i}.weight` `[out, in]`, `layers.{i}.bias`
//! `[out]`). It is loaded once at startup and shared read-only by every
//! request handler through `Arc<dyn Classifier>`.

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Linear, Module};
use sndcls_common::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::features::FeatureTensor;

/// Maps a feature tensor to one probability per class
pub trait Classifier: Send + Sync {
    /// Class probabilities, indexed by training-time class index
    fn predict(&self, features: &FeatureTensor) -> Result<Vec<f32>>;

    /// Width of the probability vector
    fn num_classes(&self) -> usize;
}

fn model_err(e: candle_core::Error) -> Error {
    Error::Model(e.to_string())
}

/// Dense network over the flattened `[1, bands, frames, 1]` input
pub struct DenseClassifier {
    layers: Vec<Linear>,
    input_shape: [usize; 3],
    num_classes: usize,
    device: Device,
}

impl std::fmt::Debug for DenseClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseClassifier")
            .field("layers", &self.layers.len())
            .field("input_shape", &self.input_shape)
            .field("num_classes", &self.num_classes)
            .finish()
    }
}

impl DenseClassifier {
    /// Load weights from a safetensors file
    ///
    /// `input_shape` is the extractor's output shape; the first layer's
    /// input width must equal its element count.
    pub fn load<P: AsRef<Path>>(path: P, input_shape: [usize; 3]) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::Cpu;
        let tensors = candle_core::safetensors::load(path, &device).map_err(|e| {
            Error::Model(format!("Failed to load model {}: {}", path.display(), e))
        })?;

        let classifier = Self::from_tensors(tensors, input_shape, device)?;
        info!(
            "Loaded classifier from {}: {} layers, input {:?}, {} classes",
            path.display(),
            classifier.layers.len(),
            classifier.input_shape,
            classifier.num_classes
        );
        Ok(classifier)
    }

    /// Assemble the network from named tensors
    pub fn from_tensors(
        mut tensors: HashMap<String, Tensor>,
        input_shape: [usize; 3],
        device: Device,
    ) -> Result<Self> {
        let input_width: usize = input_shape.iter().product();
        let mut layers = Vec::new();
        let mut width = input_width;

        for i in 0.. {
            let Some(weight) = tensors.remove(&format!("layers.{}.weight", i)) else {
                break;
            };
            let bias = tensors
                .remove(&format!("layers.{}.bias", i))
                .ok_or_else(|| Error::Model(format!("layers.{}.bias missing", i)))?;

            let weight = weight.to_dtype(DType::F32).map_err(model_err)?;
            let bias = bias.to_dtype(DType::F32).map_err(model_err)?;
            let (out_dim, in_dim) = weight.dims2().map_err(model_err)?;
            let bias_dim = bias.dims1().map_err(model_err)?;

            if in_dim != width {
                return Err(Error::Shape(format!(
                    "layer {} expects {} inputs but receives {} (feature shape {:?})",
                    i, in_dim, width, input_shape
                )));
            }
            if bias_dim != out_dim {
                return Err(Error::Model(format!(
                    "layer {} bias has {} entries for {} outputs",
                    i, bias_dim, out_dim
                )));
            }

            layers.push(Linear::new(weight, Some(bias)));
            width = out_dim;
        }

        if layers.is_empty() {
            return Err(Error::Model("model contains no layers".to_string()));
        }

        Ok(Self {
            layers,
            input_shape,
            num_classes: width,
            device,
        })
    }

    fn forward(&self, features: &FeatureTensor) -> candle_core::Result<Vec<f32>> {
        let mut x = features.to_candle(&self.device)?.flatten_from(1)?;
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x)?;
            if i < last {
                x = x.relu()?;
            }
        }
        candle_nn::ops::softmax(&x, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()
    }
}

impl Classifier for DenseClassifier {
    fn predict(&self, features: &FeatureTensor) -> Result<Vec<f32>> {
        if features.shape() != self.input_shape {
            return Err(Error::Shape(format!(
                "feature tensor {:?} does not match model input {:?}",
                features.shape(),
                self.input_shape
            )));
        }
        self.forward(features).map_err(model_err)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}
