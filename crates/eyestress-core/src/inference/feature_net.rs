//! Shallow MLP scorer over the hand-crafted feature vector.
//!
//! A small three-layer network distilled from the original tree-ensemble
//! classifier; it consumes the 11-column descriptor and yields a 3-way
//! probability distribution over {Normal, Partial, Stress}.

use anyhow::Result;
use candle_core::{Device, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

use crate::classify::FeatureScorer;
use crate::features::{FeatureVector, FEATURE_COUNT};

const HIDDEN_1: usize = 32;
const HIDDEN_2: usize = 16;
const CLASSES: usize = 3;

/// MLP implementation of [`FeatureScorer`].
pub struct FeatureMlp {
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
    device: Device,
}

impl FeatureMlp {
    /// Builds the network from loaded weights.
    ///
    /// # Errors
    ///
    /// Returns an error when the weights do not match the architecture.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        let fc1 = linear(FEATURE_COUNT, HIDDEN_1, vb.pp("fc1"))?;
        let fc2 = linear(HIDDEN_1, HIDDEN_2, vb.pp("fc2"))?;
        let fc3 = linear(HIDDEN_2, CLASSES, vb.pp("fc3"))?;
        Ok(Self {
            fc1,
            fc2,
            fc3,
            device,
        })
    }
}

impl Module for FeatureMlp {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let x = self.fc1.forward(x)?.relu()?;
        let x = self.fc2.forward(&x)?.relu()?;
        self.fc3.forward(&x)
    }
}

impl FeatureScorer for FeatureMlp {
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f32; 3]> {
        let x = Tensor::from_vec(
            features.as_array().to_vec(),
            (1, FEATURE_COUNT),
            &self.device,
        )?;
        let logits = self.forward(&x)?;
        let probs = candle_nn::ops::softmax(&logits, 1)?;
        let v = probs.squeeze(0)?.to_vec1::<f32>()?;
        Ok([v[0], v[1], v[2]])
    }
}
