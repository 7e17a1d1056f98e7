//! Dual-stream fusion network.
//!
//! Two convolutional streams (pupil+age, iris+ring count) feed a learnable
//! blend gate: `alpha` weights the iris branch, `1 - alpha` the pupil
//! branch, and the fused embedding yields a single stress logit. The gate
//! value doubles as the diagnostic blend weight reported to callers.

#![allow(clippy::cast_possible_truncation)]

use anyhow::{bail, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, VarBuilder};
use tracing::warn;

use crate::classify::{FusionScore, FusionScorer};
use crate::inference::sigmoid;
use crate::prepare::{ModelInputs, AGE_BINS, MODEL_CHANNELS, TARGET_SIZE};

const STREAM_EMBED: usize = 128;
const AGE_EMBED: usize = 16;
const RING_EMBED: usize = 8;
const HEAD_HIDDEN: usize = 64;

/// After three 2x2 max pools: 224 -> 112 -> 56 -> 28.
const POOLED_SIDE: usize = TARGET_SIZE / 8;
const STREAM_FLAT: usize = 64 * POOLED_SIDE * POOLED_SIDE;

/// One convolutional image stream.
struct ConvStream {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    fc: Linear,
}

impl ConvStream {
    fn new(vb: VarBuilder) -> Result<Self> {
        let cfg = Conv2dConfig {
            padding: 1,
            ..Conv2dConfig::default()
        };
        let conv1 = conv2d(MODEL_CHANNELS, 16, 3, cfg, vb.pp("conv1"))?;
        let conv2 = conv2d(16, 32, 3, cfg, vb.pp("conv2"))?;
        let conv3 = conv2d(32, 64, 3, cfg, vb.pp("conv3"))?;
        let fc = linear(STREAM_FLAT, STREAM_EMBED, vb.pp("fc"))?;
        Ok(Self {
            conv1,
            conv2,
            conv3,
            fc,
        })
    }
}

impl Module for ConvStream {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let x = self.conv1.forward(x)?.relu()?.max_pool2d(2)?;
        let x = self.conv2.forward(&x)?.relu()?.max_pool2d(2)?;
        let x = self.conv3.forward(&x)?.relu()?.max_pool2d(2)?;
        let x = x.flatten_from(1)?;
        self.fc.forward(&x)?.relu()
    }
}

/// Dual-stream implementation of [`FusionScorer`].
pub struct DualStreamNet {
    pupil_stream: ConvStream,
    iris_stream: ConvStream,
    age_embed: Linear,
    ring_embed: Linear,
    pupil_branch: Linear,
    iris_branch: Linear,
    gate: Linear,
    head1: Linear,
    head2: Linear,
    device: Device,
}

impl DualStreamNet {
    /// Builds the network from loaded weights.
    ///
    /// # Errors
    ///
    /// Returns an error when the weights do not match the architecture.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        Ok(Self {
            pupil_stream: ConvStream::new(vb.pp("pupil_stream"))?,
            iris_stream: ConvStream::new(vb.pp("iris_stream"))?,
            age_embed: linear(AGE_BINS, AGE_EMBED, vb.pp("age_embed"))?,
            ring_embed: linear(1, RING_EMBED, vb.pp("ring_embed"))?,
            pupil_branch: linear(STREAM_EMBED + AGE_EMBED, STREAM_EMBED, vb.pp("pupil_branch"))?,
            iris_branch: linear(STREAM_EMBED + RING_EMBED, STREAM_EMBED, vb.pp("iris_branch"))?,
            gate: linear(2 * STREAM_EMBED, 1, vb.pp("gate"))?,
            head1: linear(STREAM_EMBED, HEAD_HIDDEN, vb.pp("head1"))?,
            head2: linear(HEAD_HIDDEN, 1, vb.pp("head2"))?,
            device,
        })
    }

    /// Runs the fused forward pass, returning (stress logit, gate logit).
    fn forward_logits(&self, inputs: &ModelInputs) -> candle_core::Result<(f32, f32)> {
        let plane = TARGET_SIZE * TARGET_SIZE;
        let shape = (1, MODEL_CHANNELS, TARGET_SIZE, TARGET_SIZE);

        let pupil = Tensor::from_vec(inputs.pupil_image.clone(), shape, &self.device)?;
        let iris = Tensor::from_vec(inputs.iris_image.clone(), shape, &self.device)?;
        let age = Tensor::from_vec(inputs.age_vector.to_vec(), (1, AGE_BINS), &self.device)?;
        let ring = Tensor::from_vec(vec![inputs.ring_count_normalized], (1, 1), &self.device)?;
        debug_assert_eq!(inputs.pupil_image.len(), MODEL_CHANNELS * plane);

        let pupil_feat = self.pupil_stream.forward(&pupil)?;
        let age_feat = self.age_embed.forward(&age)?.relu()?;
        let pupil_branch = self
            .pupil_branch
            .forward(&Tensor::cat(&[&pupil_feat, &age_feat], 1)?)?
            .relu()?;

        let iris_feat = self.iris_stream.forward(&iris)?;
        let ring_feat = self.ring_embed.forward(&ring)?.relu()?;
        let iris_branch = self
            .iris_branch
            .forward(&Tensor::cat(&[&iris_feat, &ring_feat], 1)?)?
            .relu()?;

        let gate_logit = self
            .gate
            .forward(&Tensor::cat(&[&pupil_branch, &iris_branch], 1)?)?
            .squeeze(0)?
            .squeeze(0)?
            .to_scalar::<f32>()?;
        let alpha = sigmoid(gate_logit);

        let fused = ((iris_branch * f64::from(alpha))?
            + (pupil_branch * f64::from(1.0 - alpha))?)?;
        let stress_logit = self
            .head2
            .forward(&self.head1.forward(&fused)?.relu()?)?
            .squeeze(0)?
            .squeeze(0)?
            .to_scalar::<f32>()?;

        Ok((stress_logit, gate_logit))
    }
}

impl FusionScorer for DualStreamNet {
    fn score(&self, inputs: &ModelInputs) -> Result<FusionScore> {
        let plane = TARGET_SIZE * TARGET_SIZE;
        let expected = MODEL_CHANNELS * plane;
        if inputs.pupil_image.len() != expected || inputs.iris_image.len() != expected {
            bail!(
                "input shape mismatch: pupil {} / iris {} (expected {expected})",
                inputs.pupil_image.len(),
                inputs.iris_image.len()
            );
        }

        // The pupil stream was trained with structural channels zeroed.
        let structural_zeroed = inputs.pupil_image[3 * plane..].iter().all(|&v| v == 0.0);
        let corrected;
        let inputs = if structural_zeroed {
            inputs
        } else {
            warn!("pupil structural channels not zeroed; zeroing before inference");
            let mut fixed = inputs.clone();
            fixed.pupil_image[3 * plane..].fill(0.0);
            corrected = fixed;
            &corrected
        };

        let (stress_logit, gate_logit) = self.forward_logits(inputs)?;
        Ok(FusionScore {
            probability: sigmoid(stress_logit),
            alpha: Some(sigmoid(gate_logit)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    fn zero_inputs() -> ModelInputs {
        let plane = MODEL_CHANNELS * TARGET_SIZE * TARGET_SIZE;
        ModelInputs {
            pupil_image: vec![0.0; plane],
            iris_image: vec![0.0; plane],
            age_vector: {
                let mut v = [0.0; AGE_BINS];
                v[2] = 1.0;
                v
            },
            ring_count_normalized: 0.1,
        }
    }

    #[test]
    fn test_zero_weights_score_at_chance() {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let net = DualStreamNet::new(vb).expect("architecture");
        let score = net.score(&zero_inputs()).expect("inference");

        assert!((score.probability - 0.5).abs() < 1e-5);
        assert!((score.alpha.expect("gate always present") - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let net = DualStreamNet::new(vb).expect("architecture");

        let mut inputs = zero_inputs();
        inputs.iris_image.truncate(100);
        let err = net.score(&inputs).expect_err("shape mismatch");
        assert!(err.to_string().contains("input shape mismatch"));
    }
}
