//! Fusion-model classification strategy.
//!
//! Consumes the dual-stream model inputs through an opaque scorer and turns
//! the raw stress score into a binary verdict gated on confidence. Unlike
//! the rule and shallow paths this path is binary; the caller reconciles the
//! asymmetry.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Prediction, StageError, StressLevel};
use crate::prepare::ModelInputs;

/// Historical training average of the fusion blend weight, substituted when
/// the artifact cannot expose its per-sample alpha.
pub const FALLBACK_ALPHA: f32 = 0.84;

/// Confidence at or above which the fused verdict is Stress.
pub const STRESS_CONFIDENCE_GATE: f32 = 0.80;

/// Raw output of a fusion scoring artifact.
#[derive(Debug, Clone, Copy)]
pub struct FusionScore {
    /// Stress probability in [0, 1].
    pub probability: f32,
    /// Iris-stream blend weight, when the artifact exposes it.
    pub alpha: Option<f32>,
}

/// Opaque dual-stream scoring artifact.
pub trait FusionScorer: Send + Sync {
    /// Scores one prepared input set.
    ///
    /// # Errors
    ///
    /// Returns an error when the artifact cannot score the input.
    fn score(&self, inputs: &ModelInputs) -> anyhow::Result<FusionScore>;
}

/// Learned dual-stream classification strategy.
pub struct FusionModelClassifier {
    scorer: Arc<dyn FusionScorer>,
}

impl FusionModelClassifier {
    /// Creates a classifier around a scoring artifact.
    #[must_use]
    pub fn new(scorer: Arc<dyn FusionScorer>) -> Self {
        Self { scorer }
    }

    /// Scores the inputs and applies the confidence gate.
    ///
    /// `alpha` is diagnostic, not decision critical: a missing blend weight
    /// falls back to [`FALLBACK_ALPHA`] rather than failing the prediction.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Classification`] when the artifact fails or
    /// yields a score outside [0, 1].
    pub fn classify(&self, inputs: &ModelInputs) -> Result<Prediction, StageError> {
        let score = self
            .scorer
            .score(inputs)
            .map_err(|e| StageError::Classification(e.to_string()))?;

        let p = score.probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(StageError::Classification(format!(
                "stress score {p} outside [0, 1]"
            )));
        }

        let alpha = score.alpha.unwrap_or_else(|| {
            debug!("fusion alpha unavailable, using training average {FALLBACK_ALPHA}");
            FALLBACK_ALPHA
        });

        let confidence = p.max(1.0 - p);
        let stressed = confidence >= STRESS_CONFIDENCE_GATE;

        Ok(Prediction {
            stress_detected: stressed,
            stress_probability: p,
            stress_level: if stressed {
                StressLevel::Stress
            } else {
                StressLevel::Normal
            },
            confidence,
            reason: if stressed {
                "high-confidence fusion model verdict".into()
            } else {
                "model confidence below stress gate".into()
            },
            alpha: Some(alpha),
        })
    }
}
