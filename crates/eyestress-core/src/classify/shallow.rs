//! Shallow-classifier strategy over the hand-crafted feature vector.
//!
//! An opaque scorer turns the 11-element descriptor into a probability
//! vector over {Normal, Partial, Stress}. The decision is not an argmax: an
//! asymmetric, Normal-biased override minimizes false stress alarms at the
//! cost of some missed detections.

use std::sync::Arc;

use crate::domain::{Prediction, StageError, StressLevel};
use crate::features::FeatureVector;

/// Opaque artifact producing class probabilities from the feature vector.
///
/// Probabilities are ordered `[normal, partial, stress]` and must sum to
/// one; the column order of [`FeatureVector::as_array`] is part of this
/// contract.
pub trait FeatureScorer: Send + Sync {
    /// Class probabilities for one descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error when the artifact cannot score the input.
    fn predict_proba(&self, features: &FeatureVector) -> anyhow::Result<[f32; 3]>;
}

/// Calibration for the Normal-biased override. Empirically tuned; keep
/// tunable, do not re-derive.
#[derive(Debug, Clone)]
pub struct ShallowThresholds {
    /// Any Normal probability above this forces a Normal verdict.
    pub normal_floor: f32,
    /// Partial verdicts require at least this Partial probability.
    pub partial_floor: f32,
    /// Stress probability above this is decisive on its own.
    pub stress_floor: f32,
    /// Medium-high Stress probability still classified as Stress.
    pub stress_fallback: f32,
}

impl Default for ShallowThresholds {
    fn default() -> Self {
        Self {
            normal_floor: 0.20,
            partial_floor: 0.75,
            stress_floor: 0.80,
            stress_fallback: 0.65,
        }
    }
}

/// Feature-vector classification strategy.
pub struct ShallowClassifier {
    scorer: Arc<dyn FeatureScorer>,
    thresholds: ShallowThresholds,
}

impl ShallowClassifier {
    /// Creates a classifier around a scoring artifact.
    #[must_use]
    pub fn new(scorer: Arc<dyn FeatureScorer>) -> Self {
        Self {
            scorer,
            thresholds: ShallowThresholds::default(),
        }
    }

    /// Overrides the calibration thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ShallowThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Scores the descriptor and applies the Normal-biased decision.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Classification`] when the artifact fails or
    /// produces a malformed probability vector.
    pub fn classify(&self, features: &FeatureVector) -> Result<Prediction, StageError> {
        let probs = self
            .scorer
            .predict_proba(features)
            .map_err(|e| StageError::Classification(e.to_string()))?;

        let sum: f32 = probs.iter().sum();
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) || !(0.99..=1.01).contains(&sum) {
            return Err(StageError::Classification(format!(
                "malformed probability vector {probs:?}"
            )));
        }

        let [p_normal, p_partial, p_stress] = probs;
        let t = &self.thresholds;

        // Strong bias toward Normal: a broad Normal floor, and ambiguity
        // defaults to Normal.
        let ring_verdict = if p_normal > t.normal_floor
            || (p_partial < t.partial_floor && p_stress < t.stress_floor)
        {
            0u8
        } else if p_stress > t.stress_fallback {
            2
        } else if p_partial > t.partial_floor {
            1
        } else {
            0
        };

        let confidence = probs.iter().copied().fold(0.0f32, f32::max);
        let (stress_level, reason) = match ring_verdict {
            0 => (StressLevel::Normal, "no_rings_detected".to_string()),
            1 => (StressLevel::Partial, "1_tension_rings".to_string()),
            _ => (StressLevel::Stress, "2_tension_rings".to_string()),
        };

        Ok(Prediction {
            stress_detected: ring_verdict > 0,
            stress_probability: confidence,
            stress_level,
            confidence,
            reason,
            alpha: None,
        })
    }
}
