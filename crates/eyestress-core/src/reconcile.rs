//! Ring-count reconciliation.
//!
//! Applies only after a fusion-model run: when the geometric detector saw no
//! rings but the model is highly confident of stress, the detector is
//! assumed to have missed a visible ring. The policy only ever adds trust to
//! the model over the detector; a detected nonzero count is never reduced.

use tracing::info;

use crate::domain::{Measurements, Prediction};

/// Calibration for the override gates.
#[derive(Debug, Clone)]
pub struct ReconciliationPolicy {
    /// Minimum model confidence to consider an override.
    pub confidence_floor: f32,
    /// Confidence at which two rings are inferred instead of one.
    pub strong_confidence: f32,
}

impl Default for ReconciliationPolicy {
    fn default() -> Self {
        Self {
            confidence_floor: 0.85,
            strong_confidence: 0.95,
        }
    }
}

impl ReconciliationPolicy {
    /// Adjusts the measurements in place when the override gates pass.
    ///
    /// Pure adjustment; never fails. Records the original count and marks
    /// the result as inferred for transparency.
    pub fn apply(&self, measurements: &mut Measurements, prediction: &Prediction) {
        if measurements.ring_count != 0 {
            return;
        }
        if prediction.confidence < self.confidence_floor || prediction.stress_probability < 0.5 {
            return;
        }

        let inferred = if prediction.confidence >= self.strong_confidence {
            2
        } else {
            1
        };
        info!(
            confidence = prediction.confidence,
            inferred, "ring count override: model sees stress patterns the detector missed"
        );

        measurements.original_ring_count = Some(measurements.ring_count);
        measurements.ring_count = inferred;
        measurements.ring_count_inferred = true;
    }
}
