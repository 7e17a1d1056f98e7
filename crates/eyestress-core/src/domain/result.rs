//! Result types produced by the pipeline stages.
//!
//! Field names and nesting (`detection`, `measurements`, `prediction`) are the
//! stable contract the transport layer keys off; renaming them is a breaking
//! change.

use serde::{Deserialize, Serialize};

use super::error::StageFailure;
use super::eye::{EyeStructure, ImageKind};

/// Outcome of the eye-structure detection stage.
///
/// Invariant: when `success` is true, both structures are present and
/// `iris.radius > pupil.radius > 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether plausible eye geometry was found.
    pub success: bool,
    /// Chromatic content of the input, deciding the detector strategy.
    pub image_kind: ImageKind,
    /// Detected pupil, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pupil: Option<EyeStructure>,
    /// Detected iris boundary, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iris: Option<EyeStructure>,
    /// Non-fatal note, e.g. an iris radius outside the sanity window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Diagnostic reason, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResult {
    /// Successful detection of a pupil/iris pair.
    #[must_use]
    pub const fn found(image_kind: ImageKind, pupil: EyeStructure, iris: EyeStructure) -> Self {
        Self {
            success: true,
            image_kind,
            pupil: Some(pupil),
            iris: Some(iris),
            warning: None,
            error: None,
        }
    }

    /// Failed detection with a diagnostic reason.
    #[must_use]
    pub fn failed(image_kind: ImageKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            image_kind,
            pupil: None,
            iris: None,
            warning: None,
            error: Some(error.into()),
        }
    }

    /// Attaches a non-fatal warning note.
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// Calibrated pupil measurement plus the geometric ring count.
///
/// Recomputed for every invocation; never cached across images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurements {
    /// Pupil diameter in millimetres (iris-referenced calibration).
    pub pupil_diameter_mm: f32,
    /// Pupil diameter in pixels.
    pub pupil_diameter_px: f32,
    /// Tension ring count, capped at 3.
    pub ring_count: u8,
    /// Pixel-to-millimetre conversion factor.
    pub pixels_per_mm: f32,
    /// Whether the diameter falls in the physiologically plausible range.
    /// Advisory only; an invalid measurement never aborts the pipeline.
    pub valid: bool,
    /// Explanation of the validity verdict.
    pub validation_message: String,
    /// Geometric ring count before reconciliation, set when overridden.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_ring_count: Option<u8>,
    /// True when the ring count was inferred from model confidence.
    pub ring_count_inferred: bool,
}

/// Final stress level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    /// No stress indicators.
    Normal,
    /// Partial stress indicators (single tension ring).
    Partial,
    /// Stress detected.
    Stress,
}

/// Qualitative confidence band for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    /// Confidence above 0.7.
    High,
    /// Confidence above 0.5.
    Medium,
    /// Everything below.
    Low,
}

/// Classifier verdict with its confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Whether stress was detected.
    pub stress_detected: bool,
    /// Stress probability in [0, 1]. For the fusion path this is the raw
    /// model score; for the rule and shallow paths it is the calibrated
    /// table/class probability.
    pub stress_probability: f32,
    /// Final stress level.
    pub stress_level: StressLevel,
    /// Prediction confidence in [0, 1].
    pub confidence: f32,
    /// Human-readable basis for the verdict.
    pub reason: String,
    /// Iris-stream share of a fused decision (pupil+age stream = 1 - alpha).
    /// Diagnostic only; present on the fusion path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
}

impl Prediction {
    /// Maps the numeric confidence to a display band.
    #[must_use]
    pub fn confidence_band(&self) -> ConfidenceBand {
        if self.confidence > 0.7 {
            ConfidenceBand::High
        } else if self.confidence > 0.5 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

/// Subject age group used by the dilation threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    /// Below 60 years.
    Below60,
    /// 60 years and above.
    SixtyPlus,
}

impl AgeGroup {
    /// Classifies an age in years.
    #[must_use]
    pub const fn from_age(age: u32) -> Self {
        if age < 60 {
            Self::Below60
        } else {
            Self::SixtyPlus
        }
    }
}

/// Complete pipeline result for one image; the sole artifact returned to
/// callers. Created fresh per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Whether the pipeline ran to completion.
    pub success: bool,
    /// Subject age in years.
    pub age: u32,
    /// Age group derived from the subject age.
    pub age_group: AgeGroup,
    /// Detection stage output.
    pub detection: DetectionResult,
    /// Measurement stage output, absent when detection failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<Measurements>,
    /// Classification output, absent when an earlier stage failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
    /// Terminal failure record, present iff `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}
