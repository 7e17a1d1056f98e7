//! Stage identifiers and the fatal-error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage, used to tag where a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Eye structure detection.
    Detection,
    /// Pupil measurement and ring counting.
    Measurement,
    /// Feature / model-input preparation.
    SignalPreparation,
    /// Stress classification.
    Classification,
    /// Ring-count reconciliation.
    Reconciliation,
}

/// Fatal conditions that terminate a pipeline run.
///
/// Failures are deterministic functions of the input image; none is worth
/// retrying. Non-fatal conditions (implausible measurements, missing alpha)
/// travel as flags on the result types instead.
#[derive(Debug, Error)]
pub enum StageError {
    /// The buffer is empty or its chromatic content cannot be determined.
    #[error("unreadable or degenerate image buffer")]
    InvalidImage,

    /// No plausible eye geometry was found.
    #[error("eye detection failed: {0}")]
    Detection(String),

    /// The selected eye region falls outside the image bounds.
    #[error("eye region extraction failed: {0}")]
    RegionExtraction(String),

    /// The scoring artifact threw or produced malformed output.
    #[error("classification failed: {0}")]
    Classification(String),
}

impl StageError {
    /// The stage this error terminates.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::InvalidImage | Self::Detection(_) => Stage::Detection,
            Self::RegionExtraction(_) => Stage::SignalPreparation,
            Self::Classification(_) => Stage::Classification,
        }
    }
}

/// Serializable record of a terminated run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFailure {
    /// Stage at which the pipeline terminated.
    pub stage: Stage,
    /// Human-readable diagnostic.
    pub message: String,
}

impl From<&StageError> for StageFailure {
    fn from(err: &StageError) -> Self {
        Self {
            stage: err.stage(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_stage_mapping() {
        assert_eq!(StageError::InvalidImage.stage(), Stage::Detection);
        assert_eq!(
            StageError::Detection("no circles".into()).stage(),
            Stage::Detection
        );
        assert_eq!(
            StageError::RegionExtraction("out of bounds".into()).stage(),
            Stage::SignalPreparation
        );
        assert_eq!(
            StageError::Classification("bad shape".into()).stage(),
            Stage::Classification
        );
    }

    #[test]
    fn test_failure_record_carries_message() {
        let err = StageError::Detection("pupil not found".into());
        let failure = StageFailure::from(&err);
        assert_eq!(failure.stage, Stage::Detection);
        assert!(failure.message.contains("pupil not found"));
    }
}
