//! Core domain types for stress estimation.

mod error;
mod eye;
mod result;

pub use error::{Stage, StageError, StageFailure};
pub use eye::{classify_image_kind, EyeStructure, ImageInfo, ImageKind};
pub use result::{
    AgeGroup, ConfidenceBand, DetectionResult, Measurements, PipelineResult, Prediction,
    StressLevel,
};
