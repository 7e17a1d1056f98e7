//! eyestress-core: stress estimation from a single eye photograph.
//!
//! The pipeline turns raw pixels into a calibrated stress verdict:
//!
//! 1. **Detect** – locate the pupil and iris as (center, radius) pairs,
//!    with separate strategies for color and grayscale imagery.
//! 2. **Measure** – convert pixel radii into a millimetre pupil diameter
//!    against the fixed physical iris reference.
//! 3. **Extract signals** – count tension rings from the polar-unwrapped
//!    iris annulus; compute the 11-column feature descriptor.
//! 4. **Classify** – one of three interchangeable strategies: rule table,
//!    shallow feature classifier, or learned dual-stream fusion model.
//! 5. **Reconcile** – let a highly confident fusion verdict override a zero
//!    geometric ring count, never the reverse.
//!
//! The transport layer hands in a decoded [`ImageInfo`] plus a subject age
//! and serializes the returned [`PipelineResult`]; everything else
//! (request handling, artifact file management, training) lives outside
//! this crate.

pub mod classify;
pub mod detect;
pub mod domain;
pub mod features;
pub mod inference;
pub mod measure;
pub mod pipeline;
pub mod polar;
pub mod prepare;
pub mod reconcile;
pub mod rings;

pub use classify::{
    ClassifierStrategy, FeatureScorer, FusionModelClassifier, FusionScore, FusionScorer,
    RuleBasedClassifier, RuleThresholds, ShallowClassifier, ShallowThresholds,
};
pub use domain::{
    classify_image_kind, AgeGroup, ConfidenceBand, DetectionResult, EyeStructure, ImageInfo,
    ImageKind, Measurements, PipelineResult, Prediction, Stage, StageError, StageFailure,
    StressLevel,
};
pub use features::{FeatureExtractor, FeatureVector, FEATURE_COUNT};
pub use pipeline::StressPipeline;
pub use prepare::ModelInputs;
pub use reconcile::ReconciliationPolicy;
pub use rings::{RingAnalysis, RingConfig, RingCounter};
