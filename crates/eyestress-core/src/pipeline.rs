//! Pipeline orchestration.
//!
//! Sequences Detect -> Measure -> PrepareSignals -> Classify -> Reconcile
//! and short-circuits into a terminal failure record when a stage cannot
//! proceed. Detection failure aborts without retry, since the image itself
//! is the cause. Measurement never hard-fails; an implausible diameter only
//! clears the validity flag.

use tracing::{debug, info, warn};

use crate::classify::ClassifierStrategy;
use crate::detect::{DetectorConfig, EyeDetector};
use crate::domain::{
    classify_image_kind, AgeGroup, DetectionResult, ImageInfo, Measurements, PipelineResult,
    StageError,
};
use crate::features::FeatureExtractor;
use crate::measure::{measure_pupil, validate_diameter};
use crate::prepare::ModelInputs;
use crate::reconcile::ReconciliationPolicy;
use crate::rings::RingCounter;

/// End-to-end stress estimation pipeline.
///
/// Holds only configuration and the injected classifier strategy; every
/// `analyze` call is independent, so one pipeline instance is safe to share
/// across concurrent callers.
pub struct StressPipeline {
    detector_config: DetectorConfig,
    ring_counter: RingCounter,
    feature_extractor: FeatureExtractor,
    reconciliation: ReconciliationPolicy,
    classifier: ClassifierStrategy,
}

impl StressPipeline {
    /// Creates a pipeline with default tuning around a classifier strategy.
    #[must_use]
    pub fn new(classifier: ClassifierStrategy) -> Self {
        Self {
            detector_config: DetectorConfig::default(),
            ring_counter: RingCounter::default(),
            feature_extractor: FeatureExtractor::default(),
            reconciliation: ReconciliationPolicy::default(),
            classifier,
        }
    }

    /// Overrides the detector configuration.
    #[must_use]
    pub fn with_detector_config(mut self, config: DetectorConfig) -> Self {
        self.detector_config = config;
        self
    }

    /// Overrides the ring counter.
    #[must_use]
    pub fn with_ring_counter(mut self, counter: RingCounter) -> Self {
        self.ring_counter = counter;
        self
    }

    /// Overrides the reconciliation policy.
    #[must_use]
    pub fn with_reconciliation(mut self, policy: ReconciliationPolicy) -> Self {
        self.reconciliation = policy;
        self
    }

    /// Runs the full pipeline on one decoded image.
    ///
    /// Always returns a well-formed result; fatal conditions surface as
    /// `success = false` with a stage-tagged failure record, never as a
    /// panic.
    #[must_use]
    pub fn analyze(&self, info: &ImageInfo, age: u32) -> PipelineResult {
        let age_group = AgeGroup::from_age(age);

        // Detect.
        let kind = classify_image_kind(info);
        let Some(detector) = EyeDetector::for_kind(kind, &self.detector_config) else {
            let err = StageError::InvalidImage;
            warn!(path = %info.path, "pipeline terminated: {err}");
            return Self::terminated(
                age,
                age_group,
                DetectionResult::failed(kind, err.to_string()),
                None,
                &err,
            );
        };

        debug!(strategy = detector.name(), path = %info.path, "detecting eye structures");
        let detection = detector.detect(info);
        if !detection.success {
            let reason = detection
                .error
                .clone()
                .unwrap_or_else(|| "unknown detection error".into());
            let err = StageError::Detection(reason);
            warn!(path = %info.path, "pipeline terminated: {err}");
            return Self::terminated(age, age_group, detection, None, &err);
        }
        if let Some(warning) = &detection.warning {
            warn!(path = %info.path, %warning, "detection sanity warning");
        }
        let (Some(pupil), Some(iris)) = (detection.pupil, detection.iris) else {
            let err = StageError::Detection("detector reported success without structures".into());
            return Self::terminated(age, age_group, detection, None, &err);
        };

        // Measure. Invalid measurements are advisory, never fatal.
        let gray = info.to_luma8();
        let measured = measure_pupil(pupil.radius, iris.radius);
        let (valid, validation_message) = validate_diameter(measured.diameter_mm);
        if !valid {
            warn!(path = %info.path, %validation_message, "measurements may be unreliable");
        }
        let analysis = self.ring_counter.count(&gray, &pupil, &iris);
        debug!(
            diameter_mm = measured.diameter_mm,
            ring_count = analysis.ring_count,
            "measurements complete"
        );

        let mut measurements = Measurements {
            pupil_diameter_mm: measured.diameter_mm,
            pupil_diameter_px: measured.diameter_px,
            ring_count: analysis.ring_count,
            pixels_per_mm: measured.pixels_per_mm,
            valid,
            validation_message,
            original_ring_count: None,
            ring_count_inferred: false,
        };

        // Prepare signals and classify.
        let prediction = match &self.classifier {
            ClassifierStrategy::Rule(classifier) => classifier.classify(
                measurements.ring_count,
                measurements.pupil_diameter_mm,
                age,
            ),
            ClassifierStrategy::Shallow(classifier) => {
                let features = self.feature_extractor.extract(&gray);
                match classifier.classify(&features) {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(path = %info.path, "pipeline terminated: {err}");
                        return Self::terminated(
                            age,
                            age_group,
                            detection,
                            Some(measurements),
                            &err,
                        );
                    }
                }
            }
            ClassifierStrategy::Fusion(classifier) => {
                let inputs =
                    match ModelInputs::prepare(info, &detection, measurements.ring_count, age) {
                        Ok(i) => i,
                        Err(err) => {
                            warn!(path = %info.path, "pipeline terminated: {err}");
                            return Self::terminated(
                                age,
                                age_group,
                                detection,
                                Some(measurements),
                                &err,
                            );
                        }
                    };
                match classifier.classify(&inputs) {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(path = %info.path, "pipeline terminated: {err}");
                        return Self::terminated(
                            age,
                            age_group,
                            detection,
                            Some(measurements),
                            &err,
                        );
                    }
                }
            }
        };

        // Reconcile: the override only applies to a learned fusion verdict.
        if matches!(self.classifier, ClassifierStrategy::Fusion(_)) {
            self.reconciliation.apply(&mut measurements, &prediction);
        }

        info!(
            path = %info.path,
            level = ?prediction.stress_level,
            confidence = prediction.confidence,
            "pipeline completed"
        );
        PipelineResult {
            success: true,
            age,
            age_group,
            detection,
            measurements: Some(measurements),
            prediction: Some(prediction),
            failure: None,
        }
    }

    fn terminated(
        age: u32,
        age_group: AgeGroup,
        detection: DetectionResult,
        measurements: Option<Measurements>,
        err: &StageError,
    ) -> PipelineResult {
        PipelineResult {
            success: false,
            age,
            age_group,
            detection,
            measurements,
            prediction: None,
            failure: Some(err.into()),
        }
    }
}
