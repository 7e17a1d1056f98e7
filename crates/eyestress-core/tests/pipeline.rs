//! End-to-end pipeline scenarios on synthetic eyes.

use std::sync::Arc;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use eyestress_core::inference::{DualStreamNet, FeatureMlp};
use eyestress_core::{
    ClassifierStrategy, FusionModelClassifier, FusionScore, FusionScorer, ImageKind, ModelInputs,
    RuleBasedClassifier, ShallowClassifier, Stage, StressLevel, StressPipeline,
};
use eyestress_test_support::SyntheticEyeBuilder;

fn rule_pipeline() -> StressPipeline {
    StressPipeline::new(ClassifierStrategy::Rule(RuleBasedClassifier::default()))
}

/// Scripted fusion scorer for override scenarios.
struct ScriptedScorer {
    probability: f32,
    alpha: Option<f32>,
}

impl FusionScorer for ScriptedScorer {
    fn score(&self, _inputs: &ModelInputs) -> anyhow::Result<FusionScore> {
        Ok(FusionScore {
            probability: self.probability,
            alpha: self.alpha,
        })
    }
}

fn fusion_pipeline(probability: f32, alpha: Option<f32>) -> StressPipeline {
    StressPipeline::new(ClassifierStrategy::Fusion(FusionModelClassifier::new(
        Arc::new(ScriptedScorer { probability, alpha }),
    )))
}

#[test]
fn two_circle_pattern_classifies_normal() {
    let result = rule_pipeline().analyze(&SyntheticEyeBuilder::plain_eye(), 30);

    assert!(result.success, "failure: {:?}", result.failure);
    let measurements = result.measurements.expect("measurements");
    let prediction = result.prediction.expect("prediction");

    assert_eq!(measurements.ring_count, 0);
    assert_eq!(prediction.stress_level, StressLevel::Normal);
    assert!(
        (0.20..=0.25).contains(&prediction.stress_probability),
        "probability {} outside the baseline window",
        prediction.stress_probability
    );
}

#[test]
fn single_periodic_band_counts_one_ring() {
    let result = rule_pipeline().analyze(&SyntheticEyeBuilder::single_band_eye(), 30);

    assert!(result.success, "failure: {:?}", result.failure);
    let measurements = result.measurements.expect("measurements");
    let prediction = result.prediction.expect("prediction");

    assert_eq!(measurements.ring_count, 1);
    assert!(prediction.stress_detected);
    assert!((prediction.stress_probability - 0.80).abs() < f32::EPSILON);
}

#[test]
fn alternating_rings_classify_stress() {
    let result = rule_pipeline().analyze(&SyntheticEyeBuilder::ringed_eye(), 30);

    assert!(result.success, "failure: {:?}", result.failure);
    let measurements = result.measurements.expect("measurements");
    let prediction = result.prediction.expect("prediction");

    assert!(
        measurements.ring_count == 2 || measurements.ring_count == 3,
        "ring count {} should be 2 or 3",
        measurements.ring_count
    );
    assert_eq!(prediction.stress_level, StressLevel::Stress);
    assert!(prediction.stress_probability >= 0.85);
}

#[test]
fn pipeline_is_idempotent_on_identical_input() {
    let pipeline = rule_pipeline();
    let image = SyntheticEyeBuilder::ringed_eye();

    let first = pipeline.analyze(&image, 42);
    let second = pipeline.analyze(&image, 42);

    let a = serde_json::to_string(&first).expect("serialize");
    let b = serde_json::to_string(&second).expect("serialize");
    assert_eq!(a, b, "byte-identical input must give byte-identical output");
}

#[test]
fn age_sixty_uses_senior_dilation_threshold() {
    // The standard fixture measures ~3.5 mm: dilated at the 3.0 mm senior
    // threshold, normal at the 4.0 mm junior threshold.
    let image = SyntheticEyeBuilder::plain_eye();
    let pipeline = rule_pipeline();

    let senior = pipeline.analyze(&image, 60);
    let junior = pipeline.analyze(&image, 59);

    let senior_pred = senior.prediction.expect("prediction");
    let junior_pred = junior.prediction.expect("prediction");

    assert!(senior_pred.stress_detected, "60 must take the 3.0 mm branch");
    assert!((senior_pred.stress_probability - 0.65).abs() < f32::EPSILON);
    assert!(!junior_pred.stress_detected, "59 keeps the 4.0 mm branch");
}

#[test]
fn confident_fusion_verdict_overrides_zero_ring_count() {
    let result = fusion_pipeline(0.97, Some(0.9)).analyze(&SyntheticEyeBuilder::plain_eye(), 30);

    assert!(result.success, "failure: {:?}", result.failure);
    let measurements = result.measurements.expect("measurements");

    assert!(measurements.ring_count_inferred);
    assert_eq!(measurements.original_ring_count, Some(0));
    assert_eq!(measurements.ring_count, 2, "confidence 0.97 infers two rings");
}

#[test]
fn reconciliation_never_reduces_ring_count() {
    // A stressed eye with detected rings keeps its geometric count even
    // under a maximally confident model.
    let result = fusion_pipeline(0.99, Some(0.9)).analyze(&SyntheticEyeBuilder::ringed_eye(), 30);

    assert!(result.success, "failure: {:?}", result.failure);
    let measurements = result.measurements.expect("measurements");

    assert!(!measurements.ring_count_inferred);
    assert!(measurements.original_ring_count.is_none());
    assert!(measurements.ring_count >= 2);
}

#[test]
fn fusion_alpha_falls_back_to_training_average() {
    let result = fusion_pipeline(0.9, None).analyze(&SyntheticEyeBuilder::plain_eye(), 30);

    let prediction = result.prediction.expect("prediction");
    assert_eq!(prediction.alpha, Some(0.84));
}

#[test]
fn color_image_takes_the_color_strategy() {
    let result = rule_pipeline().analyze(&SyntheticEyeBuilder::plain_color_eye(), 30);

    assert!(result.success, "failure: {:?}", result.failure);
    assert_eq!(result.detection.image_kind, ImageKind::Color);
    assert_eq!(result.measurements.expect("measurements").ring_count, 0);
}

#[test]
fn degenerate_buffer_terminates_at_detection() {
    let result = rule_pipeline().analyze(&SyntheticEyeBuilder::empty(), 30);

    assert!(!result.success);
    assert_eq!(result.detection.image_kind, ImageKind::Unknown);
    assert_eq!(result.failure.expect("failure").stage, Stage::Detection);
}

#[test]
fn featureless_image_fails_without_retry() {
    let result = rule_pipeline().analyze(&SyntheticEyeBuilder::flat_gray(120, 120, 128), 30);

    assert!(!result.success);
    assert_eq!(result.failure.expect("failure").stage, Stage::Detection);
    assert!(result.detection.error.is_some());
}

#[test]
fn shallow_path_with_untrained_scorer_stays_normal() {
    // Zero weights give a uniform class distribution; the Normal floor
    // (P(Normal) > 0.20) forces a Normal verdict.
    let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
    let scorer = Arc::new(FeatureMlp::new(vb).expect("architecture"));
    let pipeline = StressPipeline::new(ClassifierStrategy::Shallow(ShallowClassifier::new(scorer)));

    let result = pipeline.analyze(&SyntheticEyeBuilder::ringed_eye(), 30);

    assert!(result.success, "failure: {:?}", result.failure);
    let prediction = result.prediction.expect("prediction");
    assert_eq!(prediction.stress_level, StressLevel::Normal);
    assert!(!prediction.stress_detected);
}

#[test]
fn fusion_path_runs_the_dual_stream_network_end_to_end() {
    let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
    let net = Arc::new(DualStreamNet::new(vb).expect("architecture"));
    let pipeline = StressPipeline::new(ClassifierStrategy::Fusion(FusionModelClassifier::new(net)));

    let result = pipeline.analyze(&SyntheticEyeBuilder::plain_eye(), 30);

    assert!(result.success, "failure: {:?}", result.failure);
    let prediction = result.prediction.expect("prediction");
    // Zero weights score at chance: confidence 0.5 is below the stress
    // gate and below every override floor.
    assert_eq!(prediction.stress_level, StressLevel::Normal);
    assert_eq!(prediction.alpha, Some(0.5));

    let measurements = result.measurements.expect("measurements");
    assert!(!measurements.ring_count_inferred);
}
