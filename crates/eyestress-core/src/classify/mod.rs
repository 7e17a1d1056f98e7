//! Stress classification strategies.
//!
//! Three interchangeable strategies share the `Prediction` output: a rule
//! table, a shallow classifier over hand-crafted features, and a learned
//! dual-stream fusion model. The deployment configuration picks one via the
//! strategy enum.

mod fusion;
mod rules;
mod shallow;

pub use fusion::{
    FusionModelClassifier, FusionScore, FusionScorer, FALLBACK_ALPHA, STRESS_CONFIDENCE_GATE,
};
pub use rules::{RuleBasedClassifier, RuleThresholds};
pub use shallow::{FeatureScorer, ShallowClassifier, ShallowThresholds};

/// Classifier strategy chosen by deployment configuration.
pub enum ClassifierStrategy {
    /// Threshold table on ring count and dilation.
    Rule(RuleBasedClassifier),
    /// Shallow classifier over the 11-element feature vector.
    Shallow(ShallowClassifier),
    /// Learned dual-stream fusion model.
    Fusion(FusionModelClassifier),
}

impl ClassifierStrategy {
    /// Strategy name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rule(_) => "rule",
            Self::Shallow(_) => "shallow",
            Self::Fusion(_) => "fusion",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names() {
        let rule = ClassifierStrategy::Rule(RuleBasedClassifier::default());
        assert_eq!(rule.name(), "rule");
    }
}
