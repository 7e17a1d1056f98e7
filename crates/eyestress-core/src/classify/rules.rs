//! Rule-based stress classification.
//!
//! The reference/fallback policy when no learned artifact is available: a
//! deterministic threshold table keyed on the tension ring count and
//! age-dependent pupil dilation.

use crate::domain::{Prediction, StressLevel};

/// Calibration constants for the rule table. Empirically tuned; keep
/// tunable, do not re-derive.
#[derive(Debug, Clone)]
pub struct RuleThresholds {
    /// Dilation threshold for subjects under 60 years, in millimetres.
    pub dilation_mm_below_60: f32,
    /// Dilation threshold for subjects 60 and above, in millimetres.
    pub dilation_mm_60_plus: f32,
    /// Stress probability for two or more rings.
    pub multi_ring_probability: f32,
    /// Stress probability for a single ring.
    pub single_ring_probability: f32,
    /// Stress probability for dilation without rings.
    pub dilation_probability: f32,
    /// Baseline probability with no indicators.
    pub baseline_probability: f32,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            dilation_mm_below_60: 4.0,
            dilation_mm_60_plus: 3.0,
            multi_ring_probability: 0.90,
            single_ring_probability: 0.80,
            dilation_probability: 0.65,
            baseline_probability: 0.20,
        }
    }
}

/// Deterministic threshold-table classifier.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedClassifier {
    thresholds: RuleThresholds,
}

impl RuleBasedClassifier {
    /// Creates a classifier with the given calibration.
    #[must_use]
    pub const fn new(thresholds: RuleThresholds) -> Self {
        Self { thresholds }
    }

    /// Age-dependent dilation threshold in millimetres.
    #[must_use]
    pub fn dilation_threshold_mm(&self, age: u32) -> f32 {
        if age < 60 {
            self.thresholds.dilation_mm_below_60
        } else {
            self.thresholds.dilation_mm_60_plus
        }
    }

    /// Whether the pupil counts as dilated for this subject.
    #[must_use]
    pub fn is_dilated(&self, pupil_diameter_mm: f32, age: u32) -> bool {
        pupil_diameter_mm > self.dilation_threshold_mm(age)
    }

    /// Applies the threshold table.
    ///
    /// Tension rings are the primary indicator; dilation only matters when
    /// no ring was found.
    #[must_use]
    pub fn classify(&self, ring_count: u8, pupil_diameter_mm: f32, age: u32) -> Prediction {
        let t = &self.thresholds;
        let dilated = self.is_dilated(pupil_diameter_mm, age);

        let (stress_detected, probability, reason) = if ring_count >= 2 {
            (true, t.multi_ring_probability, "Multiple tension rings detected")
        } else if ring_count == 1 {
            (true, t.single_ring_probability, "Tension ring detected")
        } else if dilated {
            (true, t.dilation_probability, "Pupil dilation without tension rings")
        } else {
            (false, t.baseline_probability, "No stress indicators detected")
        };

        Prediction {
            stress_detected,
            stress_probability: probability,
            stress_level: if stress_detected {
                StressLevel::Stress
            } else {
                StressLevel::Normal
            },
            confidence: probability.max(1.0 - probability),
            reason: reason.into(),
            alpha: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_table_values() {
        let c = RuleBasedClassifier::default();

        let p = c.classify(3, 3.0, 30);
        assert!(p.stress_detected);
        assert!((p.stress_probability - 0.90).abs() < f32::EPSILON);

        let p = c.classify(2, 3.0, 30);
        assert!((p.stress_probability - 0.90).abs() < f32::EPSILON);

        let p = c.classify(1, 3.0, 30);
        assert!(p.stress_detected);
        assert!((p.stress_probability - 0.80).abs() < f32::EPSILON);
        assert_eq!(p.reason, "Tension ring detected");

        let p = c.classify(0, 5.0, 30);
        assert!(p.stress_detected);
        assert!((p.stress_probability - 0.65).abs() < f32::EPSILON);

        let p = c.classify(0, 3.0, 30);
        assert!(!p.stress_detected);
        assert_eq!(p.stress_level, StressLevel::Normal);
        assert!((p.stress_probability - 0.20).abs() < f32::EPSILON);
        assert_eq!(p.reason, "No stress indicators detected");
    }

    #[test]
    fn test_probability_monotone_in_ring_count() {
        let c = RuleBasedClassifier::default();
        for &diameter in &[3.0f32, 5.0] {
            let mut last = 0.0f32;
            for rings in 0u8..=3 {
                let p = c.classify(rings, diameter, 40).stress_probability;
                assert!(
                    p >= last,
                    "probability decreased at rings={rings}, diameter={diameter}"
                );
                last = p;
            }
        }
    }

    #[test]
    fn test_age_sixty_selects_senior_threshold() {
        let c = RuleBasedClassifier::default();
        // 3.5 mm: dilated for a 60-year-old (3.0 mm threshold), normal for
        // a 59-year-old (4.0 mm threshold).
        assert!((c.dilation_threshold_mm(60) - 3.0).abs() < f32::EPSILON);
        assert!((c.dilation_threshold_mm(59) - 4.0).abs() < f32::EPSILON);

        assert!(c.classify(0, 3.5, 60).stress_detected);
        assert!(!c.classify(0, 3.5, 59).stress_detected);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let c = RuleBasedClassifier::default();
        // Exactly at the threshold is not dilated.
        assert!(!c.is_dilated(4.0, 30));
        assert!(c.is_dilated(4.01, 30));
    }

    #[test]
    fn test_confidence_reflects_distance_from_chance() {
        let c = RuleBasedClassifier::default();
        let normal = c.classify(0, 3.0, 30);
        assert!((normal.confidence - 0.80).abs() < f32::EPSILON);

        let stressed = c.classify(2, 3.0, 30);
        assert!((stressed.confidence - 0.90).abs() < f32::EPSILON);
    }
}
