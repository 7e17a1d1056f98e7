//! Tension ring counting.
//!
//! The iris annulus is unwrapped into a polar representation with the pupil
//! center as origin, reduced to a 1-D radial intensity profile, and scanned
//! for alternating light/dark bands. Band count and profile variance feed a
//! fixed decision table whose bias runs toward undercounting: ring count
//! gates a "stressed" verdict, so a false negative is cheaper than a false
//! positive.

#![allow(clippy::cast_precision_loss)]

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::EyeStructure;
use crate::polar::unwrap_annulus;

/// Tuning for ring counting.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Radial step between sampled circles, in pixels.
    pub radial_step: f32,
    /// Angular samples per circle.
    pub angular_samples: usize,
    /// Sampling starts this many pixels outside the pupil boundary.
    pub inner_margin: f32,
    /// Sampling stops this many pixels inside the iris boundary.
    pub outer_margin: f32,
    /// Minimum band excursion from the profile mean, in intensity units.
    pub band_delta_floor: f32,
    /// Variance threshold for a partial ring at three circular features.
    pub variance_partial: f32,
    /// Variance threshold for full rings at three circular features.
    pub variance_stress: f32,
    /// Variance threshold for a ring at two circular features.
    pub variance_single: f32,
    /// Variance threshold for a ring with no supporting features.
    pub variance_lone: f32,
    /// Hard cap on the reported ring count.
    pub max_rings: u8,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            radial_step: 2.0,
            angular_samples: 360,
            inner_margin: 2.0,
            outer_margin: 1.0,
            band_delta_floor: 2.0,
            variance_partial: 25.0,
            variance_stress: 40.0,
            variance_single: 50.0,
            variance_lone: 60.0,
            max_rings: 3,
        }
    }
}

/// Ring analysis for one iris annulus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingAnalysis {
    /// Final tension ring count, capped at `max_rings`.
    pub ring_count: u8,
    /// Circular features seen: detected bands plus the pupil and iris
    /// boundary circles themselves.
    pub circle_count: usize,
    /// Variance of the radial intensity profile.
    pub radial_variance: f32,
    /// Alternating band count extracted from the profile.
    pub band_count: usize,
    /// The radial intensity profile itself.
    pub profile: Vec<f32>,
}

/// Counts tension rings in the iris annulus.
#[derive(Debug, Clone, Default)]
pub struct RingCounter {
    config: RingConfig,
}

impl RingCounter {
    /// Creates a counter with the given tuning.
    #[must_use]
    pub const fn new(config: RingConfig) -> Self {
        Self { config }
    }

    /// Analyzes the annulus between the pupil and iris boundaries.
    ///
    /// Sampling runs on the unsmoothed image; the angular mean over each
    /// circle is the noise control, and smoothing would shift the profile
    /// variance the calibration table is keyed to.
    #[must_use]
    pub fn count(&self, gray: &GrayImage, pupil: &EyeStructure, iris: &EyeStructure) -> RingAnalysis {
        let cfg = &self.config;
        let r_start = pupil.radius + cfg.inner_margin;
        let r_end = iris.radius - cfg.outer_margin;

        let profile: Vec<f32> = if r_end > r_start {
            unwrap_annulus(
                gray,
                pupil.center.0,
                pupil.center.1,
                r_start,
                r_end,
                cfg.radial_step,
                cfg.angular_samples,
            )
            .iter()
            .map(|row| row.iter().sum::<f32>() / row.len() as f32)
            .collect()
        } else {
            Vec::new()
        };

        let radial_variance = variance(&profile);
        let band_count = count_bands(&profile, cfg.band_delta_floor);
        // The pupil and iris boundaries are circular features in their own
        // right; the table baseline of two circles means "no extra rings".
        let circle_count = band_count + 2;

        let ring_count = score_rings(circle_count, radial_variance, cfg).min(cfg.max_rings);
        debug!(
            circle_count,
            radial_variance, band_count, ring_count, "ring analysis"
        );

        RingAnalysis {
            ring_count,
            circle_count,
            radial_variance,
            band_count,
            profile,
        }
    }
}

/// Variance of a profile; zero for fewer than four samples, matching the
/// sparse-profile fallback of the feature extractor.
pub(crate) fn variance(values: &[f32]) -> f32 {
    if values.len() < 4 {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n
}

/// Counts alternating light/dark bands in a radial profile.
///
/// A band is an excursion beyond the profile mean by a hysteresis margin;
/// the margin floor keeps flat profiles at zero, and the margin must stay
/// wide enough that the baseline shift induced by a band's own mass does
/// not register as an opposite-polarity band. Light and dark bands are
/// tallied separately and the larger tally wins, so a single polarity of
/// ring texture is not double counted.
pub(crate) fn count_bands(profile: &[f32], delta_floor: f32) -> usize {
    if profile.len() < 4 {
        return 0;
    }
    let n = profile.len() as f32;
    let mean = profile.iter().sum::<f32>() / n;
    let std = variance(profile).sqrt();
    let delta = delta_floor.max(0.75 * std);

    #[derive(PartialEq, Clone, Copy)]
    enum Side {
        Neutral,
        Above,
        Below,
    }

    let mut side = Side::Neutral;
    let mut light = 0usize;
    let mut dark = 0usize;
    for &v in profile {
        if v > mean + delta {
            if side != Side::Above {
                light += 1;
            }
            side = Side::Above;
        } else if v < mean - delta {
            if side != Side::Below {
                dark += 1;
            }
            side = Side::Below;
        } else {
            side = Side::Neutral;
        }
    }
    light.max(dark)
}

/// Fixed decision table mapping circular-feature count and radial variance
/// to a ring count. Calibrated; do not re-derive.
fn score_rings(circle_count: usize, radial_variance: f32, cfg: &RingConfig) -> u8 {
    match circle_count {
        n if n >= 6 => 3,
        5 => {
            if radial_variance > cfg.variance_partial {
                2
            } else {
                3
            }
        }
        4 => 2,
        3 => {
            if radial_variance > cfg.variance_stress {
                2
            } else if radial_variance > cfg.variance_partial {
                1
            } else {
                0
            }
        }
        2 => {
            if radial_variance > cfg.variance_single {
                1
            } else {
                0
            }
        }
        _ => {
            if radial_variance > cfg.variance_lone {
                1
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    const CX: f32 = 80.0;
    const CY: f32 = 80.0;
    const PUPIL_R: f32 = 16.0;
    const IRIS_R: f32 = 56.0;

    /// Plain eye: dark pupil disk, flat iris annulus, bright sclera, plus
    /// optional (radius, amplitude) bands added to the iris base level.
    fn eye_with_bands(bands: &[(f32, f32)]) -> GrayImage {
        GrayImage::from_fn(160, 160, |x, y| {
            let dx = x as f32 - CX;
            let dy = y as f32 - CY;
            let d = (dx * dx + dy * dy).sqrt();
            if d < PUPIL_R {
                Luma([30u8])
            } else if d < IRIS_R {
                let mut level = 120.0f32;
                for &(radius, amplitude) in bands {
                    if (d - radius).abs() < 3.0 {
                        level += amplitude;
                    }
                }
                Luma([level.clamp(0.0, 255.0) as u8])
            } else {
                Luma([220u8])
            }
        })
    }

    fn structures() -> (EyeStructure, EyeStructure) {
        (
            EyeStructure::new((CX, CY), PUPIL_R),
            EyeStructure::new((CX, CY), IRIS_R),
        )
    }

    #[test]
    fn test_plain_annulus_counts_zero() {
        let img = eye_with_bands(&[]);
        let (pupil, iris) = structures();
        let analysis = RingCounter::default().count(&img, &pupil, &iris);

        assert_eq!(analysis.ring_count, 0);
        assert_eq!(analysis.circle_count, 2);
        assert!(
            analysis.radial_variance < 25.0,
            "variance {} should be low",
            analysis.radial_variance
        );
    }

    #[test]
    fn test_single_moderate_band_counts_one() {
        // One band sized so the profile variance lands between the partial
        // (25) and stress (40) thresholds.
        let img = eye_with_bands(&[(36.0, 16.0)]);
        let (pupil, iris) = structures();
        let analysis = RingCounter::default().count(&img, &pupil, &iris);

        assert_eq!(analysis.band_count, 1, "profile: {:?}", analysis.profile);
        assert_eq!(analysis.circle_count, 3);
        assert!(
            analysis.radial_variance > 25.0 && analysis.radial_variance <= 40.0,
            "variance {} outside the partial window",
            analysis.radial_variance
        );
        assert_eq!(analysis.ring_count, 1);
    }

    #[test]
    fn test_three_alternating_bands_count_full_stress() {
        let img = eye_with_bands(&[(28.0, 50.0), (38.0, -50.0), (48.0, 50.0)]);
        let (pupil, iris) = structures();
        let analysis = RingCounter::default().count(&img, &pupil, &iris);

        assert!(
            analysis.radial_variance > 40.0,
            "variance {} should exceed the stress threshold",
            analysis.radial_variance
        );
        assert!(
            analysis.ring_count == 2 || analysis.ring_count == 3,
            "ring count {} should be 2 or 3",
            analysis.ring_count
        );
    }

    #[test]
    fn test_degenerate_annulus_counts_zero() {
        let img = eye_with_bands(&[]);
        let pupil = EyeStructure::new((CX, CY), 20.0);
        let iris = EyeStructure::new((CX, CY), 21.0);
        let analysis = RingCounter::default().count(&img, &pupil, &iris);

        assert_eq!(analysis.ring_count, 0);
        assert!(analysis.profile.len() < 4);
    }

    #[test]
    fn test_count_never_exceeds_cap() {
        let img = eye_with_bands(&[
            (24.0, 60.0),
            (30.0, -60.0),
            (36.0, 60.0),
            (42.0, -60.0),
            (48.0, 60.0),
        ]);
        let (pupil, iris) = structures();
        let analysis = RingCounter::default().count(&img, &pupil, &iris);
        assert!(analysis.ring_count <= 3);
    }

    #[test]
    fn test_decision_table_bias_toward_undercounting() {
        let cfg = RingConfig::default();
        // Sparse features with low variance always resolve to zero.
        assert_eq!(score_rings(0, 10.0, &cfg), 0);
        assert_eq!(score_rings(1, 59.0, &cfg), 0);
        assert_eq!(score_rings(2, 50.0, &cfg), 0);
        assert_eq!(score_rings(3, 25.0, &cfg), 0);
        // The same feature counts with high variance step upward.
        assert_eq!(score_rings(2, 51.0, &cfg), 1);
        assert_eq!(score_rings(3, 30.0, &cfg), 1);
        assert_eq!(score_rings(3, 41.0, &cfg), 2);
        assert_eq!(score_rings(4, 0.0, &cfg), 2);
        assert_eq!(score_rings(5, 26.0, &cfg), 2);
        assert_eq!(score_rings(5, 10.0, &cfg), 3);
        assert_eq!(score_rings(6, 0.0, &cfg), 3);
        assert_eq!(score_rings(9, 0.0, &cfg), 3);
    }

    #[test]
    fn test_band_counting_polarity() {
        // Three light bands over a flat baseline.
        let mut profile = vec![100.0f32; 30];
        for idx in [5usize, 14, 23] {
            profile[idx] = 140.0;
            profile[idx + 1] = 140.0;
        }
        assert_eq!(count_bands(&profile, 2.0), 3);

        // Flat profile has no bands.
        let flat = vec![100.0f32; 30];
        assert_eq!(count_bands(&flat, 2.0), 0);
    }
}
