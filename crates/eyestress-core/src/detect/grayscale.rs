//! Grayscale eye detection via circle voting.
//!
//! Grayscale captures (IR pupilometry datasets) have strong circular edges
//! but no chromatic cues, so both boundaries come from the voting detector:
//! the accumulator locates the shared center, and the radial derivative
//! profile yields the pupil and iris radii.

use image::GrayImage;
use tracing::debug;

use crate::detect::voting::{concentric_family, radius_edge_peaks, vote_centers, VoteConfig};
use crate::detect::{sanity_warning, DETECTION_BLUR_SIGMA};
use crate::domain::{DetectionResult, EyeStructure, ImageInfo, ImageKind};

/// Strict parameter set for grayscale detection.
#[derive(Debug, Clone)]
pub struct GrayscaleDetectorConfig {
    /// Gaussian sigma applied before gradient voting.
    pub blur_sigma: f32,
    /// Maximum spread of a concentric candidate family, in pixels.
    pub concentric_spread: f32,
    /// Minimum radial separation between distinct circle edges, in pixels.
    pub min_radius_separation: f32,
    /// Pupil radius upper bound as a fraction of the shorter image side.
    pub max_pupil_fraction: f32,
    /// Iris radius must exceed the pupil radius by this factor.
    pub min_iris_ratio: f32,
}

impl Default for GrayscaleDetectorConfig {
    fn default() -> Self {
        Self {
            blur_sigma: DETECTION_BLUR_SIGMA,
            concentric_spread: 35.0,
            min_radius_separation: 6.0,
            max_pupil_fraction: 1.0 / 6.0,
            min_iris_ratio: 1.5,
        }
    }
}

/// Circle-voting detector for grayscale imagery.
#[derive(Debug, Clone, Default)]
pub struct GrayscaleDetector {
    config: GrayscaleDetectorConfig,
}

impl GrayscaleDetector {
    /// Creates a detector with the given parameter set.
    #[must_use]
    pub const fn new(config: GrayscaleDetectorConfig) -> Self {
        Self { config }
    }

    /// Locates the pupil and the concentric iris boundary.
    #[must_use]
    pub fn detect(&self, info: &ImageInfo) -> DetectionResult {
        let gray = info.to_luma8();
        let blurred = imageproc::filter::gaussian_blur_f32(&gray, self.config.blur_sigma);

        match self.locate(&blurred, info.width, info.height) {
            Ok((pupil, iris)) => {
                debug!(
                    pupil_radius = pupil.radius,
                    iris_radius = iris.radius,
                    "grayscale detection succeeded"
                );
                let result = DetectionResult::found(ImageKind::Grayscale, pupil, iris);
                match sanity_warning(&iris) {
                    Some(warning) => result.with_warning(warning),
                    None => result,
                }
            }
            Err(reason) => {
                debug!(%reason, "grayscale detection failed");
                DetectionResult::failed(ImageKind::Grayscale, reason)
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn locate(
        &self,
        blurred: &GrayImage,
        width: u32,
        height: u32,
    ) -> Result<(EyeStructure, EyeStructure), String> {
        let vote_config = VoteConfig::scaled_to(width, height);
        let candidates = vote_centers(blurred, &vote_config);
        if candidates.is_empty() {
            return Err("no circular structure found".into());
        }

        // Spurious circles elsewhere in the frame are discarded; of the
        // concentric family the candidate closest to the image center wins.
        let family = concentric_family(&candidates, self.config.concentric_spread);
        let img_cx = width as f32 / 2.0;
        let img_cy = height as f32 / 2.0;
        let center = family
            .iter()
            .min_by(|a, b| {
                let da = (a.x - img_cx).powi(2) + (a.y - img_cy).powi(2);
                let db = (b.x - img_cx).powi(2) + (b.y - img_cy).powi(2);
                da.partial_cmp(&db).expect("finite distances")
            })
            .copied()
            .ok_or_else(|| String::from("no concentric circle family"))?;

        let short = width.min(height) as f32;
        let peaks = radius_edge_peaks(
            blurred,
            center.x,
            center.y,
            3.0,
            short / 2.0,
            self.config.min_radius_separation,
        );

        let max_pupil_radius = short * self.config.max_pupil_fraction;
        let pupil_peak = peaks
            .iter()
            .filter(|p| p.radius <= max_pupil_radius)
            .max_by(|a, b| a.strength.partial_cmp(&b.strength).expect("finite"))
            .copied()
            .ok_or_else(|| String::from("pupil detection failed"))?;

        let iris_peak = peaks
            .iter()
            .filter(|p| p.radius >= pupil_peak.radius * self.config.min_iris_ratio)
            .max_by(|a, b| a.strength.partial_cmp(&b.strength).expect("finite"))
            .copied()
            .ok_or_else(|| String::from("iris boundary not found"))?;

        let pupil = EyeStructure::new((center.x, center.y), pupil_peak.radius);
        let iris = EyeStructure::new((center.x, center.y), iris_peak.radius);
        Ok((pupil, iris))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};

    #[allow(clippy::cast_precision_loss)]
    fn gray_eye(w: u32, h: u32, pupil_r: f32, iris_r: f32) -> ImageInfo {
        let cx = w as f32 / 2.0;
        let cy = h as f32 / 2.0;
        let img = GrayImage::from_fn(w, h, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            if d < pupil_r {
                Luma([25u8])
            } else if d < iris_r {
                Luma([110u8])
            } else {
                Luma([210u8])
            }
        });
        ImageInfo::new("synthetic://gray_eye", DynamicImage::ImageLuma8(img))
    }

    #[test]
    fn test_detects_concentric_pair() {
        let info = gray_eye(160, 160, 16.0, 48.0);
        let result = GrayscaleDetector::default().detect(&info);

        assert!(result.success, "detection failed: {:?}", result.error);
        let pupil = result.pupil.expect("pupil");
        let iris = result.iris.expect("iris");
        assert!((pupil.radius - 16.0).abs() < 4.0, "pupil radius {}", pupil.radius);
        assert!((iris.radius - 48.0).abs() < 5.0, "iris radius {}", iris.radius);
        assert!(iris.radius > pupil.radius);
        assert!(result.warning.is_none());
    }

    #[test]
    fn test_flat_image_fails_with_reason() {
        let img = GrayImage::from_fn(120, 120, |_, _| Luma([128u8]));
        let info = ImageInfo::new("synthetic://flat", DynamicImage::ImageLuma8(img));
        let result = GrayscaleDetector::default().detect(&info);

        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(result.pupil.is_none());
    }

    #[test]
    fn test_small_iris_sets_sanity_warning() {
        // Iris radius ~30 px is below the 40 px sanity floor.
        let info = gray_eye(100, 100, 10.0, 30.0);
        let result = GrayscaleDetector::default().detect(&info);

        assert!(result.success, "detection failed: {:?}", result.error);
        assert!(result.warning.is_some(), "expected a sanity warning");
    }
}
