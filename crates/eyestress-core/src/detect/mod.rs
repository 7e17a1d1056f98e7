//! Eye structure detection strategies.
//!
//! Two interchangeable strategies share the `detect` contract; the image-kind
//! gate picks which one runs. Misclassification of the gate degrades
//! detection accuracy silently, which is why `ImageKind::Unknown` must be
//! treated as a hard failure upstream.

mod color;
mod grayscale;
pub mod voting;

pub use color::{ColorDetector, ColorDetectorConfig};
pub use grayscale::{GrayscaleDetector, GrayscaleDetectorConfig};

use crate::domain::{DetectionResult, EyeStructure, ImageInfo, ImageKind};

/// Gaussian sigma shared by both strategies' pre-smoothing.
pub(crate) const DETECTION_BLUR_SIGMA: f32 = 1.5;

/// Sanity window for a detected iris radius, in pixels.
const IRIS_SANITY_MIN_PX: f32 = 40.0;
const IRIS_SANITY_MAX_PX: f32 = 300.0;

/// Non-fatal note for an iris radius outside the sanity window; measurement
/// proceeds with reduced confidence.
pub(crate) fn sanity_warning(iris: &EyeStructure) -> Option<String> {
    if iris.radius < IRIS_SANITY_MIN_PX || iris.radius > IRIS_SANITY_MAX_PX {
        Some(format!(
            "unusual iris radius ({:.0}px); measurements may be inaccurate",
            iris.radius
        ))
    } else {
        None
    }
}

/// Configuration for both detector strategies.
#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    /// Color strategy parameters.
    pub color: ColorDetectorConfig,
    /// Grayscale strategy parameters.
    pub grayscale: GrayscaleDetectorConfig,
}

/// Detector strategy selected by the image-kind gate.
#[derive(Debug, Clone)]
pub enum EyeDetector {
    /// Dark-region strategy for color imagery.
    Color(ColorDetector),
    /// Circle-voting strategy for grayscale imagery.
    Grayscale(GrayscaleDetector),
}

impl EyeDetector {
    /// Builds the strategy matching the classified image kind.
    ///
    /// Returns `None` for `ImageKind::Unknown`; there is no detector for a
    /// degenerate buffer.
    #[must_use]
    pub fn for_kind(kind: ImageKind, config: &DetectorConfig) -> Option<Self> {
        match kind {
            ImageKind::Color => Some(Self::Color(ColorDetector::new(config.color.clone()))),
            ImageKind::Grayscale => Some(Self::Grayscale(GrayscaleDetector::new(
                config.grayscale.clone(),
            ))),
            ImageKind::Unknown => None,
        }
    }

    /// Runs the selected strategy.
    #[must_use]
    pub fn detect(&self, info: &ImageInfo) -> DetectionResult {
        match self {
            Self::Color(d) => d.detect(info),
            Self::Grayscale(d) => d.detect(info),
        }
    }

    /// Strategy name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Color(_) => "color",
            Self::Grayscale(_) => "grayscale",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection() {
        let config = DetectorConfig::default();
        assert!(matches!(
            EyeDetector::for_kind(ImageKind::Color, &config),
            Some(EyeDetector::Color(_))
        ));
        assert!(matches!(
            EyeDetector::for_kind(ImageKind::Grayscale, &config),
            Some(EyeDetector::Grayscale(_))
        ));
        assert!(EyeDetector::for_kind(ImageKind::Unknown, &config).is_none());
    }

    #[test]
    fn test_sanity_window_boundaries() {
        let inside = EyeStructure::new((0.0, 0.0), 40.0);
        assert!(sanity_warning(&inside).is_none());

        let small = EyeStructure::new((0.0, 0.0), 39.0);
        assert!(sanity_warning(&small).is_some());

        let large = EyeStructure::new((0.0, 0.0), 301.0);
        assert!(sanity_warning(&large).is_some());
    }
}
