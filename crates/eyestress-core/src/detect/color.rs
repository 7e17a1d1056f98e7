//! Color eye detection.
//!
//! Color photographs give a chromatic shortcut: the pupil is the darkest
//! compact connected region near the image center, and the iris boundary is
//! the strongest outward intensity discontinuity beyond it (iris-to-sclera
//! contrast). Naturally dark irises flood the dark threshold, so a
//! `brown_iris_mode` tightens the component area filter instead.

#![allow(clippy::cast_precision_loss)]

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::detect::voting::radius_edge_peaks;
use crate::detect::{sanity_warning, DETECTION_BLUR_SIGMA};
use crate::domain::{DetectionResult, EyeStructure, ImageInfo, ImageKind};
use crate::features::Histogram;

/// Tuning for the color detection strategy.
#[derive(Debug, Clone)]
pub struct ColorDetectorConfig {
    /// Gaussian sigma applied before thresholding.
    pub blur_sigma: f32,
    /// Percentile anchoring the dark threshold at the darkest image mode.
    pub dark_percentile: f64,
    /// Margin above the darkest mode; pixels up to `percentile + margin`
    /// count as pupil-dark. Keeps the threshold below the iris level even
    /// when the pupil holds only a small fraction of the frame.
    pub dark_margin: u8,
    /// Area filtering for naturally dark (brown) irises: reject large
    /// flooded components rather than raising the threshold.
    pub brown_iris_mode: bool,
    /// Minimum connected-component area in pixels.
    pub min_component_area: u32,
    /// Maximum component area as a fraction of the image area.
    pub max_component_fraction: f32,
    /// Minimum radial separation between distinct iris edge candidates.
    pub min_radius_separation: f32,
    /// Iris radius must exceed the pupil radius by this factor.
    pub min_iris_ratio: f32,
}

impl Default for ColorDetectorConfig {
    fn default() -> Self {
        Self {
            blur_sigma: DETECTION_BLUR_SIGMA,
            dark_percentile: 0.01,
            dark_margin: 25,
            brown_iris_mode: false,
            min_component_area: 30,
            max_component_fraction: 0.25,
            min_radius_separation: 4.0,
            min_iris_ratio: 1.3,
        }
    }
}

impl ColorDetectorConfig {
    /// Enables the dark-iris area-filtering mode.
    #[must_use]
    pub const fn with_brown_iris_mode(mut self, enabled: bool) -> Self {
        self.brown_iris_mode = enabled;
        self
    }
}

/// Dark-region detector for color imagery.
#[derive(Debug, Clone, Default)]
pub struct ColorDetector {
    config: ColorDetectorConfig,
}

/// Accumulated statistics for one connected component.
#[derive(Debug, Clone, Copy, Default)]
struct Component {
    area: u32,
    sum_x: f64,
    sum_y: f64,
}

impl ColorDetector {
    /// Creates a detector with the given parameter set.
    #[must_use]
    pub const fn new(config: ColorDetectorConfig) -> Self {
        Self { config }
    }

    /// Locates the pupil and then grows outward to the iris boundary.
    #[must_use]
    pub fn detect(&self, info: &ImageInfo) -> DetectionResult {
        let gray = info.to_luma8();
        let blurred = imageproc::filter::gaussian_blur_f32(&gray, self.config.blur_sigma);

        let pupil = match self.find_pupil(&blurred, info.width, info.height) {
            Ok(p) => p,
            Err(reason) => {
                debug!(%reason, "color pupil detection failed");
                return DetectionResult::failed(ImageKind::Color, reason);
            }
        };

        let iris = match self.find_iris(&blurred, &pupil, info.width, info.height) {
            Ok(i) => i,
            Err(reason) => {
                debug!(%reason, "color iris detection failed");
                return DetectionResult::failed(ImageKind::Color, reason);
            }
        };

        debug!(
            pupil_radius = pupil.radius,
            iris_radius = iris.radius,
            "color detection succeeded"
        );
        let result = DetectionResult::found(ImageKind::Color, pupil, iris);
        match sanity_warning(&iris) {
            Some(warning) => result.with_warning(warning),
            None => result,
        }
    }

    /// The pupil is the darkest compact region, scored by area and
    /// proximity to the image center.
    fn find_pupil(
        &self,
        blurred: &GrayImage,
        width: u32,
        height: u32,
    ) -> Result<EyeStructure, String> {
        let histogram = Histogram::from_luma(blurred);
        let threshold = histogram
            .percentile(self.config.dark_percentile)
            .saturating_add(self.config.dark_margin);

        let mask = GrayImage::from_fn(width, height, |x, y| {
            if blurred.get_pixel(x, y)[0] <= threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

        let mut components: Vec<Component> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let id = label[0] as usize;
            if id == 0 {
                continue;
            }
            if components.len() < id {
                components.resize(id, Component::default());
            }
            let c = &mut components[id - 1];
            c.area += 1;
            c.sum_x += f64::from(x);
            c.sum_y += f64::from(y);
        }

        let image_area = (width * height) as f32;
        let max_fraction = if self.config.brown_iris_mode {
            // Dark irises flood the threshold; keep only pupil-sized blobs.
            self.config.max_component_fraction / 3.0
        } else {
            self.config.max_component_fraction
        };
        let max_area = (image_area * max_fraction) as u32;

        let img_cx = width as f32 / 2.0;
        let img_cy = height as f32 / 2.0;
        let centrality_scale = (width.min(height) as f32 / 4.0).max(1.0);

        let best = components
            .iter()
            .filter(|c| c.area >= self.config.min_component_area && c.area <= max_area)
            .map(|c| {
                let cx = (c.sum_x / f64::from(c.area)) as f32;
                let cy = (c.sum_y / f64::from(c.area)) as f32;
                let dist = ((cx - img_cx).powi(2) + (cy - img_cy).powi(2)).sqrt();
                let score = c.area as f32 / (1.0 + (dist / centrality_scale).powi(2));
                (score, cx, cy, c.area)
            })
            .max_by(|a, b| a.0.partial_cmp(&b.0).expect("finite scores"));

        let (_, cx, cy, area) = best.ok_or_else(|| String::from("pupil detection failed"))?;
        let radius = (area as f32 / std::f32::consts::PI).sqrt();
        Ok(EyeStructure::new((cx, cy), radius))
    }

    /// The iris edge is the strongest radial intensity discontinuity beyond
    /// the pupil boundary.
    fn find_iris(
        &self,
        blurred: &GrayImage,
        pupil: &EyeStructure,
        width: u32,
        height: u32,
    ) -> Result<EyeStructure, String> {
        let short = width.min(height) as f32;
        let r_start = pupil.radius * self.config.min_iris_ratio;
        let peaks = radius_edge_peaks(
            blurred,
            pupil.center.0,
            pupil.center.1,
            r_start,
            short / 2.0,
            self.config.min_radius_separation,
        );

        let iris_peak = peaks
            .iter()
            .max_by(|a, b| a.strength.partial_cmp(&b.strength).expect("finite"))
            .copied()
            .ok_or_else(|| String::from("iris detection failed"))?;

        Ok(EyeStructure::new(pupil.center, iris_peak.radius))
    }
}
