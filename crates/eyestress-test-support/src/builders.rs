//! Synthetic eye-image builders for testing.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]

use eyestress_core::ImageInfo;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// Standard fixture geometry: pupil and iris radii for the 160x160 eyes.
pub const PUPIL_RADIUS: f32 = 14.0;
/// Iris radius of the standard fixtures.
pub const IRIS_RADIUS: f32 = 48.0;

const GRAY_PUPIL: u8 = 30;
const GRAY_IRIS: u8 = 120;
const GRAY_SCLERA: u8 = 220;

/// Builder for synthetic eye images.
///
/// Produces centered pupil/iris/sclera geometry with optional concentric
/// tension-ring bands, in grayscale and color variants.
pub struct SyntheticEyeBuilder;

impl SyntheticEyeBuilder {
    // === Grayscale eyes ===

    /// Grayscale eye: dark pupil disk, flat iris annulus, bright sclera.
    #[must_use]
    pub fn gray_eye(width: u32, height: u32, pupil_r: f32, iris_r: f32) -> ImageInfo {
        Self::gray_eye_with_bands(width, height, pupil_r, iris_r, &[])
    }

    /// Grayscale eye with concentric `(radius, amplitude)` bands added to
    /// the iris base level. Positive amplitudes are light rings, negative
    /// amplitudes dark rings; each band spans three pixels of radius.
    #[must_use]
    pub fn gray_eye_with_bands(
        width: u32,
        height: u32,
        pupil_r: f32,
        iris_r: f32,
        bands: &[(f32, f32)],
    ) -> ImageInfo {
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let img = GrayImage::from_fn(width, height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            if d < pupil_r {
                Luma([GRAY_PUPIL])
            } else if d < iris_r {
                let mut level = f32::from(GRAY_IRIS);
                for &(radius, amplitude) in bands {
                    if (d - radius).abs() < 3.0 {
                        level += amplitude;
                    }
                }
                Luma([level.clamp(0.0, 255.0) as u8])
            } else {
                Luma([GRAY_SCLERA])
            }
        });
        ImageInfo::new("synthetic://gray_eye", DynamicImage::ImageLuma8(img))
    }

    /// Standard 160x160 grayscale eye with no ring texture.
    #[must_use]
    pub fn plain_eye() -> ImageInfo {
        Self::gray_eye(160, 160, PUPIL_RADIUS, IRIS_RADIUS)
    }

    /// Standard eye with a single moderate band, sized so the radial
    /// variance lands in the partial-ring window.
    #[must_use]
    pub fn single_band_eye() -> ImageInfo {
        Self::gray_eye_with_bands(160, 160, PUPIL_RADIUS, IRIS_RADIUS, &[(36.0, 15.0)])
    }

    /// Standard eye overlaid with three alternating light/dark rings.
    #[must_use]
    pub fn ringed_eye() -> ImageInfo {
        Self::gray_eye_with_bands(
            160,
            160,
            PUPIL_RADIUS,
            IRIS_RADIUS,
            &[(26.0, 50.0), (34.0, -50.0), (42.0, 50.0)],
        )
    }

    // === Color eyes ===

    /// Color eye with a blue-gray iris and warm sclera.
    #[must_use]
    pub fn color_eye(width: u32, height: u32, pupil_r: f32, iris_r: f32) -> ImageInfo {
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let img = RgbImage::from_fn(width, height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            if d < pupil_r {
                Rgb([15u8, 12, 14])
            } else if d < iris_r {
                Rgb([70u8, 110, 150])
            } else {
                Rgb([235u8, 225, 215])
            }
        });
        ImageInfo::new("synthetic://color_eye", DynamicImage::ImageRgb8(img))
    }

    /// Standard 160x160 color eye.
    #[must_use]
    pub fn plain_color_eye() -> ImageInfo {
        Self::color_eye(160, 160, PUPIL_RADIUS, IRIS_RADIUS)
    }

    // === Degenerate inputs ===

    /// Featureless grayscale image; detection must fail on it.
    #[must_use]
    pub fn flat_gray(width: u32, height: u32, value: u8) -> ImageInfo {
        let img = GrayImage::from_fn(width, height, |_, _| Luma([value]));
        ImageInfo::new("synthetic://flat", DynamicImage::ImageLuma8(img))
    }

    /// Zero-sized buffer; the image-kind gate must reject it.
    #[must_use]
    pub fn empty() -> ImageInfo {
        ImageInfo::new("synthetic://empty", DynamicImage::ImageRgb8(RgbImage::new(0, 0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_eye_levels() {
        let info = SyntheticEyeBuilder::plain_eye();
        let gray = info.to_luma8();

        assert_eq!(gray.get_pixel(80, 80).0[0], GRAY_PUPIL);
        assert_eq!(gray.get_pixel(80 + 30, 80).0[0], GRAY_IRIS);
        assert_eq!(gray.get_pixel(5, 5).0[0], GRAY_SCLERA);
    }

    #[test]
    fn test_bands_modulate_iris_only() {
        let info = SyntheticEyeBuilder::single_band_eye();
        let gray = info.to_luma8();

        // On the band radius (36 px right of center).
        assert_eq!(gray.get_pixel(80 + 36, 80).0[0], GRAY_IRIS + 15);
        // Off the band, still iris.
        assert_eq!(gray.get_pixel(80 + 30, 80).0[0], GRAY_IRIS);
        // Pupil and sclera untouched.
        assert_eq!(gray.get_pixel(80, 80).0[0], GRAY_PUPIL);
        assert_eq!(gray.get_pixel(5, 5).0[0], GRAY_SCLERA);
    }

    #[test]
    fn test_color_eye_has_distinct_channels() {
        let info = SyntheticEyeBuilder::plain_color_eye();
        let rgb = info.to_rgb8();
        let iris_pixel = rgb.get_pixel(80 + 30, 80);
        assert_ne!(iris_pixel.0[0], iris_pixel.0[1]);
    }

    #[test]
    fn test_empty_has_zero_dimensions() {
        let info = SyntheticEyeBuilder::empty();
        assert_eq!(info.width, 0);
        assert_eq!(info.height, 0);
    }
}
