//! Model-input preparation for the fusion classifier.
//!
//! Preprocessing must match what the fusion artifact was trained on:
//! - pupil stream: 5-channel crop with the two structural channels zeroed,
//! - iris stream: 5-channel crop with RGB, edge map, and black-hat planes,
//! - age: one-hot over eight decade bins,
//! - ring count: normalized by 10.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]

use image::{DynamicImage, GrayImage};
use tracing::debug;

use crate::domain::{DetectionResult, EyeStructure, ImageInfo, StageError};

/// Model input side length in pixels.
pub const TARGET_SIZE: usize = 224;
/// Channels per image stream.
pub const MODEL_CHANNELS: usize = 5;
/// One-hot age bins (decades, 70+ capped).
pub const AGE_BINS: usize = 8;
/// Ring counts enter the model divided by this.
pub const RING_COUNT_NORMALIZER: f32 = 10.0;

/// Crop padding around the pupil radius.
pub const PUPIL_REGION_PADDING: f32 = 1.8;
/// Crop padding around the iris radius.
pub const IRIS_REGION_PADDING: f32 = 1.3;

/// Canny thresholds for the structural edge plane.
const EDGE_LOW: f32 = 45.0;
const EDGE_HIGH: f32 = 135.0;
/// Kernel side for the black-hat morphology plane.
const MORPH_KERNEL: u32 = 5;
/// Minimum usable crop side in pixels.
const MIN_REGION_SIDE: u32 = 8;

/// Prepared inputs for one fusion-model invocation.
///
/// Image planes are channel-major (`MODEL_CHANNELS` x `TARGET_SIZE` x
/// `TARGET_SIZE`), values in [0, 1].
#[derive(Debug, Clone)]
pub struct ModelInputs {
    /// Pupil-stream planes; structural channels 3-4 are all zero.
    pub pupil_image: Vec<f32>,
    /// Iris-stream planes; all five channels populated.
    pub iris_image: Vec<f32>,
    /// One-hot age encoding.
    pub age_vector: [f32; AGE_BINS],
    /// Ring count divided by [`RING_COUNT_NORMALIZER`].
    pub ring_count_normalized: f32,
}

impl ModelInputs {
    /// Builds fusion inputs from a successful detection.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::RegionExtraction`] when the detection is
    /// incomplete or an eye region falls outside the image bounds.
    pub fn prepare(
        info: &ImageInfo,
        detection: &DetectionResult,
        ring_count: u8,
        age: u32,
    ) -> Result<Self, StageError> {
        let (pupil, iris) = match (&detection.pupil, &detection.iris) {
            (Some(p), Some(i)) => (p, i),
            _ => {
                return Err(StageError::RegionExtraction(
                    "detection carries no eye structures".into(),
                ))
            }
        };

        let pupil_region = extract_eye_region(info, pupil, PUPIL_REGION_PADDING)?;
        let iris_region = extract_eye_region(info, iris, IRIS_REGION_PADDING)?;
        debug!(
            pupil_w = pupil_region.width(),
            iris_w = iris_region.width(),
            "eye regions extracted"
        );

        Ok(Self {
            pupil_image: five_channel_planes(&pupil_region, true),
            iris_image: five_channel_planes(&iris_region, false),
            age_vector: encode_age(age),
            ring_count_normalized: f32::from(ring_count) / RING_COUNT_NORMALIZER,
        })
    }
}

/// Crops a padded square region around an eye structure.
///
/// The requested square is intersected with the image; a crop that leaves
/// less than a few pixels on a side means the geometry points outside the
/// frame.
///
/// # Errors
///
/// Returns [`StageError::RegionExtraction`] for out-of-bounds geometry.
pub fn extract_eye_region(
    info: &ImageInfo,
    structure: &EyeStructure,
    padding: f32,
) -> Result<DynamicImage, StageError> {
    let (cx, cy) = structure.center;
    let half = structure.radius * padding;

    let x0 = (cx - half).floor().max(0.0) as u32;
    let y0 = (cy - half).floor().max(0.0) as u32;
    let x1 = ((cx + half).ceil() as i64).min(i64::from(info.width)).max(0) as u32;
    let y1 = ((cy + half).ceil() as i64).min(i64::from(info.height)).max(0) as u32;

    if x1 <= x0 + MIN_REGION_SIDE || y1 <= y0 + MIN_REGION_SIDE {
        return Err(StageError::RegionExtraction(format!(
            "region around ({cx:.0}, {cy:.0}) r={:.0} lies outside the {}x{} image",
            structure.radius, info.width, info.height
        )));
    }

    Ok(info.image.crop_imm(x0, y0, x1 - x0, y1 - y0))
}

/// Builds the five channel-major planes for one stream.
///
/// Channels 0-2 are RGB, channel 3 is a Canny edge map, channel 4 a
/// black-hat morphology response; all scaled to [0, 1]. The pupil stream
/// zeroes channels 3-4.
fn five_channel_planes(region: &DynamicImage, zero_structural: bool) -> Vec<f32> {
    let resized = region.resize_exact(
        TARGET_SIZE as u32,
        TARGET_SIZE as u32,
        image::imageops::FilterType::Lanczos3,
    );
    let rgb = resized.to_rgb8();
    let gray = resized.to_luma8();

    let plane = TARGET_SIZE * TARGET_SIZE;
    let mut data = vec![0.0f32; MODEL_CHANNELS * plane];

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let idx = y as usize * TARGET_SIZE + x as usize;
        data[idx] = f32::from(pixel.0[0]) / 255.0;
        data[plane + idx] = f32::from(pixel.0[1]) / 255.0;
        data[2 * plane + idx] = f32::from(pixel.0[2]) / 255.0;
    }

    if !zero_structural {
        let edges = imageproc::edges::canny(&gray, EDGE_LOW, EDGE_HIGH);
        let hat = black_hat(&gray, MORPH_KERNEL);
        for (x, y, pixel) in edges.enumerate_pixels() {
            let idx = y as usize * TARGET_SIZE + x as usize;
            data[3 * plane + idx] = f32::from(pixel.0[0]) / 255.0;
        }
        for (x, y, pixel) in hat.enumerate_pixels() {
            let idx = y as usize * TARGET_SIZE + x as usize;
            data[4 * plane + idx] = f32::from(pixel.0[0]) / 255.0;
        }
    }

    data
}

/// Black-hat morphology: closing minus the image, highlighting dark detail
/// smaller than the kernel (iris furrows, ring troughs).
fn black_hat(gray: &GrayImage, kernel: u32) -> GrayImage {
    let closed = erode(&dilate(gray, kernel), kernel);
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        pixel.0[0] = closed.get_pixel(x, y)[0].saturating_sub(gray.get_pixel(x, y)[0]);
    }
    out
}

fn dilate(gray: &GrayImage, kernel: u32) -> GrayImage {
    window_filter(gray, kernel, u8::max, 0)
}

fn erode(gray: &GrayImage, kernel: u32) -> GrayImage {
    window_filter(gray, kernel, u8::min, 255)
}

fn window_filter(gray: &GrayImage, kernel: u32, fold: fn(u8, u8) -> u8, init: u8) -> GrayImage {
    let (w, h) = gray.dimensions();
    let r = (kernel / 2) as i64;
    GrayImage::from_fn(w, h, |x, y| {
        let mut acc = init;
        for dy in -r..=r {
            for dx in -r..=r {
                let nx = i64::from(x) + dx;
                let ny = i64::from(y) + dy;
                if nx >= 0 && ny >= 0 && nx < i64::from(w) && ny < i64::from(h) {
                    acc = fold(acc, gray.get_pixel(nx as u32, ny as u32)[0]);
                }
            }
        }
        image::Luma([acc])
    })
}

/// Decade bin index for an age, capped at the final 70+ bin.
#[must_use]
pub const fn age_bin(age: u32) -> usize {
    let bin = (age / 10) as usize;
    if bin >= AGE_BINS {
        AGE_BINS - 1
    } else {
        bin
    }
}

/// One-hot age encoding over eight decade bins.
#[must_use]
pub fn encode_age(age: u32) -> [f32; AGE_BINS] {
    let mut v = [0.0f32; AGE_BINS];
    v[age_bin(age)] = 1.0;
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageKind;
    use image::{Luma, Rgb, RgbImage};

    fn test_image(w: u32, h: u32) -> ImageInfo {
        let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 60]));
        ImageInfo::new("synthetic://prep", DynamicImage::ImageRgb8(img))
    }

    #[test]
    fn test_age_bins_cover_decades() {
        assert_eq!(age_bin(0), 0);
        assert_eq!(age_bin(9), 0);
        assert_eq!(age_bin(35), 3);
        assert_eq!(age_bin(69), 6);
        assert_eq!(age_bin(70), 7);
        assert_eq!(age_bin(95), 7);
    }

    #[test]
    fn test_encode_age_is_one_hot() {
        for age in [0u32, 14, 30, 59, 60, 88] {
            let v = encode_age(age);
            let sum: f32 = v.iter().sum();
            assert!((sum - 1.0).abs() < f32::EPSILON, "age {age} not one-hot");
            assert!((v[age_bin(age)] - 1.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_region_extraction_in_bounds() {
        let info = test_image(200, 200);
        let s = EyeStructure::new((100.0, 100.0), 20.0);
        let region = extract_eye_region(&info, &s, PUPIL_REGION_PADDING).expect("in bounds");
        // 20 px radius with 1.8 padding spans 72 px.
        assert!(region.width() >= 70 && region.width() <= 74);
    }

    #[test]
    fn test_region_extraction_out_of_bounds() {
        let info = test_image(200, 200);
        let s = EyeStructure::new((-80.0, -80.0), 10.0);
        let err = extract_eye_region(&info, &s, 1.8).expect_err("outside frame");
        assert!(matches!(err, StageError::RegionExtraction(_)));
    }

    #[test]
    fn test_pupil_stream_zeroes_structural_channels() {
        let info = test_image(200, 200);
        let pupil = EyeStructure::new((100.0, 100.0), 18.0);
        let iris = EyeStructure::new((100.0, 100.0), 55.0);
        let detection = DetectionResult::found(ImageKind::Color, pupil, iris);

        let inputs = ModelInputs::prepare(&info, &detection, 2, 34).expect("prepare");
        let plane = TARGET_SIZE * TARGET_SIZE;

        assert_eq!(inputs.pupil_image.len(), MODEL_CHANNELS * plane);
        assert!(
            inputs.pupil_image[3 * plane..].iter().all(|&v| v == 0.0),
            "pupil structural channels must be zero"
        );
        assert!((inputs.ring_count_normalized - 0.2).abs() < 1e-6);
        assert!((inputs.age_vector[3] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_prepare_requires_structures() {
        let info = test_image(100, 100);
        let detection = DetectionResult::failed(ImageKind::Color, "no pupil");
        let err = ModelInputs::prepare(&info, &detection, 0, 30).expect_err("must fail");
        assert!(matches!(err, StageError::RegionExtraction(_)));
    }

    #[test]
    fn test_black_hat_responds_to_dark_detail() {
        // Bright field with one dark pit smaller than the kernel.
        let mut img = GrayImage::from_fn(32, 32, |_, _| Luma([200u8]));
        img.put_pixel(16, 16, Luma([40]));
        let hat = black_hat(&img, MORPH_KERNEL);

        assert!(hat.get_pixel(16, 16)[0] > 100, "pit should respond strongly");
        assert_eq!(hat.get_pixel(2, 2)[0], 0, "flat area should be zero");
    }
}
