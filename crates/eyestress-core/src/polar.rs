//! Polar sampling over concentric circles.
//!
//! The ring counter and both detectors reason about intensity as a function
//! of radius from a fixed origin; this module provides the shared sampling
//! primitives.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use image::GrayImage;

/// Bilinearly interpolated intensity at a sub-pixel position.
///
/// Returns `None` outside the interpolable interior of the image.
#[must_use]
pub fn bilinear_sample(gray: &GrayImage, x: f32, y: f32) -> Option<f32> {
    let (w, h) = gray.dimensions();
    if x < 0.0 || y < 0.0 {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 + 1 >= w || y0 + 1 >= h {
        return None;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = f32::from(gray.get_pixel(x0, y0)[0]);
    let p10 = f32::from(gray.get_pixel(x0 + 1, y0)[0]);
    let p01 = f32::from(gray.get_pixel(x0, y0 + 1)[0]);
    let p11 = f32::from(gray.get_pixel(x0 + 1, y0 + 1)[0]);

    Some(
        p00 * (1.0 - fx) * (1.0 - fy)
            + p10 * fx * (1.0 - fy)
            + p01 * (1.0 - fx) * fy
            + p11 * fx * fy,
    )
}

/// Samples one circle of the given radius at `samples` equal angular steps.
///
/// Out-of-bounds positions are dropped; returns the in-bounds intensities.
#[must_use]
pub fn sample_circle(
    gray: &GrayImage,
    cx: f32,
    cy: f32,
    radius: f32,
    samples: usize,
) -> Vec<f32> {
    let mut values = Vec::with_capacity(samples);
    for i in 0..samples {
        let theta = std::f32::consts::TAU * (i as f32) / (samples as f32);
        let x = cx + radius * theta.cos();
        let y = cy + radius * theta.sin();
        if let Some(v) = bilinear_sample(gray, x, y) {
            values.push(v);
        }
    }
    values
}

/// Mean intensity along one circle, or `None` when the circle lies entirely
/// outside the image.
#[must_use]
pub fn ring_mean(gray: &GrayImage, cx: f32, cy: f32, radius: f32, samples: usize) -> Option<f32> {
    let values = sample_circle(gray, cx, cy, radius, samples);
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

/// Unwraps an annulus into a polar (radius x angle) matrix.
///
/// Row `i` holds the in-bounds samples of the circle at radius
/// `r_start + i * step`. Rows with no in-bounds samples are omitted along
/// with their radii.
#[must_use]
pub fn unwrap_annulus(
    gray: &GrayImage,
    cx: f32,
    cy: f32,
    r_start: f32,
    r_end: f32,
    step: f32,
    samples: usize,
) -> Vec<Vec<f32>> {
    let mut rows = Vec::new();
    let mut r = r_start;
    while r <= r_end {
        let row = sample_circle(gray, cx, cy, r, samples);
        if !row.is_empty() {
            rows.push(row);
        }
        r += step;
    }
    rows
}

/// Radial intensity profile: mean intensity per concentric circle from
/// `r_start` out to `r_end` at the given radial step.
#[must_use]
pub fn radial_profile(
    gray: &GrayImage,
    cx: f32,
    cy: f32,
    r_start: f32,
    r_end: f32,
    step: f32,
    samples: usize,
) -> Vec<f32> {
    unwrap_annulus(gray, cx, cy, r_start, r_end, step, samples)
        .iter()
        .map(|row| row.iter().sum::<f32>() / row.len() as f32)
        .collect()
}
