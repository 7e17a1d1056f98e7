//! Gradient-voting circle detection.
//!
//! Center localization uses radial-symmetry voting: every strong-gradient
//! pixel casts votes along its gradient direction over a radius window, and
//! circular structures produce peaks in the accumulator at their centers.
//! Radii are then recovered from the derivative of the radial intensity
//! profile about a chosen center.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]

use image::GrayImage;

use crate::polar::radial_profile;

/// Angular samples used when profiling a circle.
const PROFILE_SAMPLES: usize = 180;

/// Tuning for the center-voting accumulator.
#[derive(Debug, Clone)]
pub struct VoteConfig {
    /// Minimum voting radius in pixels.
    pub r_min: f32,
    /// Maximum voting radius in pixels.
    pub r_max: f32,
    /// Gradient magnitude floor as a fraction of the image maximum.
    pub gradient_floor: f32,
    /// Non-maximum-suppression radius for accumulator peaks, in pixels.
    pub nms_radius: f32,
    /// Accumulator floor as a fraction of the accumulator maximum.
    pub vote_floor: f32,
    /// Gaussian sigma applied to the accumulator before peak extraction.
    pub smooth_sigma: f32,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            r_min: 8.0,
            r_max: 60.0,
            gradient_floor: 0.08,
            nms_radius: 10.0,
            vote_floor: 0.25,
            smooth_sigma: 2.0,
        }
    }
}

impl VoteConfig {
    /// Radius bounds scaled to the image size: votes span from a small
    /// fixed minimum out to a third of the shorter image side.
    #[must_use]
    pub fn scaled_to(width: u32, height: u32) -> Self {
        let short = width.min(height) as f32;
        Self {
            r_min: (short / 24.0).max(6.0),
            r_max: (short / 3.0).max(12.0),
            ..Self::default()
        }
    }
}

/// A candidate circle center with its accumulated vote score.
#[derive(Debug, Clone, Copy)]
pub struct CenterCandidate {
    /// Center x in pixels.
    pub x: f32,
    /// Center y in pixels.
    pub y: f32,
    /// Accumulated vote mass.
    pub score: f32,
}

/// A ring-shaped edge at a given radius from a fixed center.
#[derive(Debug, Clone, Copy)]
pub struct RadiusPeak {
    /// Radius in pixels.
    pub radius: f32,
    /// Absolute radial intensity derivative at the peak.
    pub strength: f32,
}

#[inline]
fn splat_vote(accum: &mut [f32], width: u32, x: f32, y: f32, weight: f32) {
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 + 1 >= width {
        return;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let stride = width as usize;
    let base = y0 as usize * stride + x0 as usize;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Detects candidate circle centers, strongest first.
///
/// Returns an empty list for degenerate or featureless images.
#[must_use]
pub fn vote_centers(gray: &GrayImage, config: &VoteConfig) -> Vec<CenterCandidate> {
    let (w, h) = gray.dimensions();
    if w < 8 || h < 8 {
        return Vec::new();
    }

    let gx = imageproc::gradients::horizontal_sobel(gray);
    let gy = imageproc::gradients::vertical_sobel(gray);

    let mut max_mag_sq = 0.0f32;
    for y in 0..h {
        for x in 0..w {
            let gxv = f32::from(gx.get_pixel(x, y)[0]);
            let gyv = f32::from(gy.get_pixel(x, y)[0]);
            max_mag_sq = max_mag_sq.max(gxv * gxv + gyv * gyv);
        }
    }
    let max_mag = max_mag_sq.sqrt();
    if max_mag < 1e-6 {
        return Vec::new();
    }
    let mag_floor = config.gradient_floor * max_mag;

    let mut accum = vec![0.0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let gxv = f32::from(gx.get_pixel(x, y)[0]);
            let gyv = f32::from(gy.get_pixel(x, y)[0]);
            let mag = (gxv * gxv + gyv * gyv).sqrt();
            if mag < mag_floor {
                continue;
            }
            let dx = gxv / mag;
            let dy = gyv / mag;

            // Votes run both ways: dark-on-bright and bright-on-dark circles
            // have opposite gradient orientations at their boundaries.
            for sign in [-1.0f32, 1.0] {
                let mut r = config.r_min;
                while r <= config.r_max {
                    let vx = x as f32 + sign * dx * r;
                    let vy = y as f32 + sign * dy * r;
                    if vx >= 0.0 && vx < (w - 1) as f32 && vy >= 0.0 && vy < (h - 1) as f32 {
                        splat_vote(&mut accum, w, vx, vy, mag);
                    }
                    r += 1.0;
                }
            }
        }
    }

    let accum_img = image::ImageBuffer::<image::Luma<f32>, Vec<f32>>::from_raw(w, h, accum)
        .expect("accumulator dimensions match image");
    let smoothed = imageproc::filter::gaussian_blur_f32(&accum_img, config.smooth_sigma);
    let votes = smoothed.as_raw();

    let max_vote = votes.iter().copied().fold(0.0f32, f32::max);
    if max_vote < 1e-6 {
        return Vec::new();
    }
    let vote_floor = config.vote_floor * max_vote;
    let nms = config.nms_radius.ceil() as i32;

    let mut candidates = Vec::new();
    for y in nms..(h as i32 - nms) {
        for x in nms..(w as i32 - nms) {
            let idx = y as usize * w as usize + x as usize;
            let val = votes[idx];
            if val < vote_floor {
                continue;
            }
            let mut is_max = true;
            'window: for dy in -nms..=nms {
                for dx in -nms..=nms {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    if ((dx * dx + dy * dy) as f32) > config.nms_radius * config.nms_radius {
                        continue;
                    }
                    let nidx = (y + dy) as usize * w as usize + (x + dx) as usize;
                    if votes[nidx] > val || (votes[nidx] == val && nidx < idx) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                candidates.push(CenterCandidate {
                    x: x as f32,
                    y: y as f32,
                    score: val,
                });
            }
        }
    }

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).expect("finite scores"));
    candidates
}

/// Keeps the concentric family: candidates within `max_spread` pixels of the
/// candidate centroid. Outliers belong to spurious structures elsewhere in
/// the frame.
#[must_use]
pub fn concentric_family(candidates: &[CenterCandidate], max_spread: f32) -> Vec<CenterCandidate> {
    if candidates.len() < 2 {
        return candidates.to_vec();
    }
    let n = candidates.len() as f32;
    let cx = candidates.iter().map(|c| c.x).sum::<f32>() / n;
    let cy = candidates.iter().map(|c| c.y).sum::<f32>() / n;
    candidates
        .iter()
        .copied()
        .filter(|c| ((c.x - cx).powi(2) + (c.y - cy).powi(2)).sqrt() < max_spread)
        .collect()
}

/// Ring-edge radii about a fixed center.
///
/// Computes the radial intensity profile at unit step and returns the local
/// maxima of its absolute derivative, strongest-separation filtered: a peak
/// closer than `min_separation` to a stronger one is dropped.
#[must_use]
pub fn radius_edge_peaks(
    gray: &GrayImage,
    cx: f32,
    cy: f32,
    r_min: f32,
    r_max: f32,
    min_separation: f32,
) -> Vec<RadiusPeak> {
    let (w, h) = gray.dimensions();
    // Stay inside the interpolable interior so profile rows map 1:1 to radii.
    let border = cx
        .min(cy)
        .min(w as f32 - 2.0 - cx)
        .min(h as f32 - 2.0 - cy);
    let r_end = r_max.min(border - 1.0);
    if r_end <= r_min + 2.0 {
        return Vec::new();
    }

    let profile = radial_profile(gray, cx, cy, r_min, r_end, 1.0, PROFILE_SAMPLES);
    if profile.len() < 5 {
        return Vec::new();
    }

    // Central-difference derivative magnitude.
    let mut strength = vec![0.0f32; profile.len()];
    for i in 1..profile.len() - 1 {
        strength[i] = ((profile[i + 1] - profile[i - 1]) / 2.0).abs();
    }
    let max_strength = strength.iter().copied().fold(0.0f32, f32::max);
    if max_strength < 1e-3 {
        return Vec::new();
    }
    let floor = (0.15 * max_strength).max(2.0);

    let mut peaks: Vec<RadiusPeak> = Vec::new();
    for i in 1..strength.len() - 1 {
        if strength[i] >= floor && strength[i] >= strength[i - 1] && strength[i] > strength[i + 1] {
            peaks.push(RadiusPeak {
                radius: r_min + i as f32,
                strength: strength[i],
            });
        }
    }

    // Separation filter, strongest first.
    peaks.sort_by(|a, b| b.strength.partial_cmp(&a.strength).expect("finite"));
    let mut kept: Vec<RadiusPeak> = Vec::new();
    for peak in peaks {
        if kept
            .iter()
            .all(|k| (k.radius - peak.radius).abs() >= min_separation)
        {
            kept.push(peak);
        }
    }
    kept.sort_by(|a, b| a.radius.partial_cmp(&b.radius).expect("finite"));
    kept
}
