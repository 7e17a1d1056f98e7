//! Hand-crafted feature extraction for the shallow classifier.
//!
//! Computes the fixed 11-element descriptor from a grayscale eye image:
//! circular-feature count, radial-intensity statistics, edge density, texture
//! statistics, gradient-magnitude statistics, and frequency-domain
//! statistics. The column order is a trained-artifact contract and must
//! never be reordered independently of retraining.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::polar::radial_profile;
use crate::rings::{count_bands, variance};

/// Number of feature columns.
pub const FEATURE_COUNT: usize = 11;

/// 256-bin intensity histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    total: u64,
}

impl Histogram {
    /// Computes the histogram of a grayscale image.
    #[must_use]
    pub fn from_luma(image: &GrayImage) -> Self {
        let mut bins = [0u64; 256];
        for pixel in image.pixels() {
            bins[usize::from(pixel.0[0])] += 1;
        }
        let total = bins.iter().sum();
        Self { bins, total }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Intensity at the given percentile (0.0-1.0).
    #[must_use]
    pub fn percentile(&self, p: f64) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let target = (self.total as f64 * p).round() as u64;
        let mut cumulative = 0u64;
        for (i, &count) in self.bins.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return i as u8;
            }
        }
        255
    }

    /// Equalization lookup table: maps each intensity to its scaled
    /// cumulative rank.
    #[must_use]
    pub fn equalization_lut(&self) -> [u8; 256] {
        let mut lut = [0u8; 256];
        if self.total == 0 {
            return lut;
        }
        let mut cumulative = 0u64;
        for (i, &count) in self.bins.iter().enumerate() {
            cumulative += count;
            lut[i] = ((cumulative * 255) / self.total) as u8;
        }
        lut
    }
}

/// Global histogram equalization for contrast normalization.
#[must_use]
pub fn equalize(gray: &GrayImage) -> GrayImage {
    let lut = Histogram::from_luma(gray).equalization_lut();
    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[usize::from(pixel.0[0])];
    }
    out
}

/// The fixed-order feature descriptor.
///
/// `as_array` is the load-bearing column contract with the trained scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Circular features detected in the region of interest.
    pub circle_count: f32,
    /// Variance of the radial intensity profile.
    pub radial_var: f32,
    /// Mean of the radial intensity profile.
    pub radial_mean: f32,
    /// Standard deviation of the radial intensity profile.
    pub radial_std: f32,
    /// Fraction of edge pixels in the region of interest.
    pub edge_density: f32,
    /// Intensity variance of the region of interest.
    pub texture_var: f32,
    /// Intensity mean of the region of interest.
    pub texture_mean: f32,
    /// Mean gradient magnitude.
    pub grad_mean: f32,
    /// Standard deviation of the gradient magnitude.
    pub grad_std: f32,
    /// Mean of the 2-D magnitude spectrum.
    pub freq_mean: f32,
    /// Standard deviation of the 2-D magnitude spectrum.
    pub freq_std: f32,
}

impl FeatureVector {
    /// Columns in trained order:
    /// `[circle_count, radial_var, radial_mean, radial_std, edge_density,
    /// texture_var, texture_mean, grad_mean, grad_std, freq_mean, freq_std]`.
    #[must_use]
    pub const fn as_array(&self) -> [f32; FEATURE_COUNT] {
        [
            self.circle_count,
            self.radial_var,
            self.radial_mean,
            self.radial_std,
            self.edge_density,
            self.texture_var,
            self.texture_mean,
            self.grad_mean,
            self.grad_std,
            self.freq_mean,
            self.freq_std,
        ]
    }
}

/// Tuning for feature extraction.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Gaussian sigma for pre-smoothing.
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    /// Upper Canny hysteresis threshold.
    pub canny_high: f32,
    /// First sampled radius of the radial profile, in pixels.
    pub radial_start: f32,
    /// Radial step between sampled circles, in pixels.
    pub radial_step: f32,
    /// Angular samples per circle.
    pub angular_samples: usize,
    /// Radial statistics are zeroed below this ROI side length.
    pub min_roi_side: u32,
    /// Radial statistics are zeroed below this profile length.
    pub min_radial_samples: usize,
    /// Band excursion floor for the circular-feature count.
    pub band_delta_floor: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.5,
            canny_low: 45.0,
            canny_high: 135.0,
            radial_start: 15.0,
            radial_step: 4.0,
            angular_samples: 360,
            min_roi_side: 50,
            min_radial_samples: 4,
            band_delta_floor: 2.0,
        }
    }
}

/// Computes the 11-element descriptor from a grayscale eye image.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    /// Creates an extractor with the given tuning.
    #[must_use]
    pub const fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Extracts the descriptor.
    ///
    /// The image is smoothed and contrast-normalized, then the center
    /// one-third region of interest feeds the radial, edge, texture,
    /// gradient, and frequency statistics.
    #[must_use]
    pub fn extract(&self, gray: &GrayImage) -> FeatureVector {
        let cfg = &self.config;
        let blurred = imageproc::filter::gaussian_blur_f32(gray, cfg.blur_sigma);
        let enhanced = equalize(&blurred);

        let roi = center_roi(&enhanced);
        let (rw, rh) = roi.dimensions();

        // Radial statistics about the ROI center.
        let (circle_count, radial_var, radial_mean, radial_std) =
            if rw > cfg.min_roi_side && rh > cfg.min_roi_side {
                let max_radius = (rw.min(rh) / 2) as f32;
                let profile = radial_profile(
                    &roi,
                    rw as f32 / 2.0,
                    rh as f32 / 2.0,
                    cfg.radial_start,
                    max_radius,
                    cfg.radial_step,
                    cfg.angular_samples,
                );
                if profile.len() >= cfg.min_radial_samples {
                    let var = variance(&profile);
                    let mean = profile.iter().sum::<f32>() / profile.len() as f32;
                    let bands = count_bands(&profile, cfg.band_delta_floor);
                    (bands as f32, var, mean, var.sqrt())
                } else {
                    (0.0, 0.0, 0.0, 0.0)
                }
            } else {
                (0.0, 0.0, 0.0, 0.0)
            };

        // Edge density.
        let edges = imageproc::edges::canny(&roi, cfg.canny_low, cfg.canny_high);
        let edge_pixels = edges.pixels().filter(|p| p.0[0] > 0).count();
        let edge_density = edge_pixels as f32 / (rw * rh) as f32;

        // Texture statistics on raw ROI intensities.
        let n = (rw * rh) as f32;
        let texture_mean = roi.pixels().map(|p| f32::from(p.0[0])).sum::<f32>() / n;
        let texture_var = roi
            .pixels()
            .map(|p| (f32::from(p.0[0]) - texture_mean).powi(2))
            .sum::<f32>()
            / n;

        // Gradient magnitude statistics.
        let gx = imageproc::gradients::horizontal_sobel(&roi);
        let gy = imageproc::gradients::vertical_sobel(&roi);
        let mut grad_sum = 0.0f32;
        let mut grad_sq_sum = 0.0f32;
        for (px, py) in gx.pixels().zip(gy.pixels()) {
            let gxv = f32::from(px.0[0]);
            let gyv = f32::from(py.0[0]);
            let mag = (gxv * gxv + gyv * gyv).sqrt();
            grad_sum += mag;
            grad_sq_sum += mag * mag;
        }
        let grad_mean = grad_sum / n;
        let grad_std = (grad_sq_sum / n - grad_mean * grad_mean).max(0.0).sqrt();

        // Frequency-domain statistics.
        let (freq_mean, freq_std) = spectrum::magnitude_stats(&roi);

        FeatureVector {
            circle_count,
            radial_var,
            radial_mean,
            radial_std,
            edge_density,
            texture_var,
            texture_mean,
            grad_mean,
            grad_std,
            freq_mean,
            freq_std,
        }
    }
}

/// Center one-third box of the image.
fn center_roi(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let half = w.min(h) / 3;
    let cx = w / 2;
    let cy = h / 2;
    let x1 = cx.saturating_sub(half);
    let y1 = cy.saturating_sub(half);
    let x2 = (cx + half).min(w);
    let y2 = (cy + half).min(h);
    image::imageops::crop_imm(gray, x1, y1, (x2 - x1).max(1), (y2 - y1).max(1)).to_image()
}

/// Self-contained 2-D spectral transform.
///
/// No FFT crate in the stack; a radix-2 transform over the power-of-two
/// padded region is sufficient for spectral mean/std features.
mod spectrum {
    use image::GrayImage;

    /// Mean and standard deviation of the 2-D magnitude spectrum.
    pub fn magnitude_stats(roi: &GrayImage) -> (f32, f32) {
        let (w, h) = roi.dimensions();
        if w < 2 || h < 2 {
            return (0.0, 0.0);
        }
        let nw = (w as usize).next_power_of_two();
        let nh = (h as usize).next_power_of_two();

        let mut re = vec![0.0f32; nw * nh];
        let mut im = vec![0.0f32; nw * nh];
        for (x, y, pixel) in roi.enumerate_pixels() {
            re[y as usize * nw + x as usize] = f32::from(pixel.0[0]);
        }

        // Row transforms.
        for row in 0..nh {
            let start = row * nw;
            fft_in_place(&mut re[start..start + nw], &mut im[start..start + nw]);
        }

        // Column transforms through a gather/scatter buffer.
        let mut col_re = vec![0.0f32; nh];
        let mut col_im = vec![0.0f32; nh];
        for col in 0..nw {
            for row in 0..nh {
                col_re[row] = re[row * nw + col];
                col_im[row] = im[row * nw + col];
            }
            fft_in_place(&mut col_re, &mut col_im);
            for row in 0..nh {
                re[row * nw + col] = col_re[row];
                im[row * nw + col] = col_im[row];
            }
        }

        let n = (nw * nh) as f32;
        let mut sum = 0.0f32;
        let mut sq_sum = 0.0f32;
        for i in 0..nw * nh {
            let mag = (re[i] * re[i] + im[i] * im[i]).sqrt();
            sum += mag;
            sq_sum += mag * mag;
        }
        let mean = sum / n;
        let std = (sq_sum / n - mean * mean).max(0.0).sqrt();
        (mean, std)
    }

    /// Iterative radix-2 Cooley-Tukey transform; length must be a power of
    /// two.
    fn fft_in_place(re: &mut [f32], im: &mut [f32]) {
        let n = re.len();
        debug_assert!(n.is_power_of_two());
        if n < 2 {
            return;
        }

        // Bit-reversal permutation.
        let mut j = 0usize;
        for i in 1..n {
            let mut bit = n >> 1;
            while j & bit != 0 {
                j ^= bit;
                bit >>= 1;
            }
            j |= bit;
            if i < j {
                re.swap(i, j);
                im.swap(i, j);
            }
        }

        let mut len = 2usize;
        while len <= n {
            let angle = -std::f32::consts::TAU / len as f32;
            let (step_re, step_im) = (angle.cos(), angle.sin());
            let mut base = 0usize;
            while base < n {
                let mut w_re = 1.0f32;
                let mut w_im = 0.0f32;
                for k in 0..len / 2 {
                    let a = base + k;
                    let b = a + len / 2;
                    let t_re = re[b] * w_re - im[b] * w_im;
                    let t_im = re[b] * w_im + im[b] * w_re;
                    re[b] = re[a] - t_re;
                    im[b] = im[a] - t_im;
                    re[a] += t_re;
                    im[a] += t_im;
                    let next_re = w_re * step_re - w_im * step_im;
                    w_im = w_re * step_im + w_im * step_re;
                    w_re = next_re;
                }
                base += len;
            }
            len <<= 1;
        }
    }

}
