//! Eye geometry and image input types.

use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Per-pixel channel difference above which an image counts as color.
///
/// Grayscale photographs re-encoded as three-channel JPEGs carry small
/// compression artifacts between channels, so exact equality is too strict.
const CHANNEL_TOLERANCE: i16 = 2;

/// A decoded image handed to the pipeline by the transport layer.
///
/// Immutable once constructed; each pipeline invocation owns exactly one.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Source label (file path or transport-assigned name).
    pub path: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Decoded pixel data.
    pub image: DynamicImage,
}

impl ImageInfo {
    /// Creates an `ImageInfo` from a decoded image, caching its dimensions.
    #[must_use]
    pub fn new(path: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            path: path.into(),
            width: image.width(),
            height: image.height(),
            image,
        }
    }

    /// Returns the image as 8-bit grayscale.
    #[must_use]
    pub fn to_luma8(&self) -> GrayImage {
        self.image.to_luma8()
    }

    /// Returns the image as 8-bit RGB.
    #[must_use]
    pub fn to_rgb8(&self) -> RgbImage {
        self.image.to_rgb8()
    }
}

/// Chromatic content of an input image.
///
/// Selects which detector strategy runs. `Unknown` means the buffer is
/// degenerate and must be treated as a hard failure by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// Channels carry independent information.
    Color,
    /// Single channel, or channels numerically identical within tolerance.
    Grayscale,
    /// Empty or undecodable buffer.
    Unknown,
}

/// Decides whether an image carries color or grayscale content.
///
/// Three-channel buffers whose channels agree within a small tolerance are
/// grayscale content saved in a color container and are classified as such.
#[must_use]
pub fn classify_image_kind(info: &ImageInfo) -> ImageKind {
    if info.width == 0 || info.height == 0 {
        return ImageKind::Unknown;
    }

    match &info.image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => ImageKind::Grayscale,
        other => {
            let rgb = other.to_rgb8();
            let is_color = rgb.pixels().any(|p| {
                let [r, g, b] = p.0;
                (i16::from(r) - i16::from(g)).abs() > CHANNEL_TOLERANCE
                    || (i16::from(g) - i16::from(b)).abs() > CHANNEL_TOLERANCE
            });
            if is_color {
                ImageKind::Color
            } else {
                ImageKind::Grayscale
            }
        }
    }
}

/// A circular eye structure (pupil or iris) located in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeStructure {
    /// Center (x, y) in image pixel coordinates.
    pub center: (f32, f32),
    /// Radius in pixels.
    pub radius: f32,
}

impl EyeStructure {
    /// Creates a structure from center and radius.
    #[must_use]
    pub const fn new(center: (f32, f32), radius: f32) -> Self {
        Self { center, radius }
    }

    /// Diameter in pixels.
    #[must_use]
    pub fn diameter(&self) -> f32 {
        2.0 * self.radius
    }
}
