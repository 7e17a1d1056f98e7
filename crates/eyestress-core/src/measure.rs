//! Pupil measurement and plausibility validation.
//!
//! Calibration is resolution independent: the adult iris has a nearly
//! constant physical diameter, so the detected iris radius fixes the
//! pixel-to-millimetre scale for the whole image.

/// Reference physical iris diameter in millimetres.
pub const IRIS_REFERENCE_DIAMETER_MM: f32 = 12.0;

/// Physiologically plausible pupil diameter range in millimetres.
pub const MIN_PLAUSIBLE_DIAMETER_MM: f32 = 2.0;
pub const MAX_PLAUSIBLE_DIAMETER_MM: f32 = 8.0;

/// Calibrated pupil size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PupilMeasurement {
    /// Pupil diameter in pixels.
    pub diameter_px: f32,
    /// Pupil diameter in millimetres.
    pub diameter_mm: f32,
    /// Pixel-to-millimetre conversion factor.
    pub pixels_per_mm: f32,
}

/// Converts pixel radii into a calibrated pupil diameter.
#[must_use]
pub fn measure_pupil(pupil_radius_px: f32, iris_radius_px: f32) -> PupilMeasurement {
    let pixels_per_mm = (2.0 * iris_radius_px) / IRIS_REFERENCE_DIAMETER_MM;
    let diameter_px = 2.0 * pupil_radius_px;
    let diameter_mm = if pixels_per_mm > 0.0 {
        diameter_px / pixels_per_mm
    } else {
        0.0
    };
    PupilMeasurement {
        diameter_px,
        diameter_mm,
        pixels_per_mm,
    }
}

/// Flags diameters outside the plausible range as suspect.
///
/// Advisory only: the verdict travels with the measurements and never aborts
/// the pipeline.
#[must_use]
pub fn validate_diameter(diameter_mm: f32) -> (bool, String) {
    if (MIN_PLAUSIBLE_DIAMETER_MM..=MAX_PLAUSIBLE_DIAMETER_MM).contains(&diameter_mm) {
        (
            true,
            format!("diameter {diameter_mm:.2} mm within plausible range"),
        )
    } else {
        (
            false,
            format!(
                "diameter {diameter_mm:.2} mm outside plausible range \
                 ({MIN_PLAUSIBLE_DIAMETER_MM:.1}-{MAX_PLAUSIBLE_DIAMETER_MM:.1} mm)"
            ),
        )
    }
}
