//! Test support utilities for eyestress.
//!
//! Provides synthetic eye-image builders shared by unit and integration
//! tests of the analysis pipeline.
//!
//! # Example
//!
//! ```
//! use eyestress_test_support::SyntheticEyeBuilder;
//!
//! let plain = SyntheticEyeBuilder::plain_eye();
//! let stressed = SyntheticEyeBuilder::ringed_eye();
//! ```

mod builders;

pub use builders::{SyntheticEyeBuilder, IRIS_RADIUS, PUPIL_RADIUS};
