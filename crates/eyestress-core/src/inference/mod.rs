//! Learned scoring artifacts, built on Candle.
//!
//! Ships the crate's two reference artifacts:
//! - [`FeatureMlp`]: shallow scorer over the 11-column feature vector,
//! - [`DualStreamNet`]: dual-stream fusion network with a learnable blend
//!   gate.
//!
//! Weight files load once via [`LazyArtifact`] and stay read-only; the
//! pipeline only ever sees the scorer traits.

mod device;
mod feature_net;
mod fusion_net;
mod loader;
mod utils;

pub use device::inference_device;
pub use feature_net::FeatureMlp;
pub use fusion_net::DualStreamNet;
pub use loader::{load_safetensors, LazyArtifact};
pub use utils::sigmoid;
