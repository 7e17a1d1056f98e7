//! Weight loading for safetensors scoring artifacts.
//!
//! Artifact lifecycle is the initialization collaborator's responsibility:
//! weights load once at process start and stay read-only. [`LazyArtifact`]
//! defers that load to first use so a deployment that never takes the
//! fusion path never pays for it.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use once_cell::sync::OnceCell;
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// A lazily-loaded scoring artifact.
pub struct LazyArtifact<T> {
    path: std::path::PathBuf,
    device: Device,
    builder: fn(VarBuilder) -> Result<T>,
    artifact: OnceCell<T>,
}

impl<T: Send + Sync> LazyArtifact<T> {
    /// Registers an artifact without loading it.
    #[must_use]
    pub fn new(path: impl AsRef<Path>, device: Device, builder: fn(VarBuilder) -> Result<T>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            device,
            builder,
            artifact: OnceCell::new(),
        }
    }

    /// Returns the artifact, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns an error when the weight file cannot be read, the
    /// safetensors payload is invalid, or the builder rejects the weights.
    pub fn get(&self) -> Result<&T> {
        self.artifact.get_or_try_init(|| {
            debug!("Loading artifact from {}", self.path.display());
            let vb = load_safetensors(&self.path, &self.device)?;
            (self.builder)(vb)
        })
    }

    /// True once the artifact has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.artifact.get().is_some()
    }
}

/// Reads a safetensors file into a `VarBuilder` on the given device.
///
/// # Errors
///
/// Returns an error when the file cannot be read or the payload does not
/// parse as safetensors.
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Loading safetensors from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read weight file: {}", path.display()))?;

    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let mut tensor_map: HashMap<String, Tensor> = HashMap::new();
    for name in tensors.names() {
        let view = tensors
            .tensor(name)
            .with_context(|| format!("Failed to get tensor '{name}'"))?;

        let dtype = tensor_dtype(view.dtype())?;
        let shape: Vec<usize> = view.shape().to_vec();
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, &shape, device)
            .with_context(|| format!("Failed to create tensor '{name}'"))?;
        tensor_map.insert(name.to_string(), tensor);
    }

    Ok(VarBuilder::from_tensors(tensor_map, DType::F32, device))
}

fn tensor_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        S::I64 => Ok(DType::I64),
        S::U8 => Ok(DType::U8),
        S::U32 => Ok(DType::U32),
        other => anyhow::bail!("Unsupported dtype: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[allow(clippy::expect_used)]
    fn write_test_weights() -> NamedTempFile {
        use safetensors::serialize;
        use safetensors::tensor::TensorView;

        let data: Vec<f32> = vec![0.5, -0.5, 1.0, 0.0];
        let bytes: &[u8] = bytemuck::cast_slice(&data);
        let view = TensorView::new(safetensors::Dtype::F32, vec![2, 2], bytes)
            .expect("valid tensor view");

        let tensors = HashMap::from([("gate.weight".to_string(), view)]);
        let serialized = serialize(&tensors, &None).expect("serialize");

        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&serialized).expect("write");
        file
    }

    #[test]
    fn test_load_safetensors_roundtrip() {
        let file = write_test_weights();
        let result = load_safetensors(file.path(), &Device::Cpu);
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_safetensors_missing_file() {
        let result = load_safetensors("/nonexistent/weights.safetensors", &Device::Cpu);
        assert!(result.is_err());
    }

    #[test]
    fn test_lazy_artifact_defers_load() {
        struct Marker;
        fn build(_vb: VarBuilder) -> Result<Marker> {
            Ok(Marker)
        }

        let file = write_test_weights();
        let lazy = LazyArtifact::new(file.path(), Device::Cpu, build);
        assert!(!lazy.is_loaded());
        assert!(lazy.get().is_ok());
        assert!(lazy.is_loaded());
    }
}
