#[cfg(feature = "onnx")]
mod onnx;
mod preprocess;
pub mod types;

#[cfg(feature = "onnx")]
pub use onnx::OnnxDepthModel;
pub use types::{BackendKind, DepthModel, Prediction};

use anyhow::Result;
use std::path::Path;

/// Runtime knobs for model sessions
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
pub struct ModelOptions {
    pub threads: usize,
    pub cuda: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            cuda: false,
        }
    }
}

/// Load the configured depth model
///
/// A missing file is reported before the runtime is touched.
pub fn create_model(model_path: &Path, kind: BackendKind, options: &ModelOptions) -> Result<Box<dyn DepthModel>> {
    if !model_path.exists() {
        anyhow::bail!("Model not found at {}", model_path.display());
    }

    load(model_path, kind, options)
}

#[cfg(feature = "onnx")]
fn load(model_path: &Path, kind: BackendKind, options: &ModelOptions) -> Result<Box<dyn DepthModel>> {
    let model = OnnxDepthModel::new(model_path, kind, options)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "onnx"))]
fn load(_model_path: &Path, _kind: BackendKind, _options: &ModelOptions) -> Result<Box<dyn DepthModel>> {
    anyhow::bail!("No model runtime compiled in; rebuild with the `onnx` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_reported() {
        let err = create_model(
            Path::new("/nonexistent/depth_pro.onnx"),
            BackendKind::InverseDepth,
            &ModelOptions::default(),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("Model not found"));
    }
}
