use super::preprocess::Preprocessor;
use super::{BackendKind, DepthModel, ModelOptions, Prediction};
use crate::depth::DepthOutput;
use anyhow::{Context, Result};
use image::RgbImage;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

/// Output names used by the known Depth Pro exports, in order of preference
const DEPTH_OUTPUTS: &[&str] = &["depth", "predicted_depth"];
const FOCAL_OUTPUTS: &[&str] = &["focallength_px", "focal_length_px"];

/// Depth model running on ONNX Runtime
///
/// The same graph wrapper serves both backend kinds; only the preprocessing
/// constants and the meaning of the depth output differ.
pub struct OnnxDepthModel {
    session: Session,
    preprocessor: Preprocessor,
    kind: BackendKind,
    input_name: String,
    depth_output: String,
    focal_output: Option<String>,
}

impl OnnxDepthModel {
    /// Create a new model from an ONNX file
    pub fn new<P: AsRef<Path>>(model_path: P, kind: BackendKind, options: &ModelOptions) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading {:?} model from {}", kind, path.display());

        let builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(options.threads)?;
        let builder = if options.cuda { with_cuda(builder)? } else { builder };

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("Model has no inputs")?;

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let depth_output = DEPTH_OUTPUTS
            .iter()
            .find(|name| output_names.contains(*name))
            .or(output_names.first())
            .map(|name| name.to_string())
            .context("Model has no outputs")?;

        let focal_output = match kind {
            BackendKind::MetricDepth => FOCAL_OUTPUTS
                .iter()
                .find(|name| output_names.contains(*name))
                .map(|name| name.to_string()),
            BackendKind::InverseDepth => None,
        };

        tracing::info!(
            "Model loaded: input={}, depth output={}, focal output={:?}",
            input_name,
            depth_output,
            focal_output
        );

        let (width, height) = kind.input_size();
        let (mean, std) = kind.normalization();

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(width, height, mean, std),
            kind,
            input_name,
            depth_output,
            focal_output,
        })
    }
}

#[cfg(feature = "cuda")]
fn with_cuda(builder: SessionBuilder) -> Result<SessionBuilder> {
    tracing::info!("Enabling CUDA execution provider");
    Ok(builder.with_execution_providers([
        ort::execution_providers::CUDAExecutionProvider::default()
            .with_device_id(0)
            .build()
            .error_on_failure(),
    ])?)
}

#[cfg(not(feature = "cuda"))]
fn with_cuda(_builder: SessionBuilder) -> Result<SessionBuilder> {
    anyhow::bail!("CUDA requested but this build was compiled without the `cuda` feature")
}

impl DepthModel for OnnxDepthModel {
    fn predict(&mut self, image: &RgbImage) -> Result<Prediction> {
        let _span = tracing::debug_span!("onnx_predict").entered();

        let input_tensor = self.preprocessor.preprocess(image);

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![
                self.input_name.as_str() => TensorRef::from_array_view(input_tensor.view())?
            ])
            .context("Inference failed")?;
        drop(_infer_span);

        let depth = outputs[self.depth_output.as_str()]
            .try_extract_array::<f32>()
            .with_context(|| format!("Output {} is not an f32 tensor", self.depth_output))?
            .into_owned();

        let focal_length_px = match &self.focal_output {
            Some(name) => outputs[name.as_str()]
                .try_extract_array::<f32>()
                .with_context(|| format!("Output {} is not an f32 tensor", name))?
                .iter()
                .next()
                .copied(),
            None => None,
        };

        tracing::debug!("Raw depth output shape {:?}", depth.shape());

        Ok(Prediction {
            depth,
            focal_length_px,
        })
    }

    fn output_kind(&self) -> DepthOutput {
        self.kind.output_kind()
    }

    fn input_size(&self) -> (u32, u32) {
        self.kind.input_size()
    }
}
