use crate::depth::DepthOutput;
use anyhow::Result;
use image::RgbImage;
use ndarray::ArrayD;

/// Raw result of one forward pass
pub struct Prediction {
    /// Native output tensor; trailing two axes are the depth surface
    pub depth: ArrayD<f32>,

    /// Focal length the model estimated itself, in pixels at model input resolution
    pub focal_length_px: Option<f32>,
}

/// Trait for depth models
/// Allows swapping between backends with different native output conventions
pub trait DepthModel {
    /// Run the model on a full-resolution RGB image
    ///
    /// Implementations do their own resizing and normalization.
    fn predict(&mut self, image: &RgbImage) -> Result<Prediction>;

    /// Unit of the depth surface in [`Prediction::depth`]
    fn output_kind(&self) -> DepthOutput;

    /// Get the model's input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}

/// Depth model variants the service knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Depth Pro export emitting normalized inverse depth
    InverseDepth,
    /// Depth Pro export emitting metric depth and its own focal length
    MetricDepth,
}

#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
impl BackendKind {
    pub fn output_kind(self) -> DepthOutput {
        match self {
            BackendKind::InverseDepth => DepthOutput::NormalizedInverse,
            BackendKind::MetricDepth => DepthOutput::Metric,
        }
    }

    /// Square input resolution the exported graphs are traced at
    pub fn input_size(self) -> (u32, u32) {
        (1536, 1536)
    }

    /// Per-channel (mean, std) applied after scaling pixels to [0, 1]
    pub fn normalization(self) -> ([f32; 3], [f32; 3]) {
        ([0.5; 3], [0.5; 3])
    }
}
