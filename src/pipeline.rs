use crate::depth::{
    estimate_focal_length, normalize_output, summarize_regions, to_meters, BoundingBox, Resampler,
};
use crate::error::DepthError;
use crate::model::DepthModel;
use crate::protocol::DepthReport;
use crate::source::ImageSource;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

/// Image path in, depth report out
///
/// Owns the loaded model for the lifetime of the service. Every buffer
/// created while processing a request is dropped before `process` returns.
pub struct DepthPipeline {
    model: Box<dyn DepthModel>,
    source: Box<dyn ImageSource>,
    resampler: Resampler,
}

impl DepthPipeline {
    pub fn new(model: Box<dyn DepthModel>, source: Box<dyn ImageSource>, resampler: Resampler) -> Self {
        Self {
            model,
            source,
            resampler,
        }
    }

    pub fn process(&mut self, image_path: &Path, boxes: &[BoundingBox]) -> Result<DepthReport> {
        let _span = tracing::debug_span!("process", path = %image_path.display()).entered();

        let load_start = Instant::now();
        let image = self.source.load(image_path)?;
        let (width, height) = (image.width() as usize, image.height() as usize);
        let load_time = load_start.elapsed();

        if width == 0 || height == 0 {
            return Err(DepthError::EmptySurface { height, width }.into());
        }

        let infer_start = Instant::now();
        let prediction = self.model.predict(&image).context("Depth inference failed")?;
        drop(image);
        let infer_time = infer_start.elapsed();

        let post_start = Instant::now();
        let surface = normalize_output(prediction.depth)?;
        let native = surface.dim();
        let surface = self.resampler.resample(surface, height, width);
        let depth = to_meters(surface, self.model.output_kind());

        let (input_width, _) = self.model.input_size();
        let focal_length_px = match prediction
            .focal_length_px
            .map(|f| f as f64 * width as f64 / input_width as f64)
        {
            Some(focal) if focal.is_finite() && focal > 0.0 => focal,
            Some(focal) => {
                tracing::warn!("Ignoring model focal length {}, using estimate", focal);
                estimate_focal_length(width, height)
            }
            None => estimate_focal_length(width, height),
        };

        let objects = if boxes.is_empty() {
            None
        } else {
            Some(summarize_regions(&depth, boxes))
        };
        let post_time = post_start.elapsed();

        tracing::debug!(
            "{}x{} (native {}x{}): load={:.1}ms, infer={:.1}ms, post={:.1}ms, boxes={}",
            width,
            height,
            native.1,
            native.0,
            load_time.as_secs_f64() * 1000.0,
            infer_time.as_secs_f64() * 1000.0,
            post_time.as_secs_f64() * 1000.0,
            boxes.len()
        );

        Ok(DepthReport {
            focal_length_px,
            depth_map_shape: [height, width],
            objects,
        })
    }
}
