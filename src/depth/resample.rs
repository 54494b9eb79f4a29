use super::surface::DepthSurface;
use image::{imageops, ImageBuffer, Luma};
use ndarray::Array2;

/// Integer range used by the image-domain fallback
const QUANT_SCALE: f32 = 65535.0;

/// How a surface is brought from model resolution to image resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ResampleMethod {
    /// Order-1 interpolation directly on the float surface, no prefilter
    Bilinear,
    /// Quantize to u16, Lanczos3 resize in the image domain, dequantize
    Lanczos,
}

/// Spatial resampler for depth surfaces
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    method: ResampleMethod,
}

impl Resampler {
    pub fn new(method: ResampleMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> ResampleMethod {
        self.method
    }

    /// Resize `surface` to `height` x `width`
    ///
    /// Returns the input untouched when it already has the target shape.
    pub fn resample(&self, surface: DepthSurface, height: usize, width: usize) -> DepthSurface {
        let _span = tracing::debug_span!("resample").entered();

        if surface.dim() == (height, width) {
            return surface;
        }

        match self.method {
            ResampleMethod::Bilinear => bilinear(&surface, height, width),
            ResampleMethod::Lanczos => lanczos(&surface, height, width),
        }
    }
}

/// Source sample for one output index along an axis: (lower, upper, weight of upper)
///
/// Corner-aligned, so the first and last output samples land exactly on the
/// first and last input samples.
fn axis_samples(in_len: usize, out_len: usize) -> Vec<(usize, usize, f32)> {
    let step = if out_len > 1 {
        (in_len - 1) as f64 / (out_len - 1) as f64
    } else {
        0.0
    };

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let lower = (pos.floor() as usize).min(in_len - 1);
            let upper = (lower + 1).min(in_len - 1);
            (lower, upper, (pos - lower as f64) as f32)
        })
        .collect()
}

fn bilinear(surface: &DepthSurface, height: usize, width: usize) -> DepthSurface {
    let (in_height, in_width) = surface.dim();
    let rows = axis_samples(in_height, height);
    let cols = axis_samples(in_width, width);

    Array2::from_shape_fn((height, width), |(y, x)| {
        let (y0, y1, fy) = rows[y];
        let (x0, x1, fx) = cols[x];
        let top = surface[[y0, x0]] * (1.0 - fx) + surface[[y0, x1]] * fx;
        let bottom = surface[[y1, x0]] * (1.0 - fx) + surface[[y1, x1]] * fx;
        top * (1.0 - fy) + bottom * fy
    })
}

fn lanczos(surface: &DepthSurface, height: usize, width: usize) -> DepthSurface {
    let (in_height, in_width) = surface.dim();

    let min = surface.iter().copied().fold(f32::INFINITY, f32::min);
    let max = surface.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    // Flat surfaces would divide by zero
    let range = if max > min { max - min } else { 1.0 };

    let quantized: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(in_width as u32, in_height as u32, |x, y| {
            let normalized = (surface[[y as usize, x as usize]] - min) / range;
            Luma([(normalized * QUANT_SCALE) as u16])
        });

    let resized = imageops::resize(
        &quantized,
        width as u32,
        height as u32,
        imageops::FilterType::Lanczos3,
    );

    Array2::from_shape_fn((height, width), |(y, x)| {
        let value = resized.get_pixel(x as u32, y as u32)[0] as f32 / QUANT_SCALE;
        value * range + min
    })
}
