use super::surface::DepthSurface;

/// Guard against division by zero in the inverse-depth conversion
pub const EPSILON: f32 = 1e-6;

/// Plausible working range for close-range manipulation, in meters
pub const MIN_DEPTH_M: f32 = 0.05;
pub const MAX_DEPTH_M: f32 = 5.0;

/// Meters of depth scale per pixel of image diagonal.
/// Uncalibrated heuristic; kept as-is for compatibility with existing consumers.
const SCALE_PER_DIAGONAL_PX: f64 = 0.001;

/// Native unit of a backend's depth output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthOutput {
    /// Inverse depth normalized to [0, 1], higher is closer
    NormalizedInverse,
    /// Depth already expressed in meters
    Metric,
}

fn diagonal(width: usize, height: usize) -> f64 {
    ((width * width + height * height) as f64).sqrt()
}

/// Scale factor applied to normalized inverse depth for an image of this size
pub fn inverse_depth_scale(width: usize, height: usize) -> f64 {
    diagonal(width, height) * SCALE_PER_DIAGONAL_PX
}

/// Approximate focal length in pixels for an uncalibrated camera
pub fn estimate_focal_length(width: usize, height: usize) -> f64 {
    diagonal(width, height) / std::f64::consts::SQRT_2
}

/// Convert a surface at image resolution into meters
///
/// The image size is taken from the surface itself, so this must run after
/// resampling. Every output value lies in `[MIN_DEPTH_M, MAX_DEPTH_M]`;
/// NaN inputs are treated as "as far as possible".
pub fn to_meters(mut surface: DepthSurface, output: DepthOutput) -> DepthSurface {
    match output {
        DepthOutput::NormalizedInverse => {
            let (height, width) = surface.dim();
            let scale = inverse_depth_scale(width, height) as f32;

            surface.mapv_inplace(|v| {
                let v = if v.is_nan() { EPSILON } else { v.clamp(EPSILON, 1.0 - EPSILON) };
                (scale / (v + EPSILON)).clamp(MIN_DEPTH_M, MAX_DEPTH_M)
            });
        }
        DepthOutput::Metric => {
            surface.mapv_inplace(|v| {
                if v.is_nan() {
                    MAX_DEPTH_M
                } else {
                    v.clamp(MIN_DEPTH_M, MAX_DEPTH_M)
                }
            });
        }
    }

    surface
}
