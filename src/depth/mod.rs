mod convert;
mod region;
mod resample;
mod surface;

pub use convert::{estimate_focal_length, to_meters, DepthOutput};
pub use region::{summarize_regions, BoundingBox, RegionDepth};
pub use resample::{ResampleMethod, Resampler};
pub use surface::normalize_output;

#[cfg(test)]
pub use convert::{inverse_depth_scale, EPSILON};
