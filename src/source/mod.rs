mod file;

pub use file::FileSource;

use anyhow::Result;
use image::RgbImage;
use std::path::Path;

/// Trait for image sources
pub trait ImageSource {
    /// Load and decode the image at `path` as RGB
    fn load(&mut self, path: &Path) -> Result<RgbImage>;
}
