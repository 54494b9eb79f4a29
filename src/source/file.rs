use super::ImageSource;
use crate::error::DepthError;
use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;

/// Decodes images from the local filesystem
#[derive(Debug, Default)]
pub struct FileSource;

impl ImageSource for FileSource {
    fn load(&mut self, path: &Path) -> Result<RgbImage> {
        if !path.exists() {
            return Err(DepthError::ImageNotFound(path.to_path_buf()).into());
        }

        let decoded = image::open(path)
            .with_context(|| format!("Failed to decode image {}", path.display()))?
            .to_rgb8();

        tracing::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            decoded.width(),
            decoded.height()
        );

        Ok(decoded)
    }
}
