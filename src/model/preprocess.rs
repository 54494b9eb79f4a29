use image::{imageops, RgbImage};
use ndarray::Array4;

/// Preprocessor for converting RGB images to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32, mean: [f32; 3], std: [f32; 3]) -> Self {
        Self {
            target_width,
            target_height,
            mean,
            std,
        }
    }

    /// Preprocess an RGB image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions (Lanczos3)
    /// 2. Convert to float in [0, 1], then apply per-channel mean/std
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized;
        let source = if image.dimensions() != (self.target_width, self.target_height) {
            resized = imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Lanczos3,
            );
            &resized
        } else {
            image
        };

        let (width, height) = source.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in source.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (value - self.mean[c]) / self.std[c];
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn produces_nchw_at_target_size() {
        let pre = Preprocessor::new(32, 24, [0.0; 3], [1.0; 3]);
        let image = RgbImage::from_pixel(100, 50, Rgb([255, 0, 255]));

        let tensor = pre.preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 3, 24, 32]);
    }

    #[test]
    fn applies_channel_normalization() {
        let pre = Preprocessor::new(4, 4, [0.5; 3], [0.5; 3]);
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 51]));

        let tensor = pre.preprocess(&image);
        assert!((tensor[[0, 0, 2, 3]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 0, 0]] + 1.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 1, 1]] + 0.6).abs() < 1e-6);
    }
}
