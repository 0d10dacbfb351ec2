// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Converts decoded images into the network's input format and
// back again.
//
//   decode → resize to R×R (Triangle filter) → RGB or luma
//          → bytes / 255 → planar CHW FloatImage in [0, 1]
//
// The reverse direction (FloatImage → 8-bit DynamicImage) is
// used when persisting validation samples and enhanced images.
//
// Reference: image crate documentation (imageops::FilterType)

use anyhow::{bail, Context, Result};
use image::{imageops::FilterType, DynamicImage, GrayImage, ImageReader, RgbImage};
use std::path::Path;

use crate::domain::image_pair::FloatImage;

#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    /// Output side length; the network needs it divisible by 8
    resolution: usize,
    /// 3 = RGB, 1 = grayscale
    channels:   usize,
}

impl ImagePreprocessor {
    pub fn new(resolution: usize, channels: usize) -> Self {
        Self { resolution, channels }
    }

    /// [C, R, R] of every image this preprocessor produces.
    pub fn output_shape(&self) -> [usize; 3] {
        [self.channels, self.resolution, self.resolution]
    }

    /// Decode an image file and convert it.
    pub fn load(&self, path: &Path) -> Result<FloatImage> {
        let img = ImageReader::open(path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?
            .decode()
            .with_context(|| format!("Cannot decode '{}'", path.display()))?;
        self.convert(&img)
    }

    /// Resize to the square training resolution and normalise to [0, 1].
    pub fn convert(&self, img: &DynamicImage) -> Result<FloatImage> {
        let side    = self.resolution as u32;
        let resized = img.resize_exact(side, side, FilterType::Triangle);

        let bytes = match self.channels {
            1 => resized.to_luma8().into_raw(),
            3 => resized.to_rgb8().into_raw(),
            n => bail!("unsupported channel count {n} (expected 1 or 3)"),
        };

        Ok(FloatImage::from_interleaved_u8(
            self.channels,
            self.resolution,
            self.resolution,
            &bytes,
        ))
    }
}

/// FloatImage → 8-bit image (grayscale for 1 channel, RGB for 3).
pub fn to_dynamic_image(image: &FloatImage) -> Result<DynamicImage> {
    let (w, h) = (image.width as u32, image.height as u32);
    let raw    = image.to_interleaved_u8();

    match image.channels {
        1 => GrayImage::from_raw(w, h, raw)
            .map(DynamicImage::ImageLuma8)
            .context("pixel buffer too small for grayscale image"),
        3 => RgbImage::from_raw(w, h, raw)
            .map(DynamicImage::ImageRgb8)
            .context("pixel buffer too small for RGB image"),
        n => bail!("cannot encode an image with {n} channels"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_convert_resizes_and_normalises() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 12, Rgb([255, 0, 51])));
        let out = ImagePreprocessor::new(8, 3).convert(&img).unwrap();

        assert_eq!(out.shape(), [3, 8, 8]);
        // Planar layout: all red first, then green, then blue
        assert!(out.pixels[..64].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(out.pixels[64..128].iter().all(|&v| v.abs() < 1e-6));
        assert!(out.pixels[128..].iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_convert_to_grayscale() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 255, 255])));
        let out = ImagePreprocessor::new(16, 1).convert(&img).unwrap();
        assert_eq!(out.shape(), [1, 16, 16]);
        assert!(out.pixels.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_unsupported_channel_count_is_an_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        assert!(ImagePreprocessor::new(8, 2).convert(&img).is_err());
    }

    #[test]
    fn test_to_dynamic_image_round_trips_dimensions() {
        let float = FloatImage::filled(3, 6, 10, 0.5);
        let img   = to_dynamic_image(&float).unwrap();
        assert_eq!((img.width(), img.height()), (10, 6));
        assert_eq!(img.to_rgb8().get_pixel(0, 0), &Rgb([127, 127, 127]));
    }
}
