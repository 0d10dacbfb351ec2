// ============================================================
// Layer 6 — Sample Image Writer
// ============================================================
// Persists enhanced validation outputs as PNG files so progress
// can be inspected by eye:
//
//   output_images/
//     output_10_1.png   ← epoch 10, first validation sample
//     output_10_2.png
//     output_20_1.png
//
// Writing samples is a diagnostic side effect; the trainer logs
// failures and keeps going.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::data::preprocessor::to_dynamic_image;
use crate::domain::image_pair::FloatImage;
use crate::domain::traits::SampleSink;

pub struct SampleWriter {
    dir: PathBuf,
}

impl SampleWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, epoch: usize, index: usize) -> PathBuf {
        self.dir.join(format!("output_{epoch}_{index}.png"))
    }
}

impl SampleSink for SampleWriter {
    fn save(&self, epoch: usize, index: usize, image: &FloatImage) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path = self.path_for(epoch, index);
        to_dynamic_image(image)?
            .save(&path)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Saved sample '{}'", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_png_named_by_epoch_and_index() {
        let dir    = tempfile::tempdir().unwrap();
        let writer = SampleWriter::new(dir.path().join("output_images"));
        writer.save(10, 2, &FloatImage::filled(3, 8, 8, 1.0)).unwrap();

        let path = dir.path().join("output_images").join("output_10_2.png");
        let img  = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.get_pixel(3, 3).0, [255, 255, 255]);
    }

    #[test]
    fn test_unwritable_directory_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, "not a directory").unwrap();

        let writer = SampleWriter::new(&file);
        assert!(writer.save(10, 1, &FloatImage::filled(3, 8, 8, 0.5)).is_err());
    }
}
