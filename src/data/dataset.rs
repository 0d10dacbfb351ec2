use anyhow::Result;
use burn::data::dataset::Dataset;

use crate::data::preprocessor::ImagePreprocessor;
use crate::domain::image_pair::{ImagePair, PairFiles};

/// Image pairs on disk, decoded one at a time in `get`.
///
/// Only paths stay resident; the DataLoader workers pay the decode
/// and resize cost while the loop is busy with the previous batch.
pub struct PairDataset {
    files:        Vec<PairFiles>,
    preprocessor: ImagePreprocessor,
}

impl PairDataset {
    pub fn new(files: Vec<PairFiles>, preprocessor: ImagePreprocessor) -> Self {
        Self { files, preprocessor }
    }

    pub fn sample_count(&self) -> usize { self.files.len() }

    /// [C, H, W] every item is resized to.
    pub fn sample_shape(&self) -> [usize; 3] {
        self.preprocessor.output_shape()
    }

    pub fn load(&self, files: &PairFiles) -> Result<ImagePair> {
        let input  = self.preprocessor.load(&files.low)?;
        let target = self.preprocessor.load(&files.high)?;
        Ok(ImagePair::new(files.name.clone(), input, target))
    }
}

impl Dataset<ImagePair> for PairDataset {
    /// # Panics
    /// Panics if a listed file can no longer be decoded. Headers were
    /// checked when the pairs were listed, so this is a corrupt or
    /// vanished file mid-run, which aborts training like any other
    /// error inside a batch.
    fn get(&self, index: usize) -> Option<ImagePair> {
        let files = self.files.get(index)?;
        let pair  = self
            .load(files)
            .unwrap_or_else(|err| panic!("Cannot load pair '{}': {err:#}", files.name));
        Some(pair)
    }

    fn len(&self) -> usize {
        self.files.len()
    }
}
