// ============================================================
// Layer 5 — Enhancer (Inference)
// ============================================================
// Rebuilds the network from train_config.json, loads the latest
// weights and runs single images through it on the inner backend
// (no autodiff, BatchNorm uses running estimates).
//
//   any-size image → resize to R×R → model → resize back → image

use anyhow::{anyhow, Result};
use burn::prelude::*;
use image::{imageops::FilterType, DynamicImage};

use crate::data::preprocessor::{to_dynamic_image, ImagePreprocessor};
use crate::domain::image_pair::FloatImage;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::backend::{default_device, Device, InnerBackend};
use crate::ml::model::LlieModel;

pub struct Enhancer<B: Backend = InnerBackend> {
    model:        LlieModel<B>,
    preprocessor: ImagePreprocessor,
    device:       B::Device,
}

impl Enhancer<InnerBackend> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        let device: Device = default_device();
        let cfg   = ckpt_manager.load_config()?;
        let model = cfg.model_config().init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, cfg.preprocessor(), device))
    }
}

impl<B: Backend> Enhancer<B> {
    pub fn new(model: LlieModel<B>, preprocessor: ImagePreprocessor, device: B::Device) -> Self {
        Self { model, preprocessor, device }
    }

    /// Enhance one image; the result has the input's dimensions.
    pub fn enhance(&self, img: &DynamicImage) -> Result<DynamicImage> {
        let input = self.preprocessor.convert(img)?;
        let [channels, height, width] = input.shape();

        let tensor = Tensor::<B, 1>::from_floats(input.pixels.as_slice(), &self.device)
            .reshape([1, channels, height, width]);
        let output = self.model.forward(tensor);

        let pixels = output
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read model output: {e:?}"))?;
        let enhanced = to_dynamic_image(&FloatImage::new(channels, height, width, pixels))?;

        Ok(enhanced.resize_exact(img.width(), img.height(), FilterType::Triangle))
    }
}
