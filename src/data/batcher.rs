// ============================================================
// Layer 4 — Image Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to stack ImagePairs into
// device tensors.
//
// How batching works here:
//   Input:  Vec of N ImagePairs, each C×R×R planar floats
//   Output: PairBatch with two tensors of shape [N, C, R, R]
//
//   All pixel buffers are concatenated in order, then reshaped:
//   [p1_c1..., p1_c2..., ..., pN_cC...] → [N, C, R, R]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};
use std::marker::PhantomData;

use crate::domain::image_pair::ImagePair;

// ─── PairBatch ────────────────────────────────────────────────────────────────
/// A batch of (low-light, reference) images.
/// Both tensors have shape [batch_size, channels, height, width].
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    pub inputs:  Tensor<B, 4>,
    pub targets: Tensor<B, 4>,
}

impl<B: Backend> PairBatch<B> {
    pub fn len(&self) -> usize {
        self.inputs.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── PairBatcher ──────────────────────────────────────────────────────────────
/// Stateless batcher; the DataLoader supplies the device.
#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    _backend: PhantomData<B>,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new() -> Self {
        Self { _backend: PhantomData }
    }
}

impl<B: Backend> Batcher<B, ImagePair, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<ImagePair>, device: &B::Device) -> PairBatch<B> {
        let batch_size          = items.len();
        let [channels, h, w]    = items[0].shape();

        let inputs: Vec<f32> = items
            .iter()
            .flat_map(|p| p.input.pixels.iter().copied())
            .collect();
        let targets: Vec<f32> = items
            .iter()
            .flat_map(|p| p.target.pixels.iter().copied())
            .collect();

        let inputs = Tensor::<B, 1>::from_floats(inputs.as_slice(), device)
            .reshape([batch_size, channels, h, w]);
        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), device)
            .reshape([batch_size, channels, h, w]);

        PairBatch { inputs, targets }
    }
}
