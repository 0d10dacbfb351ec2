// ============================================================
// Layer 5 — Attention Blocks
// ============================================================
// Shape-preserving re-weighting transforms used by the bottleneck.
// Every block maps [batch, C, H, W] → [batch, C, H, W].
//
//   ChannelAttention — squeezes H×W with avg + max pooling, runs
//                      both through a shared 1×1 MLP and scales
//                      each channel by sigmoid(avg + max)
//   SpatialAttention — squeezes C with mean + max, runs a 7×7
//                      conv over the 2-channel map and scales
//                      each pixel by the sigmoid of the result
//   Cbam             — channel attention followed by spatial
//   NonLocalBlock    — embedded-gaussian self-attention across
//                      all H×W positions with a residual add
//
// Reference: Woo et al. (2018) CBAM
//            Wang et al. (2018) Non-local Neural Networks

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::activation::{sigmoid, softmax},
};

/// Hidden width of the channel MLP is channels / reduction.
const CHANNEL_REDUCTION: usize = 16;
const SPATIAL_KERNEL: usize = 7;

// ─── Channel Attention ────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ChannelAttention<B: Backend> {
    fc1:        Conv2d<B>,
    fc2:        Conv2d<B>,
    activation: Relu,
}

impl<B: Backend> ChannelAttention<B> {
    pub fn new(channels: usize, device: &B::Device) -> Self {
        let hidden = (channels / CHANNEL_REDUCTION).max(1);
        Self {
            fc1: Conv2dConfig::new([channels, hidden], [1, 1])
                .with_bias(false)
                .init(device),
            fc2: Conv2dConfig::new([hidden, channels], [1, 1])
                .with_bias(false)
                .init(device),
            activation: Relu::new(),
        }
    }

    fn mlp(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        self.fc2.forward(x)
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        // [B, C, H, W] → [B, C, 1, 1]
        let avg = x.clone().mean_dim(2).mean_dim(3);
        let max = x.clone().max_dim(2).max_dim(3);

        let weights = sigmoid(self.mlp(avg) + self.mlp(max));
        x.mul(weights)
    }
}

// ─── Spatial Attention ────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct SpatialAttention<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> SpatialAttention<B> {
    pub fn new(device: &B::Device) -> Self {
        let pad = SPATIAL_KERNEL / 2;
        Self {
            conv: Conv2dConfig::new([2, 1], [SPATIAL_KERNEL, SPATIAL_KERNEL])
                .with_padding(PaddingConfig2d::Explicit(pad, pad))
                .with_bias(false)
                .init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        // [B, C, H, W] → [B, 1, H, W] each
        let avg = x.clone().mean_dim(1);
        let max = x.clone().max_dim(1);

        let pooled  = Tensor::cat(vec![avg, max], 1);
        let weights = sigmoid(self.conv.forward(pooled));
        x.mul(weights)
    }
}

// ─── CBAM ─────────────────────────────────────────────────────────────────────
/// Convolutional block attention: channel re-weighting, then spatial.
#[derive(Module, Debug)]
pub struct Cbam<B: Backend> {
    channel: ChannelAttention<B>,
    spatial: SpatialAttention<B>,
}

impl<B: Backend> Cbam<B> {
    pub fn new(channels: usize, device: &B::Device) -> Self {
        Self {
            channel: ChannelAttention::new(channels, device),
            spatial: SpatialAttention::new(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.channel.forward(x);
        self.spatial.forward(x)
    }
}

// ─── Non-local Block ──────────────────────────────────────────────────────────
/// Embedded-gaussian non-local block.
///
/// Every output position is a softmax-weighted sum over all input
/// positions, projected back to `channels` and added to the input.
/// Cost is quadratic in H×W, so it only runs on the deepest map.
#[derive(Module, Debug)]
pub struct NonLocalBlock<B: Backend> {
    theta:   Conv2d<B>,
    phi:     Conv2d<B>,
    g:       Conv2d<B>,
    project: Conv2d<B>,
    norm:    BatchNorm<B, 2>,
    inter:   usize,
}

impl<B: Backend> NonLocalBlock<B> {
    pub fn new(channels: usize, device: &B::Device) -> Self {
        let inter = (channels / 2).max(1);
        let embed = |out: usize| Conv2dConfig::new([channels, out], [1, 1]).init(device);
        Self {
            theta:   embed(inter),
            phi:     embed(inter),
            g:       embed(inter),
            project: Conv2dConfig::new([inter, channels], [1, 1]).init(device),
            norm:    BatchNormConfig::new(channels).init(device),
            inter,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, _, height, width] = x.dims();
        let positions = height * width;

        // theta: [B, HW, inter]   phi, g: [B, inter, HW]
        let theta = self.theta.forward(x.clone())
            .reshape([batch, self.inter, positions])
            .swap_dims(1, 2);
        let phi = self.phi.forward(x.clone())
            .reshape([batch, self.inter, positions]);
        let g = self.g.forward(x.clone())
            .reshape([batch, self.inter, positions]);

        // Pairwise affinities, normalised over the attended positions
        let affinity = softmax(theta.matmul(phi), 2); // [B, HW, HW]

        // y[b, i] = Σ_j affinity[b, i, j] · g[b, j]
        let y = affinity
            .matmul(g.swap_dims(1, 2))            // [B, HW, inter]
            .swap_dims(1, 2)                      // [B, inter, HW]
            .reshape([batch, self.inter, height, width]);

        let z = self.norm.forward(self.project.forward(y));
        z + x
    }
}
