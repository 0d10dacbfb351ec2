// ============================================================
// Layer 5 — Enhancement Autoencoder
// ============================================================
// Encoder → Bottleneck → Decoder with additive skip connections.
//
//   stage   encoder (after pool)        decoder (after upsample)
//   1       C   @ R/2                   4C  @ R/8   (×1)
//   2       2C  @ R/4                   2C  @ R/4   (×2)
//   3       4C  @ R/8                   C   @ R/2   (×2)
//   4       8C  @ R/8  (no pool)        img @ R     (×2, sigmoid)
//
// Decoder stage i adds encoder skip 5-i before upsampling, so
// shapes line up only when R is divisible by 8.
//
// Two upsampling variants share everything else:
//   Transposed — learned ConvTranspose2d (3×3, stride = scale)
//   Bilinear   — fixed bilinear resize (see resize.rs), then a 3×3 Conv2d
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu, Sigmoid,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::ml::attention::{Cbam, NonLocalBlock};
use crate::ml::blocks::{ConvBlock, ResidualBlock};
use crate::ml::resize::bilinear_upsample;

/// Number of encoder (and decoder) stages.
pub const NUM_STAGES: usize = 4;

/// Total downsampling factor of the encoder (three ×2 max-pools).
pub const DOWNSAMPLE_FACTOR: usize = 8;

/// How decoder stages grow the spatial resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Upsampling {
    /// Learned 3×3 transposed convolution.
    Transposed,
    /// Parameterless bilinear interpolation followed by a 3×3 convolution.
    Bilinear,
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct LlieConfig {
    /// Channels of the input and output images.
    #[config(default = 3)]
    pub image_channels: usize,
    /// Width of the first encoder stage; stage k has base · 2^(k-1).
    #[config(default = 64)]
    pub base_channels: usize,
    pub upsampling: Upsampling,
    /// Refine the bottleneck with a non-local block after CBAM.
    #[config(default = true)]
    pub non_local: bool,
}

impl LlieConfig {
    /// Encoder stage widths, e.g. [64, 128, 256, 512].
    pub fn stage_channels(&self) -> [usize; NUM_STAGES] {
        let c = self.base_channels;
        [c, c * 2, c * 4, c * 8]
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> LlieModel<B> {
        LlieModel {
            encoder:    self.init_encoder(device),
            bottleneck: self.init_bottleneck(device),
            decoder:    self.init_decoder(device),
        }
    }

    fn init_encoder<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let channels = self.stage_channels();
        let inputs   = [self.image_channels, channels[0], channels[1], channels[2]];

        let stages = inputs
            .iter()
            .zip(channels.iter())
            .enumerate()
            .map(|(idx, (&c_in, &c_out))| EncoderStage {
                conv:     ConvBlock::new(c_in, c_out, device),
                residual: ResidualBlock::new(c_out, device),
                // The deepest stage keeps the resolution of stage 3
                pool: (idx + 1 < NUM_STAGES).then(|| {
                    MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init()
                }),
            })
            .collect();

        Encoder { stages }
    }

    fn init_bottleneck<B: Backend>(&self, device: &B::Device) -> Bottleneck<B> {
        let channels = self.stage_channels()[NUM_STAGES - 1];
        Bottleneck {
            cbam:      Cbam::new(channels, device),
            non_local: self.non_local.then(|| NonLocalBlock::new(channels, device)),
        }
    }

    fn init_decoder<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let [c1, c2, c3, c4] = self.stage_channels();

        // (in, out, scale) per stage, deepest first
        let plan = [
            (c4, c3, 1),
            (c3, c2, 2),
            (c2, c1, 2),
            (c1, self.image_channels, 2),
        ];

        let stages = plan
            .iter()
            .map(|&(c_in, c_out, scale)| DecoderStage {
                upsample: Upsampler::new(self.upsampling, c_in, c_out, scale, device),
                norm:     BatchNormConfig::new(c_out).init(device),
            })
            .collect();

        Decoder { stages, activation: Relu::new(), output: Sigmoid::new() }
    }
}

// ─── Skip Tensors ─────────────────────────────────────────────────────────────
/// Encoder features cached for the decoder.
///
/// Pushed once per encoder stage and popped in reverse by the decoder.
/// Created inside `LlieModel::forward` and dropped with it, so skip
/// tensors never outlive a single forward pass.
#[derive(Debug)]
pub struct SkipStack<B: Backend> {
    tensors: Vec<Tensor<B, 4>>,
}

impl<B: Backend> SkipStack<B> {
    pub fn new() -> Self {
        Self { tensors: Vec::with_capacity(NUM_STAGES) }
    }

    pub fn push(&mut self, tensor: Tensor<B, 4>) {
        self.tensors.push(tensor);
    }

    pub fn pop(&mut self) -> Option<Tensor<B, 4>> {
        self.tensors.pop()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl<B: Backend> Default for SkipStack<B> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderStage<B: Backend> {
    conv:     ConvBlock<B>,
    residual: ResidualBlock<B>,
    pool:     Option<MaxPool2d>,
}

impl<B: Backend> EncoderStage<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.residual.forward(x);
        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    stages: Vec<EncoderStage<B>>,
}

impl<B: Backend> Encoder<B> {
    /// Runs every stage and caches its (downsampled) output as a skip.
    /// Returns the deepest feature map.
    pub fn forward(&self, x: Tensor<B, 4>, skips: &mut SkipStack<B>) -> Tensor<B, 4> {
        let mut x = x;
        for stage in &self.stages {
            x = stage.forward(x);
            skips.push(x.clone());
        }
        x
    }
}

// ─── Bottleneck ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    cbam:      Cbam<B>,
    non_local: Option<NonLocalBlock<B>>,
}

impl<B: Backend> Bottleneck<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.cbam.forward(x);
        match &self.non_local {
            Some(block) => block.forward(x),
            None => x,
        }
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────
/// Bilinear ×scale followed by a 3×3 convolution.
#[derive(Module, Debug)]
pub struct BilinearConv<B: Backend> {
    scale: usize,
    conv:  Conv2d<B>,
}

/// Upsampling operator of one decoder stage, fixed at construction.
#[derive(Module, Debug)]
pub enum Upsampler<B: Backend> {
    Transposed(ConvTranspose2d<B>),
    Bilinear(BilinearConv<B>),
}

impl<B: Backend> Upsampler<B> {
    fn new(
        kind:         Upsampling,
        in_channels:  usize,
        out_channels: usize,
        scale:        usize,
        device:       &B::Device,
    ) -> Self {
        match kind {
            // out = (in - 1)·s - 2 + 3 + (s - 1) = in·s
            Upsampling::Transposed => Self::Transposed(
                ConvTranspose2dConfig::new([in_channels, out_channels], [3, 3])
                    .with_stride([scale, scale])
                    .with_padding([1, 1])
                    .with_padding_out([scale - 1, scale - 1])
                    .init(device),
            ),
            Upsampling::Bilinear => Self::Bilinear(BilinearConv {
                scale,
                conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device),
            }),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::Transposed(conv) => conv.forward(x),
            Self::Bilinear(block) => block.conv.forward(bilinear_upsample(x, block.scale)),
        }
    }
}

#[derive(Module, Debug)]
pub struct DecoderStage<B: Backend> {
    upsample: Upsampler<B>,
    norm:     BatchNorm<B, 2>,
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    stages:     Vec<DecoderStage<B>>,
    activation: Relu,
    output:     Sigmoid,
}

impl<B: Backend> Decoder<B> {
    /// Fuses one skip per stage (deepest first), upsamples and
    /// normalises; the last stage ends in a sigmoid.
    pub fn forward(&self, x: Tensor<B, 4>, skips: &mut SkipStack<B>) -> Tensor<B, 4> {
        let last  = self.stages.len() - 1;
        let mut x = x;

        for (idx, stage) in self.stages.iter().enumerate() {
            let skip = skips
                .pop()
                .expect("decoder stage has no matching encoder skip tensor");
            x = fuse(x, skip);

            x = stage.upsample.forward(x);
            x = stage.norm.forward(x);
            x = if idx == last {
                self.output.forward(x)
            } else {
                self.activation.forward(x)
            };
        }

        x
    }
}

/// Additive skip fusion. Mismatched shapes mean the network was wired
/// wrong, which is not recoverable.
fn fuse<B: Backend>(x: Tensor<B, 4>, skip: Tensor<B, 4>) -> Tensor<B, 4> {
    assert_eq!(
        x.dims(),
        skip.dims(),
        "skip tensor shape does not match decoder feature shape"
    );
    x + skip
}

// ─── Full Network ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct LlieModel<B: Backend> {
    pub encoder:    Encoder<B>,
    pub bottleneck: Bottleneck<B>,
    pub decoder:    Decoder<B>,
}

impl<B: Backend> LlieModel<B> {
    /// images: [batch, C, R, R] with R divisible by 8 → [batch, C, R, R] in [0, 1]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut skips = SkipStack::new();

        let features = self.encoder.forward(images, &mut skips);
        let features = self.bottleneck.forward(features);
        let output   = self.decoder.forward(features, &mut skips);

        debug_assert!(skips.is_empty(), "unconsumed skip tensors after decoding");
        output
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::test_rng;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn small_config(upsampling: Upsampling) -> LlieConfig {
        LlieConfig::new(upsampling).with_base_channels(4)
    }

    fn value_range(t: Tensor<TestBackend, 4>) -> (f32, f32) {
        let min = t.clone().min().into_scalar().elem::<f32>();
        let max = t.max().into_scalar().elem::<f32>();
        (min, max)
    }

    #[test]
    fn test_default_channel_progression() {
        let cfg = LlieConfig::new(Upsampling::Transposed);
        assert_eq!(cfg.stage_channels(), [64, 128, 256, 512]);
        assert_eq!(cfg.image_channels, 3);
        assert!(cfg.non_local);
    }

    #[test]
    fn test_output_shape_matches_input_for_both_variants() {
        let _rng = test_rng::lock();
        let device = Default::default();
        for upsampling in [Upsampling::Transposed, Upsampling::Bilinear] {
            let model = small_config(upsampling).init::<TestBackend>(&device);
            for resolution in [8, 16, 24] {
                let input = Tensor::random(
                    [2, 3, resolution, resolution],
                    Distribution::Default,
                    &device,
                );
                assert_eq!(
                    model.forward(input).dims(),
                    [2, 3, resolution, resolution],
                    "{upsampling:?} at {resolution}",
                );
            }
        }
    }

    #[test]
    fn test_default_width_network_shape() {
        let _rng = test_rng::lock();
        let device = Default::default();
        let model  = LlieConfig::new(Upsampling::Transposed).init::<TestBackend>(&device);
        let input  = Tensor::random([1, 3, 16, 16], Distribution::Default, &device);
        assert_eq!(model.forward(input).dims(), [1, 3, 16, 16]);
    }

    #[test]
    fn test_output_is_bounded_for_extreme_inputs() {
        let _rng = test_rng::lock();
        let device = Default::default();
        for upsampling in [Upsampling::Transposed, Upsampling::Bilinear] {
            let model = small_config(upsampling).init::<TestBackend>(&device);
            let input = Tensor::random([2, 3, 16, 16], Distribution::Normal(0.0, 1e4), &device);
            let (min, max) = value_range(model.forward(input));
            assert!(min >= 0.0 && max <= 1.0, "{upsampling:?}: [{min}, {max}]");
        }
    }

    #[test]
    fn test_single_channel_images() {
        let _rng = test_rng::lock();
        let device = Default::default();
        let model  = small_config(Upsampling::Transposed)
            .with_image_channels(1)
            .init::<TestBackend>(&device);
        let input  = Tensor::zeros([1, 1, 8, 8], &device);
        assert_eq!(model.forward(input).dims(), [1, 1, 8, 8]);
    }

    #[test]
    fn test_bottleneck_without_non_local() {
        let _rng = test_rng::lock();
        let device = Default::default();
        let model  = small_config(Upsampling::Bilinear)
            .with_non_local(false)
            .init::<TestBackend>(&device);
        assert!(model.bottleneck.non_local.is_none());
        let input = Tensor::random([1, 3, 8, 8], Distribution::Default, &device);
        assert_eq!(model.forward(input).dims(), [1, 3, 8, 8]);
    }

    #[test]
    fn test_bilinear_variant_backpropagates_on_cpu() {
        let _rng = test_rng::lock();
        type TrainBackend = burn::backend::Autodiff<NdArray>;
        let device = Default::default();
        let model  = small_config(Upsampling::Bilinear).init::<TrainBackend>(&device);
        let input  = Tensor::random([2, 3, 8, 8], Distribution::Default, &device);

        let grads = model.forward(input).mean().backward();
        // Reaching the first stage means every later resize was differentiated
        match &model.decoder.stages[0].upsample {
            Upsampler::Bilinear(block) => assert!(block.conv.weight.grad(&grads).is_some()),
            Upsampler::Transposed(_) => panic!("expected a bilinear decoder stage"),
        }
    }

    #[test]
    fn test_encoder_caches_one_skip_per_stage() {
        let _rng = test_rng::lock();
        let device  = Default::default();
        let model   = small_config(Upsampling::Transposed).init::<TestBackend>(&device);
        let mut skips = SkipStack::new();
        let input   = Tensor::random([1, 3, 32, 32], Distribution::Default, &device);

        let deepest = model.encoder.forward(input, &mut skips);
        assert_eq!(skips.len(), NUM_STAGES);
        assert_eq!(deepest.dims(), [1, 32, 4, 4]);

        // Popped deepest first, each captured after its downsampling
        let expected = [[1, 32, 4, 4], [1, 16, 4, 4], [1, 8, 8, 8], [1, 4, 16, 16]];
        for dims in expected {
            assert_eq!(skips.pop().map(|t| t.dims()), Some(dims));
        }
        assert!(skips.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_resolution_not_divisible_by_eight_is_a_structural_defect() {
        let _rng = test_rng::lock();
        let device = Default::default();
        let model  = small_config(Upsampling::Transposed).init::<TestBackend>(&device);
        let input  = Tensor::random([1, 3, 12, 12], Distribution::Default, &device);
        let _ = model.forward(input);
    }
}
