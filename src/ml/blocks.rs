use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

fn conv3x3<B: Backend>(in_channels: usize, out_channels: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_stride([1, 1])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

/// conv 3×3 → BatchNorm → ReLU.
/// Changes the channel count, keeps the spatial size.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv:       Conv2d<B>,
    bn:         BatchNorm<B, 2>,
    activation: Relu,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            conv:       conv3x3(in_channels, out_channels, device),
            bn:         BatchNormConfig::new(out_channels).init(device),
            activation: Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        self.activation.forward(x)
    }
}

/// Two conv + norm steps with an identity shortcut.
///
/// Input and output channels are the same by construction, so the
/// shortcut never needs a projection. Each norm consumes the output
/// of the conv directly before it.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    conv1:      Conv2d<B>,
    bn1:        BatchNorm<B, 2>,
    conv2:      Conv2d<B>,
    bn2:        BatchNorm<B, 2>,
    activation: Relu,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn new(channels: usize, device: &B::Device) -> Self {
        Self {
            conv1:      conv3x3(channels, channels, device),
            bn1:        BatchNormConfig::new(channels).init(device),
            conv2:      conv3x3(channels, channels, device),
            bn2:        BatchNormConfig::new(channels).init(device),
            activation: Relu::new(),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let residual = input.clone();

        let x = self.conv1.forward(input);
        let x = self.bn1.forward(x);
        let x = self.activation.forward(x);

        let x = self.conv2.forward(x);
        let x = self.bn2.forward(x);

        self.activation.forward(x.add(residual))
    }
}
