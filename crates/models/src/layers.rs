//! Building blocks shared by the convolutional denoisers.

use crate::error::{ModelError, ModelResult};
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{GroupNorm, GroupNormConfig, PaddingConfig2d};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

pub(crate) fn check_kernel(kernel: usize) -> ModelResult<()> {
    if kernel % 2 == 0 {
        return Err(ModelError::EvenKernel(kernel));
    }
    Ok(())
}

/// Square convolution padded so that stride 1 preserves spatial size.
pub(crate) fn same_conv<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    device: &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(kernel / 2, kernel / 2))
        .init(device)
}

/// Depthwise k×k convolution, ReLU, then a pointwise 1×1 projection.
#[derive(Debug, Module)]
pub struct SeparableConv2d<B: Backend> {
    spatial: Conv2d<B>,
    pointwise: Conv2d<B>,
}

impl<B: Backend> SeparableConv2d<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        device: &B::Device,
    ) -> Self {
        let spatial = Conv2dConfig::new([in_channels, in_channels], [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(kernel / 2, kernel / 2))
            .with_groups(in_channels)
            .init(device);
        let pointwise = Conv2dConfig::new([in_channels, out_channels], [1, 1]).init(device);
        Self { spatial, pointwise }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.spatial.forward(x));
        self.pointwise.forward(x)
    }
}

/// normalize → ReLU → expand → ReLU → contract, added back onto the input.
#[derive(Debug, Module)]
pub struct ResidualBlock<B: Backend> {
    norm: GroupNorm<B>,
    expand: SeparableConv2d<B>,
    contract: SeparableConv2d<B>,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn new(channels: usize, hidden: usize, groups: usize, device: &B::Device) -> Self {
        Self {
            norm: GroupNormConfig::new(groups, channels).init(device),
            expand: SeparableConv2d::new(channels, hidden, 3, 1, device),
            contract: SeparableConv2d::new(hidden, channels, 3, 1, device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let h = relu(self.norm.forward(x.clone()));
        let h = relu(self.expand.forward(h));
        x + self.contract.forward(h)
    }
}
