use crate::error::ModelResult;
use crate::layers::{check_kernel, same_conv};
use crate::Denoiser;
use burn::module::Module;
use burn::nn::conv::Conv2d;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct ShallowDenoiserConfig {
    pub in_channels: usize,
    pub kernel_size: usize,
    pub hidden: usize,
}

impl Default for ShallowDenoiserConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            kernel_size: 5,
            hidden: 32,
        }
    }
}

/// One hidden convolutional layer, no downsampling.
#[derive(Debug, Module)]
pub struct ShallowDenoiser<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    in_channels: usize,
}

impl<B: Backend> ShallowDenoiser<B> {
    pub fn new(cfg: ShallowDenoiserConfig, device: &B::Device) -> ModelResult<Self> {
        check_kernel(cfg.kernel_size)?;
        Ok(Self {
            conv1: same_conv(cfg.in_channels, cfg.hidden, cfg.kernel_size, 1, device),
            conv2: same_conv(cfg.hidden, 3, cfg.kernel_size, 1, device),
            in_channels: cfg.in_channels,
        })
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.conv1.forward(input));
        self.conv2.forward(x)
    }
}

impl<B: Backend> Denoiser<B> for ShallowDenoiser<B> {
    fn dim_lcd(&self) -> usize {
        1
    }

    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn predict(&self, input: Tensor<B, 4>) -> ModelResult<Tensor<B, 4>> {
        Ok(self.forward(input))
    }
}
