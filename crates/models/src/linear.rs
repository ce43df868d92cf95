use crate::error::ModelResult;
use crate::layers::{check_kernel, same_conv};
use crate::Denoiser;
use burn::module::Module;
use burn::nn::conv::Conv2d;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct LinearDenoiserConfig {
    pub in_channels: usize,
    pub kernel_size: usize,
}

impl Default for LinearDenoiserConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            kernel_size: 7,
        }
    }
}

/// A single learned convolution filter.
#[derive(Debug, Module)]
pub struct LinearDenoiser<B: Backend> {
    conv: Conv2d<B>,
    in_channels: usize,
}

impl<B: Backend> LinearDenoiser<B> {
    pub fn new(cfg: LinearDenoiserConfig, device: &B::Device) -> ModelResult<Self> {
        check_kernel(cfg.kernel_size)?;
        Ok(Self {
            conv: same_conv(cfg.in_channels, 3, cfg.kernel_size, 1, device),
            in_channels: cfg.in_channels,
        })
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(input)
    }
}

impl<B: Backend> Denoiser<B> for LinearDenoiser<B> {
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
