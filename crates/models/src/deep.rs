use crate::error::{ModelError, ModelResult};
use crate::layers::{same_conv, ResidualBlock, SeparableConv2d};
use crate::{check_lcd, Denoiser};
use burn::module::Module;
use burn::nn::conv::{Conv2d, ConvTranspose2d, ConvTranspose2dConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct DeepDenoiserConfig {
    pub in_channels: usize,
    /// Channels after the first downsampling convolution.
    pub stem: usize,
    /// Channels carried through the residual trunk.
    pub trunk: usize,
    /// Expanded width inside each residual block.
    pub expansion: usize,
    pub residual_blocks: usize,
    pub norm_groups: usize,
}

impl Default for DeepDenoiserConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            stem: 64,
            trunk: 128,
            expansion: 256,
            residual_blocks: 4,
            norm_groups: 8,
        }
    }
}

/// Encoder (two stride-2 convs), residual trunk, and a mirrored decoder.
///
/// Height and width must be multiples of 4; anything else is rejected before
/// the stride-2 stages could misalign the output.
#[derive(Debug, Module)]
pub struct DeepDenoiser<B: Backend> {
    conv1: Conv2d<B>,
    conv2: SeparableConv2d<B>,
    residuals: Vec<ResidualBlock<B>>,
    deconv1: ConvTranspose2d<B>,
    deconv2: ConvTranspose2d<B>,
    conv3: Conv2d<B>,
    in_channels: usize,
}

const DIM_LCD: usize = 4;

impl DeepDenoiserConfig {
    fn validate(&self) -> ModelResult<()> {
        let invalid = |msg: String| Err(ModelError::InvalidConfig(msg));
        if self.in_channels == 0 {
            return invalid("in_channels must be positive".into());
        }
        if self.stem < 2 {
            return invalid(format!("stem must be at least 2, got {}", self.stem));
        }
        if self.trunk == 0 || self.expansion == 0 {
            return invalid("trunk and expansion must be positive".into());
        }
        if self.norm_groups == 0 || self.trunk % self.norm_groups != 0 {
            return invalid(format!(
                "norm_groups {} must divide trunk {}",
                self.norm_groups, self.trunk
            ));
        }
        Ok(())
    }
}

impl<B: Backend> DeepDenoiser<B> {
    pub fn new(cfg: DeepDenoiserConfig, device: &B::Device) -> ModelResult<Self> {
        cfg.validate()?;
        let residuals = (0..cfg.residual_blocks)
            .map(|_| ResidualBlock::new(cfg.trunk, cfg.expansion, cfg.norm_groups, device))
            .collect();
        let upsample = |from: usize, to: usize| {
            ConvTranspose2dConfig::new([from, to], [4, 4])
                .with_stride([2, 2])
                .with_padding([1, 1])
                .init(device)
        };
        Ok(Self {
            conv1: same_conv(cfg.in_channels, cfg.stem, 5, 2, device),
            conv2: SeparableConv2d::new(cfg.stem, cfg.trunk, 5, 2, device),
            residuals,
            deconv1: upsample(cfg.trunk, cfg.stem),
            deconv2: upsample(cfg.stem, cfg.stem / 2),
            conv3: same_conv(cfg.stem / 2, 3, 3, 1, device),
            in_channels: cfg.in_channels,
        })
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> ModelResult<Tensor<B, 4>> {
        check_lcd(input.dims(), DIM_LCD)?;
        let x = relu(self.conv1.forward(input));
        let mut x = self.conv2.forward(x);
        for block in &self.residuals {
            x = block.forward(x);
        }
        let x = relu(self.deconv1.forward(x));
        let x = relu(self.deconv2.forward(x));
        Ok(self.conv3.forward(x))
    }
}

impl<B: Backend> Denoiser<B> for DeepDenoiser<B> {
    fn dim_lcd(&self) -> usize {
        DIM_LCD
    }

    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn predict(&self, input: Tensor<B, 4>) -> ModelResult<Tensor<B, 4>> {
        self.forward(input)
    }
}
