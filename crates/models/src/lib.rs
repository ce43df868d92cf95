//! Burn denoising networks for rendered imagery.
//!
//! Every architecture maps a noisy `[N, C, H, W]` batch (RGB, or RGB plus
//! albedo and incidence in aux mode) to a `[N, 3, H, W]` prediction of the
//! clean render:
//! - `LinearDenoiser`: one convolution.
//! - `ShallowDenoiser`: two convolutions around a ReLU.
//! - `DeepDenoiser`: stride-2 encoder, residual trunk, transposed-conv decoder.
//! - `BilateralDenoiser`: bilateral filter with learned bandwidths.
//!
//! The models own no optimizer or checkpoint state; the `training` and
//! `inference` crates handle both.

pub mod bilateral;
pub mod deep;
pub mod error;
pub mod kind;
pub mod layers;
pub mod linear;
pub mod shallow;

pub use bilateral::{BilateralConfig, BilateralDenoiser};
pub use deep::{DeepDenoiser, DeepDenoiserConfig};
pub use error::{ModelError, ModelResult};
pub use kind::ModelKind;
pub use linear::{LinearDenoiser, LinearDenoiserConfig};
pub use shallow::{ShallowDenoiser, ShallowDenoiserConfig};

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Common contract of the denoiser family.
pub trait Denoiser<B: Backend> {
    /// Factor that must divide the input height and width.
    fn dim_lcd(&self) -> usize;

    fn in_channels(&self) -> usize;

    /// Forward pass. Architectures that downsample reject spatial sizes off
    /// their lcd here; channel counts are not checked.
    fn predict(&self, input: Tensor<B, 4>) -> ModelResult<Tensor<B, 4>>;

    /// Forward pass that also rejects a wrong channel count.
    fn denoise(&self, input: Tensor<B, 4>) -> ModelResult<Tensor<B, 4>> {
        let [_, channels, _, _] = input.dims();
        if channels != self.in_channels() {
            return Err(ModelError::ChannelMismatch {
                expected: self.in_channels(),
                actual: channels,
            });
        }
        check_lcd(input.dims(), self.dim_lcd())?;
        self.predict(input)
    }

    /// Mean absolute error of the prediction against `targets`.
    fn loss(&self, input: Tensor<B, 4>, targets: Tensor<B, 4>) -> ModelResult<Tensor<B, 1>> {
        let prediction = self.denoise(input)?;
        mae_loss(prediction, targets)
    }
}

impl<B: Backend, M: Denoiser<B> + ?Sized> Denoiser<B> for Box<M> {
    fn dim_lcd(&self) -> usize {
        (**self).dim_lcd()
    }

    fn in_channels(&self) -> usize {
        (**self).in_channels()
    }

    fn predict(&self, input: Tensor<B, 4>) -> ModelResult<Tensor<B, 4>> {
        (**self).predict(input)
    }
}

/// Fails unless height and width of an `[N, C, H, W]` shape are multiples of `lcd`.
pub fn check_lcd(dims: [usize; 4], lcd: usize) -> ModelResult<()> {
    let [_, _, height, width] = dims;
    let lcd = lcd.max(1);
    if height % lcd != 0 || width % lcd != 0 {
        return Err(ModelError::DimNotDivisible { height, width, lcd });
    }
    Ok(())
}

pub fn mae_loss<B: Backend>(
    prediction: Tensor<B, 4>,
    targets: Tensor<B, 4>,
) -> ModelResult<Tensor<B, 1>> {
    if prediction.dims() != targets.dims() {
        return Err(ModelError::ShapeMismatch {
            prediction: prediction.dims(),
            target: targets.dims(),
        });
    }
    Ok((prediction - targets).abs().mean())
}

pub mod prelude {
    pub use super::{
        check_lcd, mae_loss, BilateralConfig, BilateralDenoiser, DeepDenoiser, DeepDenoiserConfig, Denoiser,
        LinearDenoiser, LinearDenoiserConfig, ModelError, ModelKind, ModelResult,
        ShallowDenoiser, ShallowDenoiserConfig,
    };
}
