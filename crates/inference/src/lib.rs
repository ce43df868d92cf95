#![recursion_limit = "256"]

pub mod factory;
pub mod pipeline;
pub mod tiling;

#[cfg(feature = "backend-wgpu")]
pub type InferenceBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type InferenceBackend = burn_ndarray::NdArray<f32>;

pub use factory::{BoxedDenoiser, DenoiserFactory};
pub use pipeline::{denoise_image, input_tensor, output_image, AuxImages};
pub use tiling::{denoise_padded, denoise_tiled, pad_to_multiple, TileConfig};

pub mod prelude {
    pub use crate::factory::{BoxedDenoiser, DenoiserFactory};
    pub use crate::pipeline::{denoise_image, AuxImages};
    pub use crate::tiling::TileConfig;
    pub use crate::InferenceBackend;
}
