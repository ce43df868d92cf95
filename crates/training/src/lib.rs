#![recursion_limit = "256"]

pub mod baseline;
pub mod checkpoint;
pub mod config;
pub mod preview;
pub mod util;

pub use baseline::{identity_baseline, identity_error};
pub use checkpoint::{checkpoint_file, load_or_init, save_checkpoint};
pub use config::{TrainConfig, CONFIG_ENV};
pub use preview::{render_mosaic, write_preview};
pub use util::{run_train, train, TrainArgs, TrainSummary};
/// Backend alias for training (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
