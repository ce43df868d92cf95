//! Scene indexing, paired augmentation, and Burn-compatible batching for render denoising.
//!
//! This crate provides utilities for:
//! - Partitioning scene directories into train/test splits by name prefix
//! - Drawing augmentation policies that transform co-registered images identically
//! - An infinite, seeded source of augmented (input, target) pairs
//! - Burn-compatible batch assembly
//! - Dataset integrity checks

pub mod aug;
pub mod scene;
pub mod source;
pub mod splits;
pub mod types;
pub mod validation;

#[cfg(feature = "burn-runtime")]
pub mod batch;

pub use aug::AugmentationPolicy;
pub use scene::{index_scenes, input_file, list_scene_dirs, load_scene_image, ImageCache};
pub use source::{
    build_train_test_sources, draw_pair, DrawPlan, PairedSampleSource, SourceConfig,
    AUX_CHANNELS, DEFAULT_NOISE_LEVELS,
};
pub use splits::{default_test_prefixes, partition_names, split_of, TEST_PREFIXES};
pub use types::*;
pub use validation::{check_scene, summarize_root};

#[cfg(feature = "burn-runtime")]
pub use batch::{collate, PairBatch};
