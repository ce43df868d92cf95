use crate::InferenceBackend;
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use cli_support::ModelOpts;
use models::prelude::*;
use std::path::Path;

pub type BoxedDenoiser = Box<dyn Denoiser<InferenceBackend>>;

/// Builds denoisers from a model selection, loading weights when a checkpoint exists.
pub struct DenoiserFactory;

impl DenoiserFactory {
    pub fn build(&self, opts: &ModelOpts) -> anyhow::Result<BoxedDenoiser> {
        let device = <InferenceBackend as Backend>::Device::default();
        let in_channels = opts.in_channels();
        let path = opts.checkpoint.as_path();
        let model: BoxedDenoiser = match opts.kind {
            ModelKind::Linear => Box::new(with_weights(
                LinearDenoiser::<InferenceBackend>::new(
                    LinearDenoiserConfig {
                        in_channels,
                        ..Default::default()
                    },
                    &device,
                )?,
                path,
                &device,
            )?),
            ModelKind::Shallow => Box::new(with_weights(
                ShallowDenoiser::<InferenceBackend>::new(
                    ShallowDenoiserConfig {
                        in_channels,
                        ..Default::default()
                    },
                    &device,
                )?,
                path,
                &device,
            )?),
            ModelKind::Deep => Box::new(with_weights(
                DeepDenoiser::<InferenceBackend>::new(
                    DeepDenoiserConfig {
                        in_channels,
                        ..Default::default()
                    },
                    &device,
                )?,
                path,
                &device,
            )?),
            ModelKind::Bilateral => Box::new(with_weights(
                BilateralDenoiser::<InferenceBackend>::new(
                    BilateralConfig {
                        in_channels,
                        ..Default::default()
                    },
                    &device,
                )?,
                path,
                &device,
            )?),
        };
        Ok(model)
    }
}

fn with_weights<M: Module<InferenceBackend>>(
    fresh: M,
    path: &Path,
    device: &<InferenceBackend as Backend>::Device,
) -> anyhow::Result<M> {
    let file = path.with_extension("bin");
    if !file.exists() {
        tracing::warn!(
            path = %file.display(),
            "no checkpoint found; using freshly initialised weights"
        );
        return Ok(fresh);
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    fresh
        .load_file(file.clone(), &recorder, device)
        .map_err(|e| anyhow::anyhow!("failed to load checkpoint {}: {e}", file.display()))
}
