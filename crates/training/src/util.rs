use crate::baseline::identity_baseline;
use crate::checkpoint::{checkpoint_file, load_or_init, save_checkpoint};
use crate::config::{env_config_path, TrainConfig};
use crate::preview::write_preview;
use crate::TrainBackend;
use burn::backend::Autodiff;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use clap::{Parser, ValueEnum};
use cli_support::{default_checkpoint, ModelArgs};
use models::prelude::*;
use scene_dataset::{build_train_test_sources, AugStrength, PairedSampleSource};
use std::path::{Path, PathBuf};

pub type ADBackend = Autodiff<TrainBackend>;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

#[derive(Parser, Debug)]
#[command(
    name = "train",
    about = "Train a denoiser on augmented (noisy, clean) scene pairs"
)]
pub struct TrainArgs {
    /// Directory containing one subdirectory per scene.
    #[arg(long)]
    pub data: Option<PathBuf>,
    #[command(flatten)]
    pub model: ModelArgs,
    /// Batch size.
    #[arg(long)]
    pub batch: Option<usize>,
    /// Adam learning rate.
    #[arg(long)]
    pub lr: Option<f64>,
    /// Steps between checkpoint saves and preview renders.
    #[arg(long)]
    pub save_interval: Option<usize>,
    /// Square crop edge for training pairs.
    #[arg(long)]
    pub crop_size: Option<usize>,
    /// Stop after this many steps (default: run until interrupted).
    #[arg(long)]
    pub steps: Option<usize>,
    /// Add vertical flips, rotations and channel permutations.
    #[arg(long, default_value_t = false)]
    pub extended_aug: bool,
    /// Decode every scene image up front and keep it in memory.
    #[arg(long, default_value_t = false)]
    pub cache: bool,
    /// Seed for scene order and augmentation.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Preview mosaic path.
    #[arg(long)]
    pub preview: Option<PathBuf>,
    /// Skip writing the preview mosaic.
    #[arg(long, default_value_t = false, conflicts_with = "preview")]
    pub no_preview: bool,
    /// TOML config file (falls back to $DENOISE_TRAIN_CONFIG).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
}

impl TrainArgs {
    /// Config file (or defaults) with explicit flags layered on top.
    pub fn resolve(&self) -> anyhow::Result<TrainConfig> {
        let base = TrainConfig::discover(self.config.as_deref(), env_config_path())?;
        Ok(self.apply(base))
    }

    pub fn apply(&self, mut cfg: TrainConfig) -> TrainConfig {
        if let Some(data) = &self.data {
            cfg.data = data.clone();
        }
        if let Some(model) = self.model.model {
            cfg.model = model;
        }
        if let Some(checkpoint) = &self.model.checkpoint {
            cfg.checkpoint = Some(checkpoint.clone());
        }
        if self.model.aux {
            cfg.dataset.aux = true;
        }
        if let Some(batch) = self.batch {
            cfg.batch = batch;
        }
        if let Some(lr) = self.lr {
            cfg.lr = lr;
        }
        if let Some(interval) = self.save_interval {
            cfg.save_interval = interval;
        }
        if let Some(crop) = self.crop_size {
            cfg.dataset.crop_size = crop;
        }
        if self.steps.is_some() {
            cfg.steps = self.steps;
        }
        if self.extended_aug {
            cfg.dataset.strength = AugStrength::Extended;
        }
        if self.cache {
            cfg.dataset.cache = true;
        }
        if self.seed.is_some() {
            cfg.dataset.seed = self.seed;
        }
        if self.no_preview {
            cfg.preview = None;
        } else if let Some(path) = &self.preview {
            cfg.preview = Some(path.clone());
        }
        cfg
    }
}

/// Outcome of a bounded training run.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub steps: usize,
    pub train_loss: f32,
    pub test_loss: f32,
    pub checkpoint: PathBuf,
}

pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    validate_backend_choice(args.backend)?;
    let cfg = args.resolve()?;
    let summary = train(&cfg)?;
    tracing::info!(
        steps = summary.steps,
        train_loss = summary.train_loss,
        test_loss = summary.test_loss,
        checkpoint = %summary.checkpoint.display(),
        "training finished"
    );
    Ok(())
}

/// Train the configured model, resuming from its checkpoint when one exists.
pub fn train(cfg: &TrainConfig) -> anyhow::Result<TrainSummary> {
    cfg.validate()?;
    let checkpoint = cfg
        .checkpoint
        .clone()
        .unwrap_or_else(|| default_checkpoint(cfg.model, cfg.dataset.aux));
    let (mut train_src, mut test_src) =
        build_train_test_sources(&cfg.data, cfg.dataset.clone(), None)?;

    if cfg.baseline_samples > 0 {
        let train_baseline = identity_baseline(&mut train_src, cfg.baseline_samples)?;
        let test_baseline = identity_baseline(&mut test_src, cfg.baseline_samples)?;
        tracing::info!(
            train = train_baseline,
            test = test_baseline,
            samples = cfg.baseline_samples,
            "identity baseline"
        );
    }

    let device = <ADBackend as Backend>::Device::default();
    let in_channels = cfg.dataset.input_channels();
    tracing::info!(model = %cfg.model, in_channels, checkpoint = %checkpoint.display(), "building model");
    let mut run = Run {
        cfg,
        checkpoint: &checkpoint,
        train: &mut train_src,
        test: &mut test_src,
        device: &device,
    };
    match cfg.model {
        ModelKind::Linear => run.fit(LinearDenoiser::<ADBackend>::new(
            LinearDenoiserConfig {
                in_channels,
                ..Default::default()
            },
            &device,
        )?),
        ModelKind::Shallow => run.fit(ShallowDenoiser::<ADBackend>::new(
            ShallowDenoiserConfig {
                in_channels,
                ..Default::default()
            },
            &device,
        )?),
        ModelKind::Deep => run.fit(DeepDenoiser::<ADBackend>::new(
            DeepDenoiserConfig {
                in_channels,
                ..Default::default()
            },
            &device,
        )?),
        ModelKind::Bilateral => run.fit(BilateralDenoiser::<ADBackend>::new(
            BilateralConfig {
                in_channels,
                ..Default::default()
            },
            &device,
        )?),
    }
}

struct Run<'a> {
    cfg: &'a TrainConfig,
    checkpoint: &'a Path,
    train: &'a mut PairedSampleSource,
    test: &'a mut PairedSampleSource,
    device: &'a <ADBackend as Backend>::Device,
}

impl Run<'_> {
    fn fit<M>(&mut self, fresh: M) -> anyhow::Result<TrainSummary>
    where
        M: AutodiffModule<ADBackend> + Denoiser<ADBackend>,
        M::InnerModule: Denoiser<TrainBackend>,
    {
        let cfg = self.cfg;
        let mut model = load_or_init(fresh, self.checkpoint, self.device)?;
        let mut optim = AdamConfig::new().init::<ADBackend, M>();

        let mut step = 0usize;
        let (mut train_loss, mut test_loss) = (f32::NAN, f32::NAN);
        while !cfg.steps.is_some_and(|max| step >= max) {
            let batch = self.train.next_batch::<ADBackend>(cfg.batch, self.device)?;
            let test_batch = self.test.next_batch::<TrainBackend>(cfg.batch, self.device)?;

            let loss = model.loss(batch.inputs, batch.targets)?;
            let valid = model.valid();
            test_loss = scalar(valid.loss(test_batch.inputs.clone(), test_batch.targets.clone())?);
            train_loss = scalar(loss.clone().detach());

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);
            step += 1;
            tracing::info!(step, train_loss, test_loss, "step");

            if step % cfg.save_interval == 0 {
                save_checkpoint(model.clone(), self.checkpoint)?;
                tracing::info!(step, path = %checkpoint_file(self.checkpoint).display(), "saved checkpoint");
                if let Some(path) = &cfg.preview {
                    let predictions = valid.denoise(test_batch.inputs.clone())?;
                    write_preview(test_batch.inputs, predictions, path)?;
                }
            }
        }

        save_checkpoint(model, self.checkpoint)?;
        Ok(TrainSummary {
            steps: step,
            train_loss,
            test_loss,
            checkpoint: checkpoint_file(self.checkpoint),
        })
    }
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f32 {
    t.into_data()
        .to_vec::<f32>()
        .ok()
        .and_then(|v| v.first().copied())
        .unwrap_or(f32::NAN)
}

pub fn validate_backend_choice(kind: BackendKind) -> anyhow::Result<()> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (kind, built_wgpu) {
        (BackendKind::Wgpu, false) => {
            anyhow::bail!("backend-wgpu feature not enabled; rebuild with --features backend-wgpu or choose ndarray backend")
        }
        (BackendKind::NdArray, true) => {
            tracing::warn!("built with backend-wgpu; training will still use the WGPU backend despite --backend ndarray");
        }
        _ => {}
    }
    Ok(())
}
