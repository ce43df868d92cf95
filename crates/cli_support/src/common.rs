use clap::Args;
use models::ModelKind;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Model selection shared by the training and inference binaries.
#[derive(Debug, Clone, Default, Args)]
pub struct ModelArgs {
    /// Architecture: linear, shallow, deep, or bilateral.
    #[arg(long)]
    pub model: Option<ModelKind>,
    /// Checkpoint file to load (and, when training, to save into).
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
    /// Feed albedo and incidence as extra input channels.
    #[arg(long, default_value_t = false)]
    pub aux: bool,
}

/// Resolved model selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOpts {
    pub kind: ModelKind,
    pub checkpoint: PathBuf,
    pub aux: bool,
}

impl ModelOpts {
    pub fn new(kind: ModelKind, checkpoint: Option<PathBuf>, aux: bool) -> Self {
        let checkpoint = checkpoint.unwrap_or_else(|| default_checkpoint(kind, aux));
        Self {
            kind,
            checkpoint,
            aux,
        }
    }

    pub fn in_channels(&self) -> usize {
        if self.aux {
            7
        } else {
            3
        }
    }
}

impl From<&ModelArgs> for ModelOpts {
    fn from(args: &ModelArgs) -> Self {
        ModelOpts::new(
            args.model.unwrap_or(ModelKind::Shallow),
            args.checkpoint.clone(),
            args.aux,
        )
    }
}

/// `checkpoints/<kind>[_aux].bin`
pub fn default_checkpoint(kind: ModelKind, aux: bool) -> PathBuf {
    let suffix = if aux { "_aux" } else { "" };
    PathBuf::from("checkpoints").join(format!("{kind}{suffix}.bin"))
}
