//! Training configuration: built-in defaults, an optional TOML file, then CLI flags.

use anyhow::Context;
use models::ModelKind;
use scene_dataset::SourceConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Names the config file when `--config` is not given.
pub const CONFIG_ENV: &str = "DENOISE_TRAIN_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Directory of scene subdirectories.
    pub data: PathBuf,
    pub model: ModelKind,
    /// Defaults to `checkpoints/<model>[_aux].bin`.
    pub checkpoint: Option<PathBuf>,
    pub batch: usize,
    pub lr: f64,
    /// Steps between checkpoint saves and preview renders.
    pub save_interval: usize,
    /// Stop after this many steps; train until interrupted when unset.
    pub steps: Option<usize>,
    /// Where to write the `(input | predicted)` mosaic.
    pub preview: Option<PathBuf>,
    /// Pairs per split used for the identity baseline; 0 skips it.
    pub baseline_samples: usize,
    pub dataset: SourceConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data"),
            model: ModelKind::Shallow,
            checkpoint: None,
            batch: 8,
            lr: 1e-3,
            save_interval: 10,
            steps: None,
            preview: Some(PathBuf::from("samples.png")),
            baseline_samples: 100,
            dataset: SourceConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid training config")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Load the explicit file, else the file named by `env_path`, else defaults.
    ///
    /// An explicit path must exist; an env-named file that is absent falls
    /// back to defaults.
    pub fn discover(explicit: Option<&Path>, env_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match env_path {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                tracing::debug!(path = %path.display(), "config file not found; using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch == 0 {
            anyhow::bail!("batch must be positive");
        }
        if self.save_interval == 0 {
            anyhow::bail!("save_interval must be positive");
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            anyhow::bail!("lr must be a positive number, got {}", self.lr);
        }
        let lcd = self.model.dim_lcd();
        if self.dataset.crop_size % lcd != 0 {
            anyhow::bail!(
                "crop size {} is not a multiple of {} required by the {} model",
                self.dataset.crop_size,
                lcd,
                self.model
            );
        }
        self.dataset.validate()?;
        Ok(())
    }
}

pub fn env_config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV).map(PathBuf::from)
}
