//! Infinite source of augmented (input, target) pairs drawn from scene directories.

use crate::aug::AugmentationPolicy;
use crate::scene::{
    fetch, index_scenes, input_file, ImageCache, ALBEDO_FILE, INCIDENCE_FILE, TARGET_FILE,
};
use crate::splits::default_test_prefixes;
use crate::types::{
    AugStrength, DatasetResult, SamplePair, SceneDatasetError, SceneIndex, Split,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) const DEFAULT_LOG_EVERY_SAMPLES: usize = 1000;

/// Sample counts rendered for every scene.
pub const DEFAULT_NOISE_LEVELS: &[u32] = &[1, 16, 64, 128, 512];

/// Auxiliary channels appended in aux mode: albedo RGB, then incidence.
pub const AUX_CHANNELS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Square crop edge in pixels; must be smaller than the scene resolution.
    pub crop_size: usize,
    /// Noise levels (sample counts) to draw inputs from, uniformly.
    pub noise_levels: Vec<u32>,
    /// Append albedo and incidence channels to the input.
    pub aux: bool,
    pub strength: AugStrength,
    /// Decode every image once up front and keep it in memory.
    pub cache: bool,
    /// Seed for reproducible ordering and augmentation.
    pub seed: Option<u64>,
    /// Directory-name prefixes that select the test split.
    pub test_prefixes: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            crop_size: 192,
            noise_levels: DEFAULT_NOISE_LEVELS.to_vec(),
            aux: false,
            strength: AugStrength::Basic,
            cache: false,
            seed: None,
            test_prefixes: default_test_prefixes(),
        }
    }
}

impl SourceConfig {
    pub fn input_channels(&self) -> usize {
        if self.aux {
            3 + AUX_CHANNELS
        } else {
            3
        }
    }

    pub fn validate(&self) -> DatasetResult<()> {
        if self.crop_size == 0 {
            return Err(SceneDatasetError::InvalidConfig(
                "crop_size must be positive".to_string(),
            ));
        }
        if self.noise_levels.is_empty() {
            return Err(SceneDatasetError::InvalidConfig(
                "noise_levels must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Every file a draw may touch under this configuration.
    pub fn scene_files(&self) -> Vec<String> {
        let mut files = vec![TARGET_FILE.to_string()];
        files.extend(self.noise_levels.iter().map(|n| input_file(*n)));
        if self.aux {
            files.push(ALBEDO_FILE.to_string());
            files.push(INCIDENCE_FILE.to_string());
        }
        files
    }

    pub fn describe(&self) -> String {
        format!(
            "crop={} noise_levels={:?} aux={} strength={:?} cache={} seed={}",
            self.crop_size,
            self.noise_levels,
            self.aux,
            self.strength,
            self.cache,
            self.seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }
}

/// Everything needed to perform one draw independently of the source.
#[derive(Debug, Clone)]
pub struct DrawPlan {
    pub scene: PathBuf,
    pub noise_level: u32,
    pub seed: u64,
}

/// Perform one draw: load, build a fresh policy, augment, optionally append aux.
pub fn draw_pair(
    plan: &DrawPlan,
    cfg: &SourceConfig,
    cache: Option<&ImageCache>,
) -> DatasetResult<SamplePair> {
    let mut rng = StdRng::seed_from_u64(plan.seed);
    let target = fetch(cache, &plan.scene, TARGET_FILE)?;
    if target.width != target.height {
        return Err(SceneDatasetError::ShapeMismatch(format!(
            "target in {} is {}x{}, expected square",
            plan.scene.display(),
            target.width,
            target.height
        )));
    }
    let noisy = fetch(cache, &plan.scene, &input_file(plan.noise_level))?;

    let policy = AugmentationPolicy::sample(&mut rng, target.height, cfg.crop_size, cfg.strength)?;
    let mut input = policy.apply(&noisy)?;
    let target = policy.apply(&target)?;

    if cfg.aux {
        for file in [ALBEDO_FILE, INCIDENCE_FILE] {
            let buffer = fetch(cache, &plan.scene, file)?;
            input = input.concat_channels(&policy.apply(&buffer)?)?;
        }
    }
    Ok(SamplePair { input, target })
}

pub struct PairedSampleSource {
    pub(crate) root: PathBuf,
    pub(crate) split: Split,
    pub(crate) cfg: SourceConfig,
    pub(crate) scenes: Vec<SceneIndex>,
    order: Vec<usize>,
    cursor: usize,
    rng: StdRng,
    pub(crate) cache: Option<Arc<ImageCache>>,
    pub(crate) progress: DrawProgress,
}

impl PairedSampleSource {
    pub fn new(root: &Path, split: Split, cfg: SourceConfig) -> DatasetResult<Self> {
        cfg.validate()?;
        let scenes = index_scenes(root, split, &cfg.test_prefixes)?;
        Self::from_scenes(root, split, scenes, cfg)
    }

    pub fn from_scenes(
        root: &Path,
        split: Split,
        scenes: Vec<SceneIndex>,
        cfg: SourceConfig,
    ) -> DatasetResult<Self> {
        cfg.validate()?;
        if scenes.is_empty() {
            return Err(SceneDatasetError::EmptySplit {
                root: root.to_path_buf(),
                split,
            });
        }
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let cache = if cfg.cache {
            let t = Instant::now();
            let cache = ImageCache::populate(&scenes, &cfg.scene_files())?;
            tracing::info!(
                split = %split,
                images = cache.len(),
                elapsed_ms = t.elapsed().as_millis() as u64,
                "populated image cache"
            );
            Some(Arc::new(cache))
        } else {
            None
        };
        tracing::info!(
            root = %root.display(),
            split = %split,
            scenes = scenes.len(),
            config = %cfg.describe(),
            "opened scene source"
        );
        let order = (0..scenes.len()).collect();
        let cursor = scenes.len();
        Ok(Self {
            root: root.to_path_buf(),
            split,
            cfg,
            scenes,
            order,
            cursor,
            rng,
            cache,
            progress: DrawProgress::from_env(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn config(&self) -> &SourceConfig {
        &self.cfg
    }

    pub fn scenes(&self) -> &[SceneIndex] {
        &self.scenes
    }

    /// Pick the next scene (reshuffling once the sweep is exhausted), a noise
    /// level, and a per-draw seed.
    pub fn plan(&mut self) -> DrawPlan {
        if self.cursor >= self.order.len() {
            self.order.shuffle(&mut self.rng);
            self.cursor = 0;
        }
        let scene = self.scenes[self.order[self.cursor]].dir.clone();
        self.cursor += 1;
        let noise_level = self.cfg.noise_levels[self.rng.random_range(0..self.cfg.noise_levels.len())];
        let seed = self.rng.random();
        DrawPlan {
            scene,
            noise_level,
            seed,
        }
    }

    pub fn next_pair(&mut self) -> DatasetResult<SamplePair> {
        let plan = self.plan();
        let pair = draw_pair(&plan, &self.cfg, self.cache.as_deref())?;
        self.progress.record(1, self.split);
        Ok(pair)
    }
}

/// Never returns `None`; consumers bound the number of draws themselves.
impl Iterator for PairedSampleSource {
    type Item = DatasetResult<SamplePair>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_pair())
    }
}

/// Open train and test sources over the same root.
pub fn build_train_test_sources(
    root: &Path,
    train_cfg: SourceConfig,
    test_cfg: Option<SourceConfig>,
) -> DatasetResult<(PairedSampleSource, PairedSampleSource)> {
    let test_cfg = test_cfg.unwrap_or_else(|| SourceConfig {
        seed: train_cfg.seed.map(|s| s.wrapping_add(1)),
        ..train_cfg.clone()
    });
    let train = PairedSampleSource::new(root, Split::Train, train_cfg)?;
    let test = PairedSampleSource::new(root, Split::Test, test_cfg)?;
    Ok((train, test))
}

pub(crate) struct DrawProgress {
    processed: usize,
    last_logged: usize,
    started: Instant,
    last_log: Instant,
    log_every: Option<usize>,
}

impl DrawProgress {
    fn from_env() -> Self {
        let log_every = match std::env::var("SCENE_DATASET_LOG_EVERY") {
            Ok(val) => {
                if val.eq_ignore_ascii_case("off") || val.trim() == "0" {
                    None
                } else {
                    val.trim().parse::<usize>().ok().filter(|v| *v > 0)
                }
            }
            Err(_) => Some(DEFAULT_LOG_EVERY_SAMPLES),
        };
        let now = Instant::now();
        Self {
            processed: 0,
            last_logged: 0,
            started: now,
            last_log: now,
            log_every,
        }
    }

    pub(crate) fn record(&mut self, samples: usize, split: Split) {
        self.processed += samples;
        let Some(threshold) = self.log_every else {
            return;
        };
        let since = self.processed.saturating_sub(self.last_logged);
        if since < threshold && self.last_log.elapsed() < Duration::from_secs(30) {
            return;
        }
        let secs = self.started.elapsed().as_secs_f32().max(0.001);
        tracing::info!(
            split = %split,
            samples = self.processed,
            samples_per_sec = self.processed as f32 / secs,
            "scene source progress"
        );
        self.last_logged = self.processed;
        self.last_log = Instant::now();
    }
}
