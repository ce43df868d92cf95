use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use std::fs;
use std::path::{Path, PathBuf};

/// The path the bin recorder actually reads and writes (it forces `.bin`).
pub fn checkpoint_file(path: &Path) -> PathBuf {
    path.with_extension("bin")
}

/// Load weights into `fresh`, or return it untouched when no checkpoint exists yet.
pub fn load_or_init<B: Backend, M: Module<B>>(
    fresh: M,
    path: &Path,
    device: &B::Device,
) -> anyhow::Result<M> {
    let file = checkpoint_file(path);
    if !file.exists() {
        tracing::warn!(path = %file.display(), "no checkpoint found; starting from a fresh model");
        return Ok(fresh);
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    let model = fresh
        .load_file(file.clone(), &recorder, device)
        .map_err(|e| anyhow::anyhow!("failed to load checkpoint {}: {e}", file.display()))?;
    tracing::info!(path = %file.display(), "loaded checkpoint");
    Ok(model)
}

pub fn save_checkpoint<B: Backend, M: Module<B>>(model: M, path: &Path) -> anyhow::Result<()> {
    let file = checkpoint_file(path);
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .save_file(file.clone(), &recorder)
        .map_err(|e| anyhow::anyhow!("failed to save checkpoint {}: {e}", file.display()))?;
    Ok(())
}
