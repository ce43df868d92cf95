use clap::Parser;
use scene_dataset::summarize_root;
use std::path::PathBuf;
use std::process::ExitCode;
use training::config::{env_config_path, TrainConfig};

#[derive(Parser, Debug)]
#[command(
    name = "check_dataset",
    about = "Report missing files and resolution mismatches for every scene"
)]
struct Args {
    /// Directory containing one subdirectory per scene (defaults to the config's `data`).
    #[arg(long)]
    data: Option<PathBuf>,
    /// Also require albedo and incidence buffers.
    #[arg(long, default_value_t = false)]
    aux: bool,
    /// Noise levels to require, comma separated (defaults to the config's levels).
    #[arg(long, value_delimiter = ',')]
    noise_levels: Option<Vec<u32>>,
    /// TOML training config to read dataset settings from.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Pretty-print the JSON report.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    cli_support::init_tracing();
    let args = Args::parse();
    let cfg = TrainConfig::discover(args.config.as_deref(), env_config_path())?;
    let root = args.data.unwrap_or(cfg.data);
    let mut dataset = cfg.dataset;
    dataset.aux |= args.aux;
    if let Some(levels) = args.noise_levels {
        dataset.noise_levels = levels;
    }

    let summary = summarize_root(&root, &dataset)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    println!("{json}");

    for split in [&summary.train, &summary.test] {
        tracing::info!(
            split = ?split.split,
            scenes = split.scenes,
            healthy = split.healthy,
            missing_files = split.missing_files,
            bad_shapes = split.bad_shapes,
            "split summary"
        );
    }
    if summary.is_healthy() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(root = %root.display(), "dataset has defects");
        Ok(ExitCode::FAILURE)
    }
}
