use anyhow::Context;
use burn::tensor::backend::Backend;
use clap::Parser;
use cli_support::{ModelArgs, ModelOpts};
use inference::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "denoise", about = "Denoise a rendered image with a trained model")]
struct Args {
    /// Noisy input image.
    image_in: PathBuf,
    /// Where to write the denoised image.
    image_out: PathBuf,
    #[command(flatten)]
    model: ModelArgs,
    /// Process the image in square patches of this size to bound memory.
    #[arg(long)]
    patch: Option<usize>,
    /// Context pixels around each patch (default: max(patch/2, receptive field)).
    #[arg(long)]
    patch_border: Option<usize>,
    /// Albedo buffer (required with --aux).
    #[arg(long)]
    albedo: Option<PathBuf>,
    /// Incidence buffer (required with --aux).
    #[arg(long)]
    incidence: Option<PathBuf>,
}

fn open(path: &Path) -> anyhow::Result<image::DynamicImage> {
    image::open(path).with_context(|| format!("failed to open {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    cli_support::init_tracing();
    let args = Args::parse();
    let opts = ModelOpts::from(&args.model);

    let color = open(&args.image_in)?.to_rgb8();
    let aux_buffers = if opts.aux {
        let (Some(albedo), Some(incidence)) = (&args.albedo, &args.incidence) else {
            anyhow::bail!("--aux requires --albedo and --incidence");
        };
        Some((open(albedo)?.to_rgb8(), open(incidence)?.to_luma8()))
    } else {
        None
    };
    let aux = aux_buffers.as_ref().map(|(albedo, incidence)| AuxImages { albedo, incidence });

    let (w, h) = color.dimensions();
    let patch = args.patch.unwrap_or(w.max(h) as usize);
    let tiles = TileConfig::new(patch, args.patch_border, opts.kind);

    let model = DenoiserFactory.build(&opts)?;
    let device = <InferenceBackend as Backend>::Device::default();
    let started = Instant::now();
    let output = denoise_image(model.as_ref(), &color, aux, tiles, &device)?;
    tracing::info!(
        model = %opts.kind,
        width = w,
        height = h,
        patch = tiles.patch,
        border = tiles.border,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "denoised image"
    );

    output
        .save(&args.image_out)
        .with_context(|| format!("failed to write {}", args.image_out.display()))?;
    Ok(())
}
