//! Full-image inference: lcd padding and optional patch tiling with context borders.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use models::{Denoiser, ModelKind, ModelResult};

/// Patch layout for tiled inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    /// Edge of each square output patch.
    pub patch: usize,
    /// Extra context pixels fed in on every side of a patch (clipped at image edges).
    pub border: usize,
}

impl TileConfig {
    /// Border defaults to half the patch, but never less than the model's receptive field.
    pub fn new(patch: usize, border: Option<usize>, kind: ModelKind) -> Self {
        let border = border.unwrap_or_else(|| (patch / 2).max(kind.receptive_field()));
        Self {
            patch: patch.max(1),
            border,
        }
    }
}

/// Zero-pad the right and bottom edges up to a multiple of `lcd`.
pub fn pad_to_multiple<B: Backend>(x: Tensor<B, 4>, lcd: usize) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    let lcd = lcd.max(1);
    let (pad_h, pad_w) = ((lcd - h % lcd) % lcd, (lcd - w % lcd) % lcd);
    if pad_h == 0 && pad_w == 0 {
        return x;
    }
    let device = x.device();
    let x = if pad_w > 0 {
        Tensor::cat(vec![x, Tensor::zeros([n, c, h, pad_w], &device)], 3)
    } else {
        x
    };
    if pad_h > 0 {
        Tensor::cat(vec![x, Tensor::zeros([n, c, pad_h, w + pad_w], &device)], 2)
    } else {
        x
    }
}

/// Run `model` on an input of any size by padding to its lcd and cropping back.
pub fn denoise_padded<B: Backend, M: Denoiser<B> + ?Sized>(
    model: &M,
    x: Tensor<B, 4>,
) -> ModelResult<Tensor<B, 4>> {
    let [n, _, h, w] = x.dims();
    let out = model.denoise(pad_to_multiple(x, model.dim_lcd()))?;
    let c = out.dims()[1];
    Ok(out.slice([0..n, 0..c, 0..h, 0..w]))
}

/// Denoise patch by patch to bound memory. A patch covering the whole image
/// falls back to a single padded pass.
pub fn denoise_tiled<B: Backend, M: Denoiser<B> + ?Sized>(
    model: &M,
    x: Tensor<B, 4>,
    tiles: TileConfig,
) -> ModelResult<Tensor<B, 4>> {
    let [n, c, h, w] = x.dims();
    let patch = tiles.patch;
    if patch >= h && patch >= w {
        return denoise_padded(model, x);
    }

    let mut rows = Vec::new();
    for y in (0..h).step_by(patch) {
        let ph = patch.min(h - y);
        let top = y.min(tiles.border);
        let bottom = (h - (y + ph)).min(tiles.border);
        let mut row = Vec::new();
        for x0 in (0..w).step_by(patch) {
            let pw = patch.min(w - x0);
            let left = x0.min(tiles.border);
            let right = (w - (x0 + pw)).min(tiles.border);

            let window = x.clone().slice([
                0..n,
                0..c,
                y - top..y + ph + bottom,
                x0 - left..x0 + pw + right,
            ]);
            let out = denoise_padded(model, window)?;
            let oc = out.dims()[1];
            row.push(out.slice([0..n, 0..oc, top..top + ph, left..left + pw]));
        }
        rows.push(Tensor::cat(row, 3));
    }
    Ok(Tensor::cat(rows, 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn pads_only_the_trailing_edges() {
        let device = Default::default();
        let x = Tensor::<B, 4>::ones([1, 2, 5, 6], &device);
        let padded = pad_to_multiple(x, 4);
        assert_eq!(padded.dims(), [1, 2, 8, 8]);
        let data = padded.into_data().to_vec::<f32>().unwrap();
        assert_eq!(data[0], 1.0);
        assert_eq!(data[7], 0.0);
        assert_eq!(data[5 * 8], 0.0);
    }

    #[test]
    fn border_defaults_respect_receptive_field() {
        assert_eq!(TileConfig::new(32, None, ModelKind::Shallow).border, 16);
        assert_eq!(TileConfig::new(32, None, ModelKind::Deep).border, 42);
        assert_eq!(TileConfig::new(32, Some(2), ModelKind::Deep).border, 2);
    }
}
