//! Side-by-side `(input | predicted)` mosaic for eyeballing training progress.

use anyhow::Context;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use image::{Rgb, RgbImage};
use std::path::Path;

/// One row per batch item: the input's color channels on the left, the
/// prediction on the right, both clamped to [0, 1].
pub fn render_mosaic<B: Backend>(
    inputs: Tensor<B, 4>,
    predictions: Tensor<B, 4>,
) -> anyhow::Result<RgbImage> {
    let [n, c, h, w] = inputs.dims();
    if c < 3 || predictions.dims() != [n, 3, h, w] {
        anyhow::bail!(
            "cannot tile inputs {:?} with predictions {:?}",
            inputs.dims(),
            predictions.dims()
        );
    }
    let inputs = inputs
        .slice([0..n, 0..3, 0..h, 0..w])
        .clamp(0.0, 1.0)
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("failed to read inputs: {e:?}"))?;
    let predictions = predictions
        .clamp(0.0, 1.0)
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("failed to read predictions: {e:?}"))?;

    let plane = h * w;
    let mut img = RgbImage::new((2 * w) as u32, (n * h) as u32);
    for (i, pixel) in img.pixels_mut().enumerate() {
        let (row, col) = (i / (2 * w), i % (2 * w));
        let (item, y) = (row / h, row % h);
        let (src, x) = if col < w {
            (&inputs, col)
        } else {
            (&predictions, col - w)
        };
        let base = item * 3 * plane + y * w + x;
        let px = |ch: usize| (src[base + ch * plane] * 255.0).round() as u8;
        *pixel = Rgb([px(0), px(1), px(2)]);
    }
    Ok(img)
}

pub fn write_preview<B: Backend>(
    inputs: Tensor<B, 4>,
    predictions: Tensor<B, 4>,
    path: &Path,
) -> anyhow::Result<()> {
    let img = render_mosaic(inputs, predictions)?;
    img.save(path)
        .with_context(|| format!("failed to write preview {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn mosaic_places_input_left_and_prediction_right() {
        let device = Default::default();
        // Two 1x2 images; aux channels present on the input.
        let inputs = Tensor::<B, 4>::ones([2, 7, 1, 2], &device);
        let preds = Tensor::<B, 4>::from_data(
            TensorData::new(vec![2.0; 12], [2, 3, 1, 2]),
            &device,
        )
        .neg();
        let img = render_mosaic(inputs, preds).unwrap();
        assert_eq!(img.dimensions(), (4, 2));
        assert_eq!(img.get_pixel(1, 1), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(2, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let device = Default::default();
        let inputs = Tensor::<B, 4>::ones([1, 3, 2, 2], &device);
        let preds = Tensor::<B, 4>::ones([1, 3, 2, 3], &device);
        assert!(render_mosaic(inputs, preds).is_err());
    }
}
