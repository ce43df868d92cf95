//! Differentiable bilateral filter with learned bandwidths.
//!
//! Each output pixel is a normalized, weighted sum over its `K×K`
//! neighborhood, with weights
//! `exp(-((neighbor - center)² / diff_sigma² + distance² / blur_sigma²))`
//! computed per channel. Only the leading three (color) channels are filtered.

use crate::error::{ModelError, ModelResult};
use crate::layers::check_kernel;
use crate::Denoiser;
use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Offset used to push border padding far outside the [0, 1] pixel range.
pub const PAD_OFFSET: f32 = 100.0;

#[derive(Debug, Clone)]
pub struct BilateralConfig {
    pub in_channels: usize,
    pub kernel_size: usize,
    pub blur_sigma: f32,
    pub diff_sigma: f32,
}

impl Default for BilateralConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            kernel_size: 15,
            blur_sigma: 1.7016,
            diff_sigma: 0.4821,
        }
    }
}

#[derive(Debug, Module)]
pub struct BilateralDenoiser<B: Backend> {
    blur_sigma: Param<Tensor<B, 1>>,
    diff_sigma: Param<Tensor<B, 1>>,
    kernel_size: usize,
    in_channels: usize,
}

impl<B: Backend> BilateralDenoiser<B> {
    pub fn new(cfg: BilateralConfig, device: &B::Device) -> ModelResult<Self> {
        check_kernel(cfg.kernel_size)?;
        if cfg.in_channels < 3 {
            return Err(ModelError::InvalidConfig(format!(
                "bilateral filter needs at least 3 color channels, got {}",
                cfg.in_channels
            )));
        }
        Ok(Self {
            blur_sigma: Param::from_tensor(Tensor::from_floats([cfg.blur_sigma], device)),
            diff_sigma: Param::from_tensor(Tensor::from_floats([cfg.diff_sigma], device)),
            kernel_size: cfg.kernel_size,
            in_channels: cfg.in_channels,
        })
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// Current `(blur_sigma, diff_sigma)`.
    pub fn sigmas(&self) -> (f32, f32) {
        let read = |p: &Param<Tensor<B, 1>>| {
            p.val()
                .into_data()
                .to_vec::<f32>()
                .ok()
                .and_then(|v| v.first().copied())
                .unwrap_or(f32::NAN)
        };
        (read(&self.blur_sigma), read(&self.diff_sigma))
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let [n, _, h, w] = input.dims();
        let colors = input.slice([0..n, 0..3, 0..h, 0..w]);
        let channels = 3;
        let device = colors.device();
        let k = self.kernel_size;
        let r = k / 2;

        // Sentinel border, plus an explicit mask so padded neighbors weigh exactly zero.
        let padded = pad_zeros(colors.clone().add_scalar(PAD_OFFSET), r).sub_scalar(PAD_OFFSET);
        let valid = pad_zeros(Tensor::<B, 4>::ones([1, 1, h, w], &device), r);

        let inv_blur = self.blur_sigma.val().powi_scalar(2).recip().reshape([1, 1, 1, 1]);
        let inv_diff = self.diff_sigma.val().powi_scalar(2).recip().reshape([1, 1, 1, 1]);

        let mut weighted = Tensor::<B, 4>::zeros([n, channels, h, w], &device);
        let mut total = Tensor::<B, 4>::zeros([n, channels, h, w], &device);
        for dy in 0..k {
            for dx in 0..k {
                let neighbor = padded
                    .clone()
                    .slice([0..n, 0..channels, dy..dy + h, dx..dx + w]);
                let mask = valid.clone().slice([0..1, 0..1, dy..dy + h, dx..dx + w]);
                let dist2 = (dy.abs_diff(r).pow(2) + dx.abs_diff(r).pow(2)) as f32;

                let range = (neighbor.clone() - colors.clone()).powi_scalar(2) * inv_diff.clone();
                let spatial = inv_blur.clone().mul_scalar(dist2);
                let weight = (range + spatial).neg().exp() * mask;

                weighted = weighted + weight.clone() * neighbor;
                total = total + weight;
            }
        }
        weighted / total
    }
}

fn pad_zeros<B: Backend>(x: Tensor<B, 4>, r: usize) -> Tensor<B, 4> {
    if r == 0 {
        return x;
    }
    let [n, c, h, w] = x.dims();
    let device = x.device();
    let cols = Tensor::<B, 4>::zeros([n, c, h, r], &device);
    let x = Tensor::cat(vec![cols.clone(), x, cols], 3);
    let rows = Tensor::<B, 4>::zeros([n, c, r, w + 2 * r], &device);
    Tensor::cat(vec![rows.clone(), x, rows], 2)
}

impl<B: Backend> Denoiser<B> for BilateralDenoiser<B> {
    fn dim_lcd(&self) -> usize {
        1
    }

    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn predict(&self, input: Tensor<B, 4>) -> ModelResult<Tensor<B, 4>> {
        Ok(self.forward(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    const H: usize = 5;
    const W: usize = 6;

    fn ramp() -> Vec<f32> {
        (0..3 * H * W).map(|i| ((i * 37) % 101) as f32 / 100.0).collect()
    }

    fn run(cfg: BilateralConfig, data: &[f32]) -> Vec<f32> {
        let device = Default::default();
        let model = BilateralDenoiser::<B>::new(cfg, &device).expect("odd kernel");
        let input = Tensor::<B, 4>::from_data(TensorData::new(data.to_vec(), [1, 3, H, W]), &device);
        model
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .expect("f32 output")
    }

    /// Normalized spatial-only filter over in-bounds neighbors.
    fn reference(data: &[f32], k: usize, weight: impl Fn(usize) -> f32) -> Vec<f32> {
        let r = (k / 2) as isize;
        let mut out = vec![0.0; data.len()];
        for c in 0..3 {
            for y in 0..H as isize {
                for x in 0..W as isize {
                    let (mut num, mut den) = (0.0, 0.0);
                    for dy in -r..=r {
                        for dx in -r..=r {
                            let (ny, nx) = (y + dy, x + dx);
                            if ny < 0 || nx < 0 || ny >= H as isize || nx >= W as isize {
                                continue;
                            }
                            let wgt = weight((dy * dy + dx * dx) as usize);
                            num += wgt * data[c * H * W + ny as usize * W + nx as usize];
                            den += wgt;
                        }
                    }
                    out[c * H * W + y as usize * W + x as usize] = num / den;
                }
            }
        }
        out
    }

    fn assert_close(a: &[f32], b: &[f32], tol: f32) {
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            assert!((x - y).abs() < tol, "index {i}: {x} vs {y}");
        }
    }

    #[test]
    fn wide_range_sigma_is_a_gaussian_blur() {
        let data = ramp();
        let cfg = BilateralConfig {
            kernel_size: 5,
            blur_sigma: 1.3,
            diff_sigma: 1e4,
            ..Default::default()
        };
        let expected = reference(&data, 5, |d2| (-(d2 as f32) / (1.3 * 1.3)).exp());
        assert_close(&run(cfg, &data), &expected, 1e-4);
    }

    #[test]
    fn wide_spatial_sigma_is_a_box_average() {
        let data = ramp();
        let cfg = BilateralConfig {
            kernel_size: 3,
            blur_sigma: 1e4,
            diff_sigma: 1e4,
            ..Default::default()
        };
        let expected = reference(&data, 3, |_| 1.0);
        assert_close(&run(cfg, &data), &expected, 1e-4);
    }

    #[test]
    fn constant_image_is_a_fixed_point() {
        let data = vec![0.25; 3 * H * W];
        let out = run(BilateralConfig::default(), &data);
        assert_close(&out, &data, 1e-5);
    }

    #[test]
    fn aux_channels_are_dropped() {
        let device = Default::default();
        let model = BilateralDenoiser::<B>::new(
            BilateralConfig {
                in_channels: 7,
                kernel_size: 3,
                ..Default::default()
            },
            &device,
        )
        .expect("odd kernel");
        let out = model.forward(Tensor::ones([2, 7, 4, 4], &device));
        assert_eq!(out.dims(), [2, 3, 4, 4]);
    }

    #[test]
    fn fewer_than_three_channels_is_rejected() {
        let device = Default::default();
        for in_channels in [1, 2] {
            let cfg = BilateralConfig {
                in_channels,
                ..Default::default()
            };
            assert!(matches!(
                BilateralDenoiser::<B>::new(cfg, &device),
                Err(ModelError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn sigmas_start_at_configured_values() {
        let device = Default::default();
        let model = BilateralDenoiser::<B>::new(BilateralConfig::default(), &device).expect("odd kernel");
        let (blur, diff) = model.sigmas();
        assert!((blur - 1.7016).abs() < 1e-6);
        assert!((diff - 0.4821).abs() < 1e-6);
        assert_eq!(model.kernel_size(), 15);
    }
}
