use burn::backend::Autodiff;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::{Tensor, TensorData};
use burn_ndarray::NdArray;
use models::prelude::*;

type B = NdArray<f32>;
type AD = Autodiff<NdArray<f32>>;

fn noise(shape: [usize; 4]) -> Vec<f32> {
    let len: usize = shape.iter().product();
    (0..len).map(|i| ((i * 7919) % 257) as f32 / 256.0).collect()
}

fn batch<Bk: burn::tensor::backend::Backend>(
    shape: [usize; 4],
    device: &Bk::Device,
) -> Tensor<Bk, 4> {
    Tensor::from_data(TensorData::new(noise(shape), shape), device)
}

fn all_models(in_channels: usize, device: &<B as burn::tensor::backend::Backend>::Device) -> Vec<Box<dyn Denoiser<B>>> {
    vec![
        Box::new(
            LinearDenoiser::new(LinearDenoiserConfig { in_channels, ..Default::default() }, device)
                .unwrap(),
        ),
        Box::new(
            ShallowDenoiser::new(ShallowDenoiserConfig { in_channels, ..Default::default() }, device)
                .unwrap(),
        ),
        Box::new(
            DeepDenoiser::new(
                DeepDenoiserConfig {
                    in_channels,
                    stem: 8,
                    trunk: 16,
                    expansion: 32,
                    residual_blocks: 2,
                    norm_groups: 4,
                },
                device,
            )
            .unwrap(),
        ),
        Box::new(
            BilateralDenoiser::new(
                BilateralConfig { in_channels, kernel_size: 5, ..Default::default() },
                device,
            )
            .unwrap(),
        ),
    ]
}

#[test]
fn every_variant_preserves_batch_and_spatial_dims() {
    let device = Default::default();
    for in_channels in [3, 7] {
        for model in all_models(in_channels, &device) {
            let out = model.denoise(batch::<B>([2, in_channels, 8, 12], &device)).unwrap();
            assert_eq!(out.dims(), [2, 3, 8, 12]);
        }
    }
}

#[test]
fn deep_rejects_sizes_off_the_lcd() {
    let device = Default::default();
    let models = all_models(3, &device);
    let deep = &models[2];
    assert_eq!(deep.dim_lcd(), 4);
    let err = deep.denoise(batch::<B>([1, 3, 10, 8], &device)).unwrap_err();
    assert_eq!(
        err,
        ModelError::DimNotDivisible {
            height: 10,
            width: 8,
            lcd: 4
        }
    );
    // Per-pixel models accept any size.
    assert!(models[1].denoise(batch::<B>([1, 3, 10, 9], &device)).is_ok());
}

#[test]
fn deep_forward_and_predict_reject_sizes_off_the_lcd() {
    let device = Default::default();
    let deep = DeepDenoiser::<B>::new(
        DeepDenoiserConfig {
            stem: 8,
            trunk: 16,
            expansion: 32,
            residual_blocks: 1,
            norm_groups: 4,
            ..Default::default()
        },
        &device,
    )
    .unwrap();
    let expected = ModelError::DimNotDivisible {
        height: 6,
        width: 6,
        lcd: 4,
    };
    let input = Tensor::<B, 4>::zeros([1, 3, 6, 6], &device);
    assert_eq!(deep.forward(input.clone()).unwrap_err(), expected);
    assert_eq!(deep.predict(input.clone()).unwrap_err(), expected);

    let boxed: Box<dyn Denoiser<B>> = Box::new(deep);
    assert_eq!(boxed.predict(input).unwrap_err(), expected);
    let out = boxed.predict(Tensor::zeros([1, 3, 8, 4], &device)).unwrap();
    assert_eq!(out.dims(), [1, 3, 8, 4]);
}

#[test]
fn deep_config_errors_surface_at_construction() {
    let device = Default::default();
    let base = DeepDenoiserConfig {
        stem: 8,
        trunk: 16,
        expansion: 32,
        residual_blocks: 1,
        norm_groups: 4,
        ..Default::default()
    };
    let bad = [
        DeepDenoiserConfig { norm_groups: 7, ..base.clone() },
        DeepDenoiserConfig { norm_groups: 0, ..base.clone() },
        DeepDenoiserConfig { stem: 1, ..base.clone() },
        DeepDenoiserConfig { in_channels: 0, ..base.clone() },
    ];
    for cfg in bad {
        let result = DeepDenoiser::<B>::new(cfg.clone(), &device);
        assert!(
            matches!(result, Err(ModelError::InvalidConfig(_))),
            "{cfg:?}"
        );
    }
    assert!(DeepDenoiser::<B>::new(base, &device).is_ok());
}

#[test]
fn channel_count_is_checked() {
    let device = Default::default();
    let model = ShallowDenoiser::<B>::new(ShallowDenoiserConfig::default(), &device).unwrap();
    let err = model.denoise(batch::<B>([1, 7, 4, 4], &device)).unwrap_err();
    assert_eq!(err, ModelError::ChannelMismatch { expected: 3, actual: 7 });
}

#[test]
fn even_kernels_fail_at_construction() {
    let device = Default::default();
    let linear = LinearDenoiser::<B>::new(
        LinearDenoiserConfig {
            kernel_size: 6,
            ..Default::default()
        },
        &device,
    );
    assert_eq!(linear.unwrap_err(), ModelError::EvenKernel(6));
    let bilateral = BilateralDenoiser::<B>::new(
        BilateralConfig {
            kernel_size: 4,
            ..Default::default()
        },
        &device,
    );
    assert_eq!(bilateral.unwrap_err(), ModelError::EvenKernel(4));
}

#[test]
fn mae_is_mean_absolute_difference() {
    let device = Default::default();
    let pred = Tensor::<B, 4>::from_data(TensorData::new(vec![0.0, 1.0, 0.5, 0.25], [1, 1, 2, 2]), &device);
    let target = Tensor::<B, 4>::from_data(TensorData::new(vec![1.0, 1.0, 0.0, 0.75], [1, 1, 2, 2]), &device);
    let loss = mae_loss(pred, target).unwrap().into_scalar();
    assert!((loss - 0.5).abs() < 1e-6);

    let mismatch = mae_loss(
        Tensor::<B, 4>::zeros([1, 3, 2, 2], &device),
        Tensor::<B, 4>::zeros([1, 3, 2, 3], &device),
    );
    assert!(matches!(mismatch, Err(ModelError::ShapeMismatch { .. })));
}

#[test]
fn one_adam_step_moves_bilateral_sigmas() {
    let device = Default::default();
    let mut model = BilateralDenoiser::<AD>::new(
        BilateralConfig {
            kernel_size: 3,
            ..Default::default()
        },
        &device,
    )
    .unwrap();
    let before = model.sigmas();
    let mut optim = AdamConfig::new().init();

    let input = batch::<AD>([1, 3, 6, 6], &device);
    let target = Tensor::<AD, 4>::full([1, 3, 6, 6], 0.5, &device);
    let loss = model.loss(input, target).unwrap();
    let grads = GradientsParams::from_grads(loss.backward(), &model);
    model = optim.step(1e-2, model, grads);

    let after = model.sigmas();
    assert!(after.0.is_finite() && after.1.is_finite());
    assert_ne!(before, after);
}

#[test]
fn one_adam_step_trains_a_conv_model() {
    let device = Default::default();
    let mut model = LinearDenoiser::<AD>::new(LinearDenoiserConfig::default(), &device).unwrap();
    let mut optim = AdamConfig::new().init();
    let input = batch::<AD>([2, 3, 8, 8], &device);
    let target = input.clone().detach();

    let loss = model.loss(input, target).unwrap();
    let first = loss.clone().into_scalar();
    let grads = GradientsParams::from_grads(loss.backward(), &model);
    model = optim.step(1e-3, model, grads);
    assert!(first.is_finite());
    assert_eq!(model.in_channels(), 3);
}
