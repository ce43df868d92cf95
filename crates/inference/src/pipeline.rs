//! Image in, image out.

use crate::tiling::{denoise_tiled, TileConfig};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use image::{GrayImage, RgbImage};
use models::Denoiser;
use scene_dataset::ImageChw;

/// Albedo and incidence buffers matching the color image.
pub struct AuxImages<'a> {
    pub albedo: &'a RgbImage,
    pub incidence: &'a GrayImage,
}

/// Build the `[1, C, H, W]` model input: RGB, then albedo and incidence when given.
pub fn input_tensor<B: Backend>(
    color: &RgbImage,
    aux: Option<AuxImages<'_>>,
    device: &B::Device,
) -> anyhow::Result<Tensor<B, 4>> {
    let mut chw = ImageChw::from_rgb8(color);
    if let Some(aux) = aux {
        if aux.albedo.dimensions() != color.dimensions()
            || aux.incidence.dimensions() != color.dimensions()
        {
            anyhow::bail!(
                "aux buffers {:?}/{:?} do not match image {:?}",
                aux.albedo.dimensions(),
                aux.incidence.dimensions(),
                color.dimensions()
            );
        }
        chw = chw
            .concat_channels(&ImageChw::from_rgb8(aux.albedo))?
            .concat_channels(&ImageChw::from_luma8(aux.incidence))?;
    }
    let shape = [1, chw.channels, chw.height, chw.width];
    Ok(Tensor::from_data(
        TensorData::new(chw.data, shape).convert::<B::FloatElem>(),
        device,
    ))
}

/// Convert a `[1, 3, H, W]` prediction back to 8-bit RGB, clamping to [0, 1].
pub fn output_image<B: Backend>(prediction: Tensor<B, 4>) -> anyhow::Result<RgbImage> {
    let [_, c, h, w] = prediction.dims();
    let data = prediction
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("failed to read prediction: {e:?}"))?;
    Ok(ImageChw::new(c, h, w, data)?.to_rgb8()?)
}

pub fn denoise_image<B: Backend, M: Denoiser<B> + ?Sized>(
    model: &M,
    color: &RgbImage,
    aux: Option<AuxImages<'_>>,
    tiles: TileConfig,
    device: &B::Device,
) -> anyhow::Result<RgbImage> {
    let input = input_tensor::<B>(color, aux, device)?;
    let output = denoise_tiled(model, input, tiles)?;
    output_image(output)
}
