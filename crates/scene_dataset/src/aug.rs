//! Paired augmentation: one randomly drawn policy applied identically to every
//! co-registered image of a sample (noisy input, target, auxiliary buffers).
//!
//! Apply order is fixed:
//! 1. mixup: a double-width image is split at the horizontal midpoint and the
//!    halves are blended with the policy's binary mask (`a*m + b*(1-m)`)
//! 2. crop to `[y..y+crop, x..x+crop]`
//! 3. `rotation` quarter turns (transpose, then reverse the row axis)
//! 4. `flip_x` (reverse columns)
//! 5. `flip_y` (reverse rows)
//! 6. channel permutation, only for 3-channel images
//!
//! Pixel values are expected to be normalized to [0, 1] before `apply`.

use crate::types::{AugStrength, DatasetResult, ImageChw, SceneDatasetError};
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationPolicy {
    source_size: usize,
    crop_size: usize,
    x: usize,
    y: usize,
    flip_x: bool,
    flip_y: bool,
    rotation: u8,
    channel_perm: [usize; 3],
    /// Row-major `source_size * source_size` blend mask; `true` picks the left half.
    mix_mask: Vec<bool>,
}

impl AugmentationPolicy {
    /// Draw a fresh policy for a square source of `source_size` pixels.
    pub fn sample<R: Rng + ?Sized>(
        rng: &mut R,
        source_size: usize,
        crop_size: usize,
        strength: AugStrength,
    ) -> DatasetResult<Self> {
        check_crop(source_size, crop_size)?;
        let x = rng.random_range(0..source_size - crop_size);
        let y = rng.random_range(0..source_size - crop_size);
        let flip_x = rng.random_bool(0.5);

        let mut flip_y = false;
        let mut rotation = 0u8;
        let mut channel_perm = [0usize, 1, 2];
        if strength == AugStrength::Extended {
            flip_y = rng.random_bool(0.5);
            rotation = rng.random_range(0..4u8);
            channel_perm.shuffle(rng);
        }

        let mix_mask = random_mask(rng, source_size * source_size);

        Ok(Self {
            source_size,
            crop_size,
            x,
            y,
            flip_x,
            flip_y,
            rotation,
            channel_perm,
            mix_mask,
        })
    }

    /// A pure crop at `(x, y)`: no flips, no rotation, identity permutation,
    /// and a mask that selects the left half of a mixup source.
    pub fn crop(source_size: usize, crop_size: usize, x: usize, y: usize) -> DatasetResult<Self> {
        check_crop(source_size, crop_size)?;
        if x + crop_size > source_size || y + crop_size > source_size {
            return Err(SceneDatasetError::InvalidConfig(format!(
                "crop offset ({x}, {y}) + {crop_size} exceeds source size {source_size}"
            )));
        }
        Ok(Self {
            source_size,
            crop_size,
            x,
            y,
            flip_x: false,
            flip_y: false,
            rotation: 0,
            channel_perm: [0, 1, 2],
            mix_mask: vec![true; source_size * source_size],
        })
    }

    pub fn with_flips(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }

    pub fn with_rotation(mut self, quarter_turns: u8) -> Self {
        self.rotation = quarter_turns % 4;
        self
    }

    pub fn with_channel_perm(mut self, perm: [usize; 3]) -> DatasetResult<Self> {
        let mut seen = [false; 3];
        for &c in &perm {
            if c >= 3 || seen[c] {
                return Err(SceneDatasetError::InvalidConfig(format!(
                    "{perm:?} is not a permutation of [0, 1, 2]"
                )));
            }
            seen[c] = true;
        }
        self.channel_perm = perm;
        Ok(self)
    }

    pub fn with_mix_mask(mut self, mask: Vec<bool>) -> DatasetResult<Self> {
        if mask.len() != self.source_size * self.source_size {
            return Err(SceneDatasetError::ShapeMismatch(format!(
                "mix mask has {} entries, expected {}",
                mask.len(),
                self.source_size * self.source_size
            )));
        }
        self.mix_mask = mask;
        Ok(self)
    }

    pub fn source_size(&self) -> usize {
        self.source_size
    }

    pub fn crop_size(&self) -> usize {
        self.crop_size
    }

    pub fn offset(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn flips(&self) -> (bool, bool) {
        (self.flip_x, self.flip_y)
    }

    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    pub fn channel_perm(&self) -> [usize; 3] {
        self.channel_perm
    }

    /// Transform one image. The result is always `crop_size x crop_size`.
    pub fn apply(&self, image: &ImageChw) -> DatasetResult<ImageChw> {
        let square = if image.width == 2 * image.height {
            self.check_square(image.height)?;
            blend_halves(image, &self.mix_mask)
        } else {
            if image.width != image.height {
                return Err(SceneDatasetError::ShapeMismatch(format!(
                    "expected square or double-width image, got {}x{}",
                    image.width, image.height
                )));
            }
            self.check_square(image.height)?;
            image.clone()
        };

        let mut out = crop_window(&square, self.x, self.y, self.crop_size);
        for _ in 0..self.rotation {
            out = rot90(&out);
        }
        if self.flip_x {
            out = flip_columns(&out);
        }
        if self.flip_y {
            out = flip_rows(&out);
        }
        if out.channels == 3 {
            out = permute_channels(&out, self.channel_perm);
        }
        Ok(out)
    }

    fn check_square(&self, size: usize) -> DatasetResult<()> {
        if size != self.source_size {
            return Err(SceneDatasetError::ShapeMismatch(format!(
                "policy drawn for {}px sources applied to a {}px image",
                self.source_size, size
            )));
        }
        Ok(())
    }
}

fn check_crop(source_size: usize, crop_size: usize) -> DatasetResult<()> {
    if crop_size == 0 || source_size <= crop_size {
        return Err(SceneDatasetError::CropTooLarge {
            source_size,
            crop: crop_size,
        });
    }
    Ok(())
}

fn random_mask<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<bool> {
    let mut mask = Vec::with_capacity(len);
    while mask.len() < len {
        let bits: u64 = rng.random();
        let take = (len - mask.len()).min(64);
        mask.extend((0..take).map(|i| (bits >> i) & 1 == 1));
    }
    mask
}

fn blend_halves(image: &ImageChw, mask: &[bool]) -> ImageChw {
    let size = image.height;
    let mut out = ImageChw::zeros(image.channels, size, size);
    for c in 0..image.channels {
        for y in 0..size {
            for x in 0..size {
                let m = mask[y * size + x];
                let v = if m {
                    image.at(c, y, x)
                } else {
                    image.at(c, y, x + size)
                };
                out.data[(c * size + y) * size + x] = v;
            }
        }
    }
    out
}

fn crop_window(image: &ImageChw, x0: usize, y0: usize, size: usize) -> ImageChw {
    let mut data = Vec::with_capacity(image.channels * size * size);
    for c in 0..image.channels {
        for y in y0..y0 + size {
            let row = (c * image.height + y) * image.width;
            data.extend_from_slice(&image.data[row + x0..row + x0 + size]);
        }
    }
    ImageChw {
        channels: image.channels,
        height: size,
        width: size,
        data,
    }
}

/// Remap every output pixel from a coordinate function over the source.
fn remap(
    image: &ImageChw,
    height: usize,
    width: usize,
    src: impl Fn(usize, usize) -> (usize, usize),
) -> ImageChw {
    let mut data = Vec::with_capacity(image.channels * height * width);
    for c in 0..image.channels {
        for y in 0..height {
            for x in 0..width {
                let (sy, sx) = src(y, x);
                data.push(image.at(c, sy, sx));
            }
        }
    }
    ImageChw {
        channels: image.channels,
        height,
        width,
        data,
    }
}

/// Transpose, then reverse the row axis.
fn rot90(image: &ImageChw) -> ImageChw {
    let w = image.width;
    remap(image, image.width, image.height, |y, x| (x, w - 1 - y))
}

fn flip_columns(image: &ImageChw) -> ImageChw {
    let w = image.width;
    remap(image, image.height, w, |y, x| (y, w - 1 - x))
}

fn flip_rows(image: &ImageChw) -> ImageChw {
    let h = image.height;
    remap(image, h, image.width, |y, x| (h - 1 - y, x))
}

/// Output channel `i` is read from source channel `perm[i]`.
fn permute_channels(image: &ImageChw, perm: [usize; 3]) -> ImageChw {
    let mut data = Vec::with_capacity(image.data.len());
    for &src in &perm {
        data.extend_from_slice(image.channel(src));
    }
    ImageChw {
        channels: image.channels,
        height: image.height,
        width: image.width,
        data,
    }
}

#[cfg(test)]
mod aug_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ramp(channels: usize, height: usize, width: usize) -> ImageChw {
        let n = channels * height * width;
        let data = (0..n).map(|i| i as f32 / n as f32).collect();
        ImageChw::new(channels, height, width, data).unwrap()
    }

    #[test]
    fn output_is_always_crop_sized() {
        let mut rng = StdRng::seed_from_u64(7);
        for (source, crop) in [(9usize, 4usize), (16, 15), (32, 1), (12, 8)] {
            for strength in [AugStrength::Basic, AugStrength::Extended] {
                for _ in 0..8 {
                    let policy = AugmentationPolicy::sample(&mut rng, source, crop, strength).unwrap();
                    let square = policy.apply(&ramp(3, source, source)).unwrap();
                    let wide = policy.apply(&ramp(3, source, 2 * source)).unwrap();
                    let aux = policy.apply(&ramp(1, source, source)).unwrap();
                    for img in [&square, &wide, &aux] {
                        assert_eq!((img.height, img.width), (crop, crop));
                        assert_eq!(img.data.len(), img.channels * crop * crop);
                    }
                }
            }
        }
    }

    #[test]
    fn same_policy_same_output() {
        let mut rng = StdRng::seed_from_u64(11);
        let policy = AugmentationPolicy::sample(&mut rng, 10, 6, AugStrength::Extended).unwrap();
        let img = ramp(3, 10, 20);
        assert_eq!(policy.apply(&img).unwrap(), policy.apply(&img).unwrap());
    }

    #[test]
    fn basic_strength_only_flips_horizontally() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..32 {
            let policy = AugmentationPolicy::sample(&mut rng, 8, 4, AugStrength::Basic).unwrap();
            assert!(!policy.flips().1);
            assert_eq!(policy.rotation(), 0);
            assert_eq!(policy.channel_perm(), [0, 1, 2]);
        }
    }

    #[test]
    fn pure_crop_only_windows() {
        let img = ramp(3, 6, 6);
        let policy = AugmentationPolicy::crop(6, 3, 2, 1).unwrap();
        let out = policy.apply(&img).unwrap();
        for c in 0..3 {
            for y in 0..3 {
                for x in 0..3 {
                    assert_eq!(out.at(c, y, x), img.at(c, y + 1, x + 2));
                }
            }
        }
    }

    #[test]
    fn mixup_mask_selects_halves() {
        let wide = ramp(3, 5, 10);
        let left = AugmentationPolicy::crop(5, 4, 1, 0)
            .unwrap()
            .with_mix_mask(vec![true; 25])
            .unwrap();
        let right = left.clone().with_mix_mask(vec![false; 25]).unwrap();
        let out_left = left.apply(&wide).unwrap();
        let out_right = right.apply(&wide).unwrap();
        for c in 0..3 {
            for y in 0..4 {
                for x in 0..4 {
                    assert_eq!(out_left.at(c, y, x), wide.at(c, y, x + 1));
                    assert_eq!(out_right.at(c, y, x), wide.at(c, y, x + 1 + 5));
                }
            }
        }
    }

    #[test]
    fn half_turn_equals_both_flips() {
        let img = ramp(3, 7, 7);
        let base = AugmentationPolicy::crop(7, 5, 1, 2).unwrap();
        let rotated = base.clone().with_rotation(2).apply(&img).unwrap();
        let flipped = base.with_flips(true, true).apply(&img).unwrap();
        assert_eq!(rotated, flipped);
    }

    #[test]
    fn quarter_turn_moves_corners() {
        let img = ramp(1, 4, 4);
        let out = AugmentationPolicy::crop(4, 3, 0, 0)
            .unwrap()
            .with_rotation(1)
            .apply(&img)
            .unwrap();
        // top-right of the window lands top-left
        assert_eq!(out.at(0, 0, 0), img.at(0, 0, 2));
        assert_eq!(out.at(0, 2, 0), img.at(0, 0, 0));
    }

    #[test]
    fn channel_perm_skips_single_channel_buffers() {
        let policy = AugmentationPolicy::crop(4, 2, 0, 0)
            .unwrap()
            .with_channel_perm([2, 0, 1])
            .unwrap();
        let rgb = ramp(3, 4, 4);
        let out = policy.apply(&rgb).unwrap();
        assert_eq!(out.at(0, 0, 0), rgb.at(2, 0, 0));
        assert_eq!(out.at(1, 1, 1), rgb.at(0, 1, 1));

        let gray = ramp(1, 4, 4);
        let out = policy.apply(&gray).unwrap();
        assert_eq!(out.at(0, 1, 1), gray.at(0, 1, 1));
    }

    #[test]
    fn co_registered_images_stay_aligned() {
        let mut rng = StdRng::seed_from_u64(99);
        let input = ramp(3, 12, 12);
        let target = ImageChw {
            data: input.data.iter().map(|v| v * 0.5).collect(),
            ..input.clone()
        };
        for _ in 0..10 {
            let policy = AugmentationPolicy::sample(&mut rng, 12, 8, AugStrength::Extended).unwrap();
            let a = policy.apply(&input).unwrap();
            let b = policy.apply(&target).unwrap();
            for (va, vb) in a.data.iter().zip(&b.data) {
                assert_eq!(va * 0.5, *vb);
            }
        }
    }

    #[test]
    fn crop_must_be_smaller_than_source() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = AugmentationPolicy::sample(&mut rng, 192, 192, AugStrength::Basic).unwrap_err();
        assert!(matches!(err, SceneDatasetError::CropTooLarge { .. }));
    }

    #[test]
    fn rejects_mismatched_source() {
        let policy = AugmentationPolicy::crop(8, 4, 0, 0).unwrap();
        assert!(policy.apply(&ramp(3, 6, 6)).is_err());
        assert!(policy.apply(&ramp(3, 8, 9)).is_err());
    }
}
