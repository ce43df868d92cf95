//! Core types, error definitions, and data structures for scene_dataset.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, SceneDatasetError>;

#[derive(Debug, Error)]
pub enum SceneDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("scene directory name is not valid UTF-8: {}", .0.display())]
    NonUtf8Name(PathBuf),
    #[error("scene {scene} is missing {file}")]
    MissingFile { scene: PathBuf, file: String },
    #[error("no {split} scenes found under {root}")]
    EmptySplit { root: PathBuf, split: Split },
    #[error("crop size {crop} must be smaller than source size {source_size}")]
    CropTooLarge { source_size: usize, crop: usize },
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("invalid dataset config: {0}")]
    InvalidConfig(String),
}

/// Which side of the train/test partition a scene belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A float image in CHW layout, values normalized to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageChw {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub data: Vec<f32>,
}

impl ImageChw {
    pub fn new(channels: usize, height: usize, width: usize, data: Vec<f32>) -> DatasetResult<Self> {
        if data.len() != channels * height * width {
            return Err(SceneDatasetError::ShapeMismatch(format!(
                "buffer of {} values cannot hold {channels}x{height}x{width}",
                data.len()
            )));
        }
        Ok(Self {
            channels,
            height,
            width,
            data,
        })
    }

    pub fn zeros(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
            data: vec![0.0; channels * height * width],
        }
    }

    pub fn from_rgb8(img: &image::RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let (w, h) = (w as usize, h as usize);
        let plane = w * h;
        let mut data = vec![0.0f32; 3 * plane];
        for (x, y, pixel) in img.enumerate_pixels() {
            let base = y as usize * w + x as usize;
            data[base] = pixel[0] as f32 / 255.0;
            data[plane + base] = pixel[1] as f32 / 255.0;
            data[2 * plane + base] = pixel[2] as f32 / 255.0;
        }
        Self {
            channels: 3,
            height: h,
            width: w,
            data,
        }
    }

    pub fn from_luma8(img: &image::GrayImage) -> Self {
        let (w, h) = img.dimensions();
        let data = img.as_raw().iter().map(|v| *v as f32 / 255.0).collect();
        Self {
            channels: 1,
            height: h as usize,
            width: w as usize,
            data,
        }
    }

    /// Quantize the first three channels back to 8-bit RGB, clamping to [0, 1].
    pub fn to_rgb8(&self) -> DatasetResult<image::RgbImage> {
        if self.channels < 3 {
            return Err(SceneDatasetError::ShapeMismatch(format!(
                "need 3 channels for RGB output, have {}",
                self.channels
            )));
        }
        let plane = self.plane();
        let img = image::RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let base = y as usize * self.width + x as usize;
            let q = |c: usize| (self.data[c * plane + base].clamp(0.0, 1.0) * 255.0).round() as u8;
            image::Rgb([q(0), q(1), q(2)])
        });
        Ok(img)
    }

    pub fn plane(&self) -> usize {
        self.height * self.width
    }

    #[inline]
    pub fn at(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[(c * self.height + y) * self.width + x]
    }

    pub fn channel(&self, c: usize) -> &[f32] {
        let plane = self.plane();
        &self.data[c * plane..(c + 1) * plane]
    }

    /// Concatenate `other`'s channels after this image's channels.
    pub fn concat_channels(mut self, other: &ImageChw) -> DatasetResult<Self> {
        if other.height != self.height || other.width != self.width {
            return Err(SceneDatasetError::ShapeMismatch(format!(
                "cannot concat {}x{} onto {}x{}",
                other.height, other.width, self.height, self.width
            )));
        }
        self.data.extend_from_slice(&other.data);
        self.channels += other.channels;
        Ok(self)
    }
}

/// One augmented (input, target) pair, both CHW with identical spatial size.
#[derive(Debug, Clone)]
pub struct SamplePair {
    pub input: ImageChw,
    pub target: ImageChw,
}

/// Strength of the augmentation drawn for each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AugStrength {
    /// Crop and horizontal flip only.
    #[default]
    Basic,
    /// Adds vertical flip, quarter-turn rotations and channel permutation.
    Extended,
}

#[derive(Debug, Clone)]
pub struct SceneIndex {
    /// Directory name (the partition key).
    pub name: String,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneReport {
    pub scene: String,
    pub missing: Vec<String>,
    pub bad_shapes: Vec<String>,
}

impl SceneReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.bad_shapes.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitSummary {
    pub split: Option<Split>,
    pub scenes: usize,
    pub healthy: usize,
    pub missing_files: usize,
    pub bad_shapes: usize,
    pub defects: Vec<SceneReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub train: SplitSummary,
    pub test: SplitSummary,
}

impl DatasetSummary {
    pub fn is_healthy(&self) -> bool {
        self.train.defects.is_empty()
            && self.test.defects.is_empty()
            && self.train.scenes > 0
            && self.test.scenes > 0
    }
}
