//! Indexing scene directories and loading their images.
//!
//! Layout of one scene:
//! ```text
//! <root>/<scene>/target.png       3-channel, S x S
//! <root>/<scene>/input_<N>.png    3-channel, S x S or 2S x S (two renders side by side)
//! <root>/<scene>/albedo.png       3-channel, S x S (aux mode)
//! <root>/<scene>/incidence.png    1-channel, S x S (aux mode)
//! ```

use crate::splits::{is_hidden, split_of};
use crate::types::{DatasetResult, ImageChw, SceneDatasetError, SceneIndex, Split};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TARGET_FILE: &str = "target.png";
pub const ALBEDO_FILE: &str = "albedo.png";
pub const INCIDENCE_FILE: &str = "incidence.png";

pub fn input_file(samples: u32) -> String {
    format!("input_{samples}.png")
}

/// How a file is decoded into channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Rgb,
    Luma,
}

impl ImageKind {
    pub fn for_file(name: &str) -> Self {
        if name == INCIDENCE_FILE {
            ImageKind::Luma
        } else {
            ImageKind::Rgb
        }
    }
}

/// Every non-hidden scene directory directly under `root`, sorted by name.
///
/// A directory whose name is not UTF-8 cannot be assigned a split, so it is an
/// error rather than skipped.
pub fn list_scene_dirs(root: &Path) -> DatasetResult<Vec<SceneIndex>> {
    let io_err = |e| SceneDatasetError::Io {
        path: root.to_path_buf(),
        source: e,
    };
    let mut scenes = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err)? {
        let dir = entry.map_err(io_err)?.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(name) = dir.file_name().and_then(|s| s.to_str()).map(str::to_string) else {
            return Err(SceneDatasetError::NonUtf8Name(dir));
        };
        if is_hidden(&name) {
            continue;
        }
        scenes.push(SceneIndex { name, dir });
    }
    // read_dir order is platform dependent; sort so seeded runs reproduce.
    scenes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(scenes)
}

/// List the immediate scene subdirectories of `root` that fall in `split`.
///
/// Hidden entries are skipped. An empty result is a configuration error.
pub fn index_scenes(root: &Path, split: Split, test_prefixes: &[String]) -> DatasetResult<Vec<SceneIndex>> {
    let scenes: Vec<_> = list_scene_dirs(root)?
        .into_iter()
        .filter(|scene| split_of(&scene.name, test_prefixes) == split)
        .collect();
    if scenes.is_empty() {
        return Err(SceneDatasetError::EmptySplit {
            root: root.to_path_buf(),
            split,
        });
    }
    Ok(scenes)
}

/// Decode one scene file, failing with `MissingFile` when it is absent.
pub fn load_scene_image(scene: &Path, file: &str) -> DatasetResult<ImageChw> {
    let path = scene.join(file);
    if !path.exists() {
        return Err(SceneDatasetError::MissingFile {
            scene: scene.to_path_buf(),
            file: file.to_string(),
        });
    }
    decode_image(&path, ImageKind::for_file(file))
}

pub fn decode_image(path: &Path, kind: ImageKind) -> DatasetResult<ImageChw> {
    let img = image::open(path).map_err(|e| SceneDatasetError::Image {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(match kind {
        ImageKind::Rgb => ImageChw::from_rgb8(&img.to_rgb8()),
        ImageKind::Luma => ImageChw::from_luma8(&img.to_luma8()),
    })
}

/// Decoded images keyed by path, populated once and never mutated afterwards.
#[derive(Debug, Default)]
pub struct ImageCache {
    images: HashMap<PathBuf, Arc<ImageChw>>,
}

impl ImageCache {
    /// Decode every listed file of every scene in parallel.
    pub fn populate(scenes: &[SceneIndex], files: &[String]) -> DatasetResult<Self> {
        let jobs: Vec<(&SceneIndex, &String)> = scenes
            .iter()
            .flat_map(|s| files.iter().map(move |f| (s, f)))
            .collect();
        let decoded: DatasetResult<Vec<(PathBuf, Arc<ImageChw>)>> = jobs
            .par_iter()
            .map(|(scene, file)| {
                let img = load_scene_image(&scene.dir, file)?;
                Ok((scene.dir.join(file.as_str()), Arc::new(img)))
            })
            .collect();
        Ok(Self {
            images: decoded?.into_iter().collect(),
        })
    }

    pub fn get(&self, path: &Path) -> Option<Arc<ImageChw>> {
        self.images.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Load through the cache when one is present, else straight from disk.
pub fn fetch(cache: Option<&ImageCache>, scene: &Path, file: &str) -> DatasetResult<Arc<ImageChw>> {
    if let Some(img) = cache.and_then(|c| c.get(&scene.join(file))) {
        return Ok(img);
    }
    load_scene_image(scene, file).map(Arc::new)
}
