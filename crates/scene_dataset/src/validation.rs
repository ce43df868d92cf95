//! Dataset integrity checks: missing files and resolution mismatches per scene.

use crate::scene::{input_file, list_scene_dirs, ALBEDO_FILE, INCIDENCE_FILE, TARGET_FILE};
use crate::source::SourceConfig;
use crate::splits::split_of;
use crate::types::{DatasetResult, DatasetSummary, SceneIndex, SceneReport, Split, SplitSummary};
use rayon::prelude::*;
use std::path::Path;

/// Check one scene against the files `cfg` would read.
pub fn check_scene(scene: &SceneIndex, cfg: &SourceConfig) -> SceneReport {
    let mut report = SceneReport {
        scene: scene.name.clone(),
        ..Default::default()
    };

    let target = scene.dir.join(TARGET_FILE);
    let size = match image::image_dimensions(&target) {
        Ok((w, h)) if w == h => Some(w),
        Ok((w, h)) => {
            report
                .bad_shapes
                .push(format!("{TARGET_FILE}: {w}x{h} is not square"));
            None
        }
        Err(_) if !target.exists() => {
            report.missing.push(TARGET_FILE.to_string());
            None
        }
        Err(e) => {
            report.bad_shapes.push(format!("{TARGET_FILE}: {e}"));
            None
        }
    };

    let mut expectations: Vec<(String, bool)> = cfg
        .noise_levels
        .iter()
        .map(|n| (input_file(*n), true))
        .collect();
    if cfg.aux {
        expectations.push((ALBEDO_FILE.to_string(), false));
        expectations.push((INCIDENCE_FILE.to_string(), false));
    }

    for (file, may_be_wide) in expectations {
        let path = scene.dir.join(&file);
        if !path.exists() {
            report.missing.push(file);
            continue;
        }
        let Some(s) = size else { continue };
        match image::image_dimensions(&path) {
            Ok((w, h)) => {
                let ok = h == s && (w == s || (may_be_wide && w == 2 * s));
                if !ok {
                    report
                        .bad_shapes
                        .push(format!("{file}: {w}x{h} does not match {s}x{s} target"));
                }
            }
            Err(e) => report.bad_shapes.push(format!("{file}: {e}")),
        }
    }
    report
}

fn summarize_split(split: Split, scenes: &[SceneIndex], cfg: &SourceConfig) -> SplitSummary {
    let reports: Vec<SceneReport> = scenes.par_iter().map(|s| check_scene(s, cfg)).collect();
    let mut summary = SplitSummary {
        split: Some(split),
        scenes: scenes.len(),
        ..Default::default()
    };
    for report in reports {
        if report.is_ok() {
            summary.healthy += 1;
            continue;
        }
        if !report.missing.is_empty() {
            summary.missing_files += 1;
        }
        if !report.bad_shapes.is_empty() {
            summary.bad_shapes += 1;
        }
        summary.defects.push(report);
    }
    summary
}

/// Walk every scene under `root`, both splits. Unlike `index_scenes`, an empty
/// split is reported rather than treated as an error.
pub fn summarize_root(root: &Path, cfg: &SourceConfig) -> DatasetResult<DatasetSummary> {
    let (test, train): (Vec<_>, Vec<_>) = list_scene_dirs(root)?
        .into_iter()
        .partition(|scene| split_of(&scene.name, &cfg.test_prefixes) == Split::Test);
    Ok(DatasetSummary {
        train: summarize_split(Split::Train, &train, cfg),
        test: summarize_split(Split::Test, &test, cfg),
    })
}
