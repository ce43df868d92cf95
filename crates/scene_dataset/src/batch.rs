//! Burn batching for paired samples.

use crate::source::{draw_pair, DrawPlan, PairedSampleSource};
use crate::types::{DatasetResult, SamplePair, SceneDatasetError};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use rayon::prelude::*;
use std::time::Instant;

/// A batch of augmented pairs, `[N, C, crop, crop]` inputs and `[N, 3, crop, crop]` targets.
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    pub inputs: Tensor<B, 4>,
    pub targets: Tensor<B, 4>,
}

impl PairedSampleSource {
    /// Draw `batch_size` pairs. Draws are planned in order from the source RNG
    /// and then executed in parallel, so a seeded source reproduces its batches.
    pub fn next_batch<B: Backend>(
        &mut self,
        batch_size: usize,
        device: &B::Device,
    ) -> DatasetResult<PairBatch<B>> {
        if batch_size == 0 {
            return Err(SceneDatasetError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }
        let plans: Vec<DrawPlan> = (0..batch_size).map(|_| self.plan()).collect();

        let t_load = Instant::now();
        let cfg = &self.cfg;
        let cache = self.cache.as_deref();
        let pairs: DatasetResult<Vec<SamplePair>> = plans
            .par_iter()
            .map(|plan| draw_pair(plan, cfg, cache))
            .collect();
        let pairs = pairs?;
        tracing::debug!(
            split = %self.split,
            batch = batch_size,
            load_ms = t_load.elapsed().as_secs_f64() * 1000.0,
            "drew batch"
        );
        self.progress.record(pairs.len(), self.split);
        collate(&pairs, device)
    }
}

/// Stack pairs into batch tensors. All pairs must share one shape.
pub fn collate<B: Backend>(pairs: &[SamplePair], device: &B::Device) -> DatasetResult<PairBatch<B>> {
    let first = pairs.first().ok_or_else(|| {
        SceneDatasetError::InvalidConfig("cannot collate an empty batch".to_string())
    })?;
    let in_shape = [first.input.channels, first.input.height, first.input.width];
    let tgt_shape = [first.target.channels, first.target.height, first.target.width];

    let mut inputs = Vec::with_capacity(pairs.len() * first.input.data.len());
    let mut targets = Vec::with_capacity(pairs.len() * first.target.data.len());
    for pair in pairs {
        let shape = [pair.input.channels, pair.input.height, pair.input.width];
        if shape != in_shape
            || [pair.target.channels, pair.target.height, pair.target.width] != tgt_shape
        {
            return Err(SceneDatasetError::ShapeMismatch(format!(
                "batch mixes input shapes {in_shape:?} and {shape:?}"
            )));
        }
        inputs.extend_from_slice(&pair.input.data);
        targets.extend_from_slice(&pair.target.data);
    }

    let n = pairs.len();
    let inputs = Tensor::<B, 4>::from_data(
        TensorData::new(inputs, [n, in_shape[0], in_shape[1], in_shape[2]])
            .convert::<B::FloatElem>(),
        device,
    );
    let targets = Tensor::<B, 4>::from_data(
        TensorData::new(targets, [n, tgt_shape[0], tgt_shape[1], tgt_shape[2]])
            .convert::<B::FloatElem>(),
        device,
    );
    Ok(PairBatch { inputs, targets })
}
