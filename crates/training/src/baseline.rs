//! Identity baseline: the loss of returning the noisy input unchanged.

use scene_dataset::{DatasetResult, PairedSampleSource, SamplePair};

/// Mean |input - target| over the color channels of one pair.
pub fn identity_error(pair: &SamplePair) -> f32 {
    let color = pair.target.data.len();
    let sum: f32 = pair.input.data[..color]
        .iter()
        .zip(&pair.target.data)
        .map(|(a, b)| (a - b).abs())
        .sum();
    sum / color.max(1) as f32
}

/// Average identity error over the next `samples` draws of `source`.
pub fn identity_baseline(source: &mut PairedSampleSource, samples: usize) -> DatasetResult<f32> {
    if samples == 0 {
        return Ok(0.0);
    }
    let mut total = 0.0;
    for _ in 0..samples {
        total += identity_error(&source.next_pair()?);
    }
    Ok(total / samples as f32)
}
