use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("kernel size must be odd, got {0}")]
    EvenKernel(usize),
    #[error("unknown model {0:?}; expected one of linear, shallow, deep, bilateral")]
    UnknownModel(String),
    #[error("spatial size {height}x{width} is not a multiple of {lcd}")]
    DimNotDivisible {
        height: usize,
        width: usize,
        lcd: usize,
    },
    #[error("model expects {expected} input channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("invalid model config: {0}")]
    InvalidConfig(String),
    #[error("shape mismatch: prediction {prediction:?} vs target {target:?}")]
    ShapeMismatch {
        prediction: [usize; 4],
        target: [usize; 4],
    },
}
