use crate::bilateral::BilateralConfig;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Architecture selector shared by the training and inference tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Linear,
    Shallow,
    Deep,
    Bilateral,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Linear,
        ModelKind::Shallow,
        ModelKind::Deep,
        ModelKind::Bilateral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Shallow => "shallow",
            ModelKind::Deep => "deep",
            ModelKind::Bilateral => "bilateral",
        }
    }

    /// Factor that must divide both spatial dimensions of the model input.
    pub fn dim_lcd(&self) -> usize {
        match self {
            ModelKind::Deep => 4,
            _ => 1,
        }
    }

    /// Pixels the default configuration can see in each direction.
    pub fn receptive_field(&self) -> usize {
        match self {
            ModelKind::Linear => 3,
            ModelKind::Shallow => 4,
            ModelKind::Deep => 42,
            ModelKind::Bilateral => BilateralConfig::default().kernel_size / 2,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ModelKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| ModelError::UnknownModel(s.to_string()))
    }
}
