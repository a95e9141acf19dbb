use thiserror::Error;

use crate::types::{LayerId, MAX_LAYERS, STATIC_SALT_SIZE};

pub type LayerbakResult<T> = Result<T, LayerbakError>;

/// Structural configuration errors. These are programmer/operator mistakes,
/// detected when a [`crate::LayerChain`] is built, and always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("layer index {0} exceeds maximum of {max} (A-Z)", max = MAX_LAYERS - 1)]
    LayerIndexOutOfRange(usize),

    #[error("invalid layer identity {0:?} (expected a single letter A-Z)")]
    InvalidLayerLetter(String),

    #[error("layer count must be between 1 and {MAX_LAYERS}, got {0}")]
    LayerCount(usize),

    #[error("layer {0} is configured more than once")]
    DuplicateLayer(LayerId),

    #[error("salt_mode is static but layer {0} has no static salt")]
    MissingStaticSalt(LayerId),

    #[error("static salt for layer {layer} must be {STATIC_SALT_SIZE} bytes, got {actual}")]
    StaticSaltLength { layer: LayerId, actual: usize },

    #[error("layer override for {0} is outside the configured layer count")]
    OverrideOutOfRange(LayerId),
}

#[derive(Debug, Error)]
pub enum LayerbakError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
