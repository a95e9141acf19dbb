//! layerbak-core: shared types for the layered backup cipher
//!
//! - [`types`]: layer identities, per-layer configuration, the validated [`LayerChain`]
//! - [`config`]: `layerbak.toml` schema
//! - [`error`]: configuration and umbrella error types

pub mod config;
pub mod error;
pub mod types;

pub use error::{ConfigError, LayerbakError, LayerbakResult};
pub use types::{
    LayerChain, LayerColor, LayerConfig, LayerId, PassphraseMap, SaltMode, StaticSalt,
    MAX_LAYERS, STATIC_SALT_SIZE,
};
