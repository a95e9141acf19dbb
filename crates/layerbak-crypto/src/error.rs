use layerbak_core::LayerId;
use thiserror::Error;

use crate::SALT_SIZE;

/// Errors from key derivation, the layer cipher, and the layer chain.
///
/// Messages never carry passphrase or key material.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("salt must be {SALT_SIZE} bytes, got {0}")]
    InvalidSaltLength(usize),

    /// PKCS#7 unpadding failed. Almost always a wrong passphrase.
    #[error("invalid padding: wrong passphrase or corrupted data")]
    Padding,

    #[error("malformed layer blob: {0}")]
    MalformedBlob(String),

    #[error("decryption failed at layer {layer}: {source}")]
    Decryption {
        layer: LayerId,
        #[source]
        source: Box<CryptoError>,
    },

    #[error("layer {0} is not part of the configured chain")]
    UnknownLayer(LayerId),

    #[error("no passphrases supplied: at least one layer is required")]
    NoLayers,

    #[error("backup envelope: {0}")]
    Envelope(String),
}

impl CryptoError {
    /// The layer a chain decryption failed at, if any.
    pub fn failed_layer(&self) -> Option<LayerId> {
        match self {
            CryptoError::Decryption { layer, .. } => Some(*layer),
            _ => None,
        }
    }
}
