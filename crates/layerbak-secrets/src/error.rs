use layerbak_core::LayerId;

/// Passphrase collection errors. None of them carry a passphrase value.
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("passphrases for layer {layer} do not match")]
    Mismatch { layer: LayerId },

    #[error("could not read passphrase for layer {layer}: {source}")]
    Prompt {
        layer: LayerId,
        #[source]
        source: std::io::Error,
    },

    #[error("passphrase supplied for layer {0}, which is not configured")]
    UnknownLayer(LayerId),
}
