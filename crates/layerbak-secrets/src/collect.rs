use layerbak_core::{LayerChain, LayerId, PassphraseMap};
use secrecy::ExposeSecret;

use crate::error::SecretsError;
use crate::prompt::SecretPrompt;

/// Assemble one passphrase per configured layer, ascending.
///
/// Layers present in `provided` are used as-is and never re-confirmed. The
/// rest are read from `prompt`. With `verify` set, each freshly typed
/// passphrase is read a second time and must match exactly; a mismatch on
/// any layer discards everything collected so far.
pub fn collect_passphrases(
    chain: &LayerChain,
    mut provided: PassphraseMap,
    verify: bool,
    prompt: &mut dyn SecretPrompt,
) -> Result<PassphraseMap, SecretsError> {
    if let Some(unknown) = provided.keys().find(|id| chain.layer(**id).is_none()) {
        return Err(SecretsError::UnknownLayer(*unknown));
    }

    let mut collected = PassphraseMap::new();
    for layer in chain.layers() {
        let id = layer.id;
        if let Some(given) = provided.remove(&id) {
            tracing::debug!(layer = %id, "using supplied passphrase");
            collected.insert(id, given);
            continue;
        }

        let entered = prompt
            .prompt_secret(&format!("Enter passphrase {id}: "), layer.color)
            .map_err(|source| prompt_error(id, source))?;

        if verify {
            let confirmed = prompt
                .prompt_secret(&format!("Verify passphrase {id}: "), layer.color)
                .map_err(|source| prompt_error(id, source))?;
            if entered.expose_secret() != confirmed.expose_secret() {
                tracing::warn!(layer = %id, "passphrase confirmation mismatch");
                return Err(SecretsError::Mismatch { layer: id });
            }
        }

        tracing::debug!(layer = %id, verified = verify, "passphrase entered");
        collected.insert(id, entered);
    }

    Ok(collected)
}

fn prompt_error(layer: LayerId, source: std::io::Error) -> SecretsError {
    SecretsError::Prompt { layer, source }
}
