//! Ordered layer chain: multi-encrypt (ascending layers) and multi-decrypt
//! (the exact reverse).
//!
//! The set of layers applied is the set of identities present in the
//! passphrase map. Decryption must be given the same set; the blob carries
//! no record of which layers were used (see [`crate::envelope`] for that).

use layerbak_core::{LayerChain, LayerId, PassphraseMap, SaltMode};
use secrecy::SecretString;

use crate::error::CryptoError;
use crate::layer::{decrypt_layer, encrypt_layer, layer_output_len};

/// Wrap `plaintext` in one layer per supplied passphrase, A first.
///
/// Identities without a passphrase are skipped. Passphrases for identities
/// the chain does not configure are rejected rather than ignored.
pub fn multi_encrypt(
    plaintext: &[u8],
    passphrases: &PassphraseMap,
    chain: &LayerChain,
) -> Result<Vec<u8>, CryptoError> {
    let plan = plan(passphrases, chain)?;

    let mut encrypted: Option<Vec<u8>> = None;
    for (id, passphrase) in &plan {
        let input = encrypted.as_deref().unwrap_or(plaintext);
        let output = encrypt_layer(input, passphrase, salt_for(chain, *id))?;
        tracing::debug!(layer = %id, in_bytes = input.len(), out_bytes = output.len(), "layer encrypted");
        encrypted = Some(output);
    }

    let encrypted = encrypted.ok_or(CryptoError::NoLayers)?;
    tracing::info!(
        layers = plan.len(),
        salt_mode = %chain.salt_mode(),
        plaintext_bytes = plaintext.len(),
        ciphertext_bytes = encrypted.len(),
        "multi-layer encryption complete"
    );
    Ok(encrypted)
}

/// Peel the layers off `blob` in reverse order (last layer first).
///
/// The first layer that fails aborts the whole chain with
/// [`CryptoError::Decryption`] naming that layer. No partial output is
/// returned.
///
/// Only the layers present in `passphrases` are peeled. Leaving out an
/// inner layer's passphrase cannot be detected here: the outer layers
/// decrypt cleanly and the result is that inner layer's ciphertext, not an
/// error. Use [`crate::envelope::open`] on sealed backups, which checks the
/// recorded layer set before decrypting.
pub fn multi_decrypt(
    blob: &[u8],
    passphrases: &PassphraseMap,
    chain: &LayerChain,
) -> Result<Vec<u8>, CryptoError> {
    let plan = plan(passphrases, chain)?;

    let mut decrypted: Option<Vec<u8>> = None;
    for (id, passphrase) in plan.iter().rev() {
        let input = decrypted.as_deref().unwrap_or(blob);
        let output = decrypt_layer(input, passphrase, salt_for(chain, *id)).map_err(|e| {
            tracing::debug!(layer = %id, "layer decryption failed");
            CryptoError::Decryption {
                layer: *id,
                source: Box::new(e),
            }
        })?;
        tracing::debug!(layer = %id, in_bytes = input.len(), out_bytes = output.len(), "layer decrypted");
        decrypted = Some(output);
    }

    let decrypted = decrypted.ok_or(CryptoError::NoLayers)?;
    tracing::info!(
        layers = plan.len(),
        salt_mode = %chain.salt_mode(),
        plaintext_bytes = decrypted.len(),
        "multi-layer decryption complete"
    );
    Ok(decrypted)
}

/// Total blob size after wrapping `plaintext_len` bytes in `layers` layers.
pub fn chain_output_len(plaintext_len: usize, layers: usize, chain: &LayerChain) -> usize {
    let embed_salt = chain.salt_mode() == SaltMode::Random;
    (0..layers).fold(plaintext_len, |len, _| layer_output_len(len, embed_salt))
}

/// Configured layers that have a passphrase, ascending.
fn plan<'a>(
    passphrases: &'a PassphraseMap,
    chain: &LayerChain,
) -> Result<Vec<(LayerId, &'a SecretString)>, CryptoError> {
    if let Some(unknown) = passphrases.keys().find(|id| chain.layer(**id).is_none()) {
        return Err(CryptoError::UnknownLayer(*unknown));
    }

    let plan: Vec<_> = chain
        .ids()
        .filter_map(|id| passphrases.get(&id).map(|p| (id, p)))
        .collect();
    if plan.is_empty() {
        return Err(CryptoError::NoLayers);
    }
    Ok(plan)
}

fn salt_for(chain: &LayerChain, id: LayerId) -> Option<&[u8]> {
    chain.static_salt(id).map(|s| &s.as_bytes()[..])
}
