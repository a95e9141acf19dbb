//! Single-layer AES-256-CBC encryption/decryption
//!
//! Layer blob format (binary):
//! ```text
//! random-salt mode: [16 bytes: salt][16 bytes: IV][N*16 bytes: ciphertext]
//! static-salt mode:                 [16 bytes: IV][N*16 bytes: ciphertext]
//! ```
//!
//! The plaintext is always PKCS#7-padded, so an empty plaintext still yields
//! one ciphertext block.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

use crate::error::CryptoError;
use crate::kdf::derive_key;
use crate::{BLOCK_SIZE, IV_SIZE, SALT_SIZE};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypt one layer.
///
/// - `salt = None`: random-salt mode. A fresh 16-byte salt is drawn and
///   written at the front of the blob.
/// - `salt = Some(s)`: static-salt mode. `s` (16 bytes) keys the KDF and is
///   not stored.
///
/// A fresh random IV is drawn on every call in both modes.
///
/// Returns: `[salt?][IV][ciphertext]`
pub fn encrypt_layer(
    plaintext: &[u8],
    passphrase: &SecretString,
    salt: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    let mut rng = rand::thread_rng();

    let mut random_salt = [0u8; SALT_SIZE];
    let embed_salt = salt.is_none();
    let salt = match salt {
        Some(s) => s,
        None => {
            rng.fill_bytes(&mut random_salt);
            &random_salt[..]
        }
    };

    let key = derive_key(passphrase.expose_secret().as_bytes(), salt)?;

    let mut iv = [0u8; IV_SIZE];
    rng.fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut blob = Vec::with_capacity(layer_output_len(plaintext.len(), embed_salt));
    if embed_salt {
        blob.extend_from_slice(salt);
    }
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt one layer produced by [`encrypt_layer`].
///
/// `salt` must be the same mode that was used to encrypt: `None` reads the
/// salt from the blob, `Some(s)` uses the configured static salt.
///
/// Fails with [`CryptoError::Padding`] when the recovered padding is not
/// valid PKCS#7, which is what a wrong passphrase looks like. This is a
/// heuristic, not an integrity check.
pub fn decrypt_layer(
    blob: &[u8],
    passphrase: &SecretString,
    salt: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    let (salt, body) = match salt {
        Some(s) => (s, blob),
        None => {
            if blob.len() < SALT_SIZE {
                return Err(CryptoError::MalformedBlob(format!(
                    "{} bytes is too short for a salt header",
                    blob.len()
                )));
            }
            blob.split_at(SALT_SIZE)
        }
    };

    if body.len() < IV_SIZE + BLOCK_SIZE {
        return Err(CryptoError::MalformedBlob(format!(
            "{} bytes after salt (minimum {})",
            body.len(),
            IV_SIZE + BLOCK_SIZE
        )));
    }
    let (iv, ciphertext) = body.split_at(IV_SIZE);
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::MalformedBlob(format!(
            "ciphertext length {} is not a multiple of {BLOCK_SIZE}",
            ciphertext.len()
        )));
    }

    let key = derive_key(passphrase.expose_secret().as_bytes(), salt)?;

    Aes256CbcDec::new(key.as_bytes().into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Padding)
}

/// Exact size of the blob [`encrypt_layer`] produces for `plaintext_len` bytes.
///
/// PKCS#7 always adds 1..=16 bytes, so the ciphertext is
/// `(plaintext_len / 16 + 1) * 16`.
pub fn layer_output_len(plaintext_len: usize, embed_salt: bool) -> usize {
    let header = if embed_salt { SALT_SIZE + IV_SIZE } else { IV_SIZE };
    header + (plaintext_len / BLOCK_SIZE + 1) * BLOCK_SIZE
}
