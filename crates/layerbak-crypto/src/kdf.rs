//! Key derivation: PBKDF2-HMAC-SHA256 passphrase → layer key

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::{KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

/// A 256-bit layer key. Lives only for one layer operation; zeroized on drop.
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive a layer key from a passphrase and a 16-byte salt.
///
/// Deterministic in (passphrase, salt). Any other salt length is rejected:
/// PBKDF2 would happily accept it and silently produce a different key.
pub fn derive_key(passphrase: &[u8], salt: &[u8]) -> Result<DerivedKey, CryptoError> {
    if salt.len() != SALT_SIZE {
        return Err(CryptoError::InvalidSaltLength(salt.len()));
    }

    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(passphrase, salt, PBKDF2_ITERATIONS, &mut bytes);
    Ok(DerivedKey { bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kdf_deterministic() {
        let salt = [1u8; SALT_SIZE];
        let key1 = derive_key(b"test-passphrase-123", &salt).unwrap();
        let key2 = derive_key(b"test-passphrase-123", &salt).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let salt = [1u8; SALT_SIZE];
        let key1 = derive_key(b"passphrase-a", &salt).unwrap();
        let key2 = derive_key(b"passphrase-b", &salt).unwrap();

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different passphrases must produce different keys"
        );
    }

    #[test]
    fn test_kdf_different_salts() {
        let key1 = derive_key(b"same-passphrase", &[1u8; SALT_SIZE]).unwrap();
        let key2 = derive_key(b"same-passphrase", &[2u8; SALT_SIZE]).unwrap();

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different salts must produce different keys"
        );
    }

    #[test]
    fn test_kdf_uses_full_iteration_count() {
        let salt = *b"saltsaltsaltsalt";
        let key = derive_key(b"password", &salt).unwrap();

        let mut single_round = [0u8; KEY_SIZE];
        pbkdf2_hmac::<Sha256>(b"password", &salt, 1, &mut single_round);
        assert_ne!(key.as_bytes(), &single_round);
    }

    #[test]
    fn test_kdf_rejects_short_salt() {
        let err = derive_key(b"pw", b"dkdcA").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidSaltLength(5)));
    }

    #[test]
    fn test_kdf_rejects_long_salt() {
        let err = derive_key(b"pw", &[0u8; 32]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidSaltLength(32)));
    }

    #[test]
    fn test_kdf_empty_passphrase() {
        let key = derive_key(b"", &[0u8; SALT_SIZE]).unwrap();
        assert_ne!(key.as_bytes(), &[0u8; KEY_SIZE]);
    }

    #[test]
    fn test_debug_redacts() {
        let key = derive_key(b"pw", &[0u8; SALT_SIZE]).unwrap();
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
    }
}
