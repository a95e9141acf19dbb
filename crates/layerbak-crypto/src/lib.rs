//! layerbak-crypto: layered passphrase encryption for backups
//!
//! A backup is wrapped in N independent layers, each keyed by its own
//! passphrase. Every passphrase is required, in order, to recover the
//! plaintext.
//!
//! ```text
//! layer key   = PBKDF2-HMAC-SHA256(passphrase, salt, 100_000 iterations) → 256-bit
//! layer blob  = [salt (16, random-salt mode only)] || IV (16) || AES-256-CBC(PKCS#7(plaintext))
//! chain       = layer_C(layer_B(layer_A(plaintext)))      decrypt: A⁻¹(B⁻¹(C⁻¹(blob)))
//! ```
//!
//! There is no MAC. A wrong passphrase is caught only because PKCS#7
//! unpadding of the garbage it produces usually fails. Under an outer layer
//! the next layer's framing checks make a silent pass practically
//! impossible, but at the innermost layer roughly 1 in 256 wrong
//! passphrases unpads cleanly and returns garbage. Ciphertext tampering is
//! NOT detected.

pub mod chain;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod layer;

pub use chain::{chain_output_len, multi_decrypt, multi_encrypt};
pub use envelope::{open, seal, EnvelopeHeader};
pub use error::CryptoError;
pub use kdf::{derive_key, DerivedKey};
pub use layer::{decrypt_layer, encrypt_layer, layer_output_len};

/// Size of a derived AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of a KDF salt
pub const SALT_SIZE: usize = layerbak_core::STATIC_SALT_SIZE;

/// Size of an AES-CBC initialization vector
pub const IV_SIZE: usize = 16;

/// AES block size
pub const BLOCK_SIZE: usize = 16;

/// PBKDF2 iteration count. Fixed: changing it orphans every existing backup.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
