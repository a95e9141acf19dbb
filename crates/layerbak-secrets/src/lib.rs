//! layerbak-secrets: passphrase collection for the layer chain
//!
//! Passphrases come from two places, in order of precedence:
//!   1. Values supplied up front (CLI flags, environment)
//!   2. Masked interactive prompts, one per remaining layer
//!
//! At backup time freshly typed passphrases are entered twice. At restore
//! time they are not: a typo just makes decryption fail.

pub mod collect;
pub mod error;
pub mod prompt;

pub use collect::collect_passphrases;
pub use error::SecretsError;
pub use prompt::{ScriptedPrompt, SecretPrompt, TerminalPrompt};
