//! Versioned backup envelope
//!
//! A bare chain result says nothing about how it was produced. The envelope
//! prefixes it with a small header so a restore can refuse a mismatched
//! configuration up front instead of failing deep inside a layer:
//!
//! ```text
//! [4 bytes: "LBAK"][1: version][1: salt mode][1: layer count N][N: layer indices][chain result]
//! ```
//!
//! The header is checked, never obeyed: layers are still taken from the
//! caller's passphrase map and configuration.

use layerbak_core::{LayerChain, LayerId, PassphraseMap, SaltMode};

use crate::chain::{multi_decrypt, multi_encrypt};
use crate::error::CryptoError;

/// Envelope magic bytes
pub const MAGIC: &[u8; 4] = b"LBAK";

/// Current envelope format version
pub const VERSION: u8 = 1;

const FIXED_HEADER_LEN: usize = MAGIC.len() + 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub version: u8,
    pub salt_mode: SaltMode,
    /// Layers applied, ascending
    pub layers: Vec<LayerId>,
}

impl EnvelopeHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_HEADER_LEN + self.layers.len());
        out.extend_from_slice(MAGIC);
        out.push(self.version);
        out.push(salt_mode_tag(self.salt_mode));
        out.push(self.layers.len() as u8);
        out.extend(self.layers.iter().map(|id| id.index() as u8));
        out
    }

    /// Parse a header, returning it and the remaining chain result.
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), CryptoError> {
        if data.len() < FIXED_HEADER_LEN {
            return Err(CryptoError::Envelope(format!(
                "{} bytes is too short for a header",
                data.len()
            )));
        }
        if &data[..MAGIC.len()] != MAGIC {
            return Err(CryptoError::Envelope(
                "missing LBAK magic (raw chain output? restore with --raw)".into(),
            ));
        }

        let version = data[4];
        if version != VERSION {
            return Err(CryptoError::Envelope(format!(
                "unsupported envelope version {version} (this build reads {VERSION})"
            )));
        }

        let salt_mode = match data[5] {
            0 => SaltMode::Random,
            1 => SaltMode::Static,
            other => {
                return Err(CryptoError::Envelope(format!("unknown salt mode tag {other}")))
            }
        };

        let count = data[6] as usize;
        let rest = &data[FIXED_HEADER_LEN..];
        if rest.len() < count {
            return Err(CryptoError::Envelope(format!(
                "header lists {count} layers but only {} bytes follow",
                rest.len()
            )));
        }
        let (ids, body) = rest.split_at(count);

        let layers = ids
            .iter()
            .map(|&i| LayerId::from_index(i as usize))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CryptoError::Envelope(e.to_string()))?;
        if layers.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CryptoError::Envelope(
                "layer list is not strictly ascending".into(),
            ));
        }

        Ok((
            Self {
                version,
                salt_mode,
                layers,
            },
            body,
        ))
    }

    /// Fail unless `passphrases` and `chain` describe exactly this backup.
    pub fn check(&self, passphrases: &PassphraseMap, chain: &LayerChain) -> Result<(), CryptoError> {
        if self.salt_mode != chain.salt_mode() {
            return Err(CryptoError::Envelope(format!(
                "backup uses {} salts but the configuration uses {} salts",
                self.salt_mode,
                chain.salt_mode()
            )));
        }

        let missing: Vec<_> = self
            .layers
            .iter()
            .filter(|id| !passphrases.contains_key(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CryptoError::Envelope(format!(
                "missing passphrase for layer(s) {}",
                missing.join(", ")
            )));
        }

        let unexpected: Vec<_> = passphrases
            .keys()
            .filter(|id| !self.layers.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !unexpected.is_empty() {
            return Err(CryptoError::Envelope(format!(
                "layer(s) {} were not used for this backup",
                unexpected.join(", ")
            )));
        }

        Ok(())
    }
}

/// `multi_encrypt` with an envelope header recording mode and layers.
pub fn seal(
    plaintext: &[u8],
    passphrases: &PassphraseMap,
    chain: &LayerChain,
) -> Result<Vec<u8>, CryptoError> {
    let body = multi_encrypt(plaintext, passphrases, chain)?;

    let header = EnvelopeHeader {
        version: VERSION,
        salt_mode: chain.salt_mode(),
        layers: passphrases.keys().copied().collect(),
    };

    let mut out = header.encode();
    out.extend_from_slice(&body);
    Ok(out)
}

/// Check the envelope header against the caller's layers, then `multi_decrypt`.
pub fn open(
    envelope: &[u8],
    passphrases: &PassphraseMap,
    chain: &LayerChain,
) -> Result<Vec<u8>, CryptoError> {
    let (header, body) = EnvelopeHeader::parse(envelope)?;
    header.check(passphrases, chain)?;
    multi_decrypt(body, passphrases, chain)
}

fn salt_mode_tag(mode: SaltMode) -> u8 {
    match mode {
        SaltMode::Random => 0,
        SaltMode::Static => 1,
    }
}
