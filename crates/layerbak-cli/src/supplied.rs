//! Passphrases given up front instead of typed at a prompt

use anyhow::{Context, Result};
use layerbak_core::{LayerChain, LayerId, PassphraseMap};
use secrecy::SecretString;

/// Environment variable holding the passphrase for `layer`.
pub fn env_var_name(layer: LayerId) -> String {
    format!("LAYERBAK_PASSPHRASE_{layer}")
}

/// Parse `--passphrase L=SECRET` values.
pub fn parse_flags(values: &[String]) -> Result<PassphraseMap> {
    let mut map = PassphraseMap::new();
    for value in values {
        // Never echo `value` back: it contains the secret
        let (layer, secret) = value
            .split_once('=')
            .context("--passphrase expects LAYER=SECRET")?;
        let id: LayerId = layer
            .parse()
            .with_context(|| format!("--passphrase: bad layer {layer:?}"))?;
        if map.insert(id, SecretString::from(secret)).is_some() {
            anyhow::bail!("--passphrase given twice for layer {id}");
        }
    }
    Ok(map)
}

/// Flags first, then `LAYERBAK_PASSPHRASE_<L>` for the remaining configured layers.
pub fn gather(
    chain: &LayerChain,
    flags: &[String],
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PassphraseMap> {
    let mut map = parse_flags(flags)?;
    for id in chain.ids() {
        if map.contains_key(&id) {
            continue;
        }
        if let Some(secret) = lookup(&env_var_name(id)) {
            tracing::debug!(layer = %id, "passphrase taken from environment");
            map.insert(id, SecretString::from(secret));
        }
    }
    Ok(map)
}
