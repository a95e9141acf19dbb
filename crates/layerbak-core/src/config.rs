use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::{ConfigError, LayerbakResult};
use crate::types::{
    LayerChain, LayerColor, LayerConfig, LayerId, SaltMode, StaticSalt, MAX_LAYERS,
};

/// Top-level configuration (loaded from layerbak.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerbakConfig {
    pub layers: LayersConfig,
    pub storage: StorageConfig,
    pub backup: BackupConfig,
    pub logging: LoggingConfig,
}

impl LayerbakConfig {
    /// Parse a TOML document and validate its layer section.
    pub fn from_toml(content: &str) -> LayerbakResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.layer_chain()?;
        Ok(config)
    }

    /// Build the validated layer chain described by `[layers]`.
    pub fn layer_chain(&self) -> Result<LayerChain, ConfigError> {
        self.layers.layer_chain()
    }
}

/// Default config location: `$HOME/.config/layerbak/config.toml`
pub fn default_config_path() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".config/layerbak/config.toml")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayersConfig {
    /// Number of layers, A.. (default: 3, max 26)
    pub count: usize,
    /// "random" (fresh salt per backup) or "static" (fixed salt per layer)
    pub salt_mode: SaltMode,
    /// Per-layer salt/color overrides
    #[serde(rename = "layer", skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<LayerOverride>,
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            count: 3,
            salt_mode: SaltMode::Random,
            overrides: Vec::new(),
        }
    }
}

impl LayersConfig {
    pub fn layer_chain(&self) -> Result<LayerChain, ConfigError> {
        if self.count == 0 || self.count > MAX_LAYERS {
            return Err(ConfigError::LayerCount(self.count));
        }

        let mut layers = (0..self.count)
            .map(|i| LayerId::from_index(i).map(LayerConfig::new))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = BTreeSet::new();
        for o in &self.overrides {
            if !seen.insert(o.id) {
                return Err(ConfigError::DuplicateLayer(o.id));
            }
            let layer = layers
                .get_mut(o.id.index())
                .ok_or(ConfigError::OverrideOutOfRange(o.id))?;
            if let Some(salt) = &o.salt {
                layer.static_salt = Some(StaticSalt::new(o.id, salt.as_bytes())?);
                if self.salt_mode == SaltMode::Random {
                    tracing::warn!(layer = %o.id, "static salt configured but salt_mode is random; it will not be used");
                }
            }
            if let Some(color) = o.color {
                layer.color = color;
            }
        }

        LayerChain::new(self.salt_mode, layers)
    }
}

/// `[[layers.layer]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerOverride {
    pub id: LayerId,
    /// Static salt, exactly 16 bytes of UTF-8
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<LayerColor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Fs,
    S3,
    Gcs,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// fs, s3, gcs, or memory
    pub backend: StorageBackend,
    /// Root directory (fs) or key root inside the bucket (s3/gcs)
    pub root: String,
    /// Bucket name (s3/gcs)
    pub bucket: String,
    /// S3-compatible endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// GCS service-account credential file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_path: Option<PathBuf>,
    /// Reject plaintext HTTP S3 endpoints
    pub enforce_tls: bool,
    /// Object prefix under which backups are stored
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            root: "~/.local/share/layerbak/backups".into(),
            bucket: String::new(),
            endpoint: String::new(),
            region: "us-east-1".into(),
            credential_path: None,
            enforce_tls: false,
            prefix: "metadata".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Backup object name prefix, followed by `_YYYYMMDD_HHMMSS`
    pub name_prefix: String,
    /// Backup object extension (without leading dot)
    pub extension: String,
    /// Prefix the layered ciphertext with the versioned envelope header
    pub envelope: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            name_prefix: "metadata_backup".into(),
            extension: "db.enc".into(),
            envelope: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayerbakError;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[layers]
count = 4
salt_mode = "static"

[[layers.layer]]
id = "A"
salt = "0123456789abcdef"
color = "white"

[[layers.layer]]
id = "d"
color = "bright_cyan"

[storage]
backend = "s3"
bucket = "dkdc-dl"
endpoint = "https://s3.example.com"
region = "us-west-2"
enforce_tls = true
prefix = "metadata"

[backup]
name_prefix = "nightly"
extension = "sql.enc"
envelope = false

[logging]
level = "debug"
format = "json"
"#;
        let config: LayerbakConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.layers.count, 4);
        assert_eq!(config.layers.salt_mode, SaltMode::Static);
        assert_eq!(config.layers.overrides.len(), 2);
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.bucket, "dkdc-dl");
        assert!(config.storage.enforce_tls);
        assert_eq!(config.backup.name_prefix, "nightly");
        assert!(!config.backup.envelope);
        assert_eq!(config.logging.format, "json");

        let chain = config.layer_chain().unwrap();
        assert_eq!(chain.len(), 4);
        assert_eq!(chain.salt_mode(), SaltMode::Static);

        let a = LayerId::from_letter('A').unwrap();
        let d = LayerId::from_letter('D').unwrap();
        assert_eq!(
            chain.static_salt(a).unwrap().as_bytes(),
            b"0123456789abcdef"
        );
        assert_eq!(chain.layer(a).unwrap().color, LayerColor::White);
        assert_eq!(chain.layer(d).unwrap().color, LayerColor::BrightCyan);
        assert_eq!(
            chain.static_salt(d).unwrap().as_bytes(),
            b"layerbak-layer-D"
        );
    }

    #[test]
    fn test_parse_defaults() {
        let config: LayerbakConfig = toml::from_str("").unwrap();

        assert_eq!(config.layers.count, 3);
        assert_eq!(config.layers.salt_mode, SaltMode::Random);
        assert_eq!(config.storage.backend, StorageBackend::Fs);
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.backup.name_prefix, "metadata_backup");
        assert_eq!(config.backup.extension, "db.enc");
        assert!(config.backup.envelope);
        assert_eq!(config.logging.level, "info");

        let chain = config.layer_chain().unwrap();
        let letters: Vec<char> = chain.ids().map(|id| id.letter()).collect();
        assert_eq!(letters, vec!['A', 'B', 'C']);
    }

    #[test]
    fn test_too_many_layers_is_fatal() {
        let config: LayerbakConfig = toml::from_str("[layers]\ncount = 27\n").unwrap();
        assert!(matches!(
            config.layer_chain(),
            Err(ConfigError::LayerCount(27))
        ));
    }

    #[test]
    fn test_override_outside_count() {
        let toml_str = r#"
[layers]
count = 2

[[layers.layer]]
id = "C"
color = "white"
"#;
        let config: LayerbakConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.layer_chain(),
            Err(ConfigError::OverrideOutOfRange(_))
        ));
    }

    #[test]
    fn test_short_static_salt_rejected() {
        let toml_str = r#"
[layers]
salt_mode = "static"

[[layers.layer]]
id = "B"
salt = "dkdcB"
"#;
        let config: LayerbakConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.layer_chain(),
            Err(ConfigError::StaticSaltLength { actual: 5, .. })
        ));
    }

    #[test]
    fn test_duplicate_override_rejected() {
        let toml_str = r#"
[[layers.layer]]
id = "A"
color = "white"

[[layers.layer]]
id = "a"
color = "bright_red"
"#;
        let config: LayerbakConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.layer_chain(),
            Err(ConfigError::DuplicateLayer(_))
        ));
    }

    #[test]
    fn test_invalid_layer_id_fails_parse() {
        let toml_str = r#"
[[layers.layer]]
id = "AA"
"#;
        assert!(toml::from_str::<LayerbakConfig>(toml_str).is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut config = LayerbakConfig::default();
        config.layers.overrides.push(LayerOverride {
            id: LayerId::from_letter('B').unwrap(),
            salt: None,
            color: Some(LayerColor::White),
        });
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: LayerbakConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.layers.count, parsed.layers.count);
        assert_eq!(parsed.layers.overrides.len(), 1);
        assert_eq!(parsed.layers.overrides[0].color, Some(LayerColor::White));
        assert_eq!(config.storage.root, parsed.storage.root);
        assert_eq!(config.backup.extension, parsed.backup.extension);
    }

    #[test]
    fn test_from_toml_validates_layers() {
        assert!(LayerbakConfig::from_toml("[layers]\ncount = 4\n").is_ok());

        let err = LayerbakConfig::from_toml("[layers]\ncount = 0\n").unwrap_err();
        assert!(matches!(err, LayerbakError::Config(ConfigError::LayerCount(0))));

        let err = LayerbakConfig::from_toml("[layers\n").unwrap_err();
        assert!(matches!(err, LayerbakError::Parse(_)));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[layers]\nsalt_mode = \"static\"\n\n[storage]\nbackend = \"memory\"\n",
        )
        .unwrap();

        let config = LayerbakConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.layers.salt_mode, SaltMode::Static);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.layer_chain().unwrap().len(), 3);
    }
}
