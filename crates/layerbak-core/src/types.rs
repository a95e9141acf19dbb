use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on layers imposed by the A-Z labeling scheme.
pub const MAX_LAYERS: usize = 26;

/// Size of a per-layer static salt (and of the random salt in random-salt mode).
pub const STATIC_SALT_SIZE: usize = 16;

/// Passphrases keyed by layer, iterated in ascending (encryption) order.
pub type PassphraseMap = BTreeMap<LayerId, SecretString>;

/// Identity of one encryption layer, displayed as a letter `A`..`Z`.
///
/// The derived ordering is the encryption order; decryption walks it in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LayerId(u8);

impl LayerId {
    pub fn from_index(index: usize) -> Result<Self, ConfigError> {
        if index >= MAX_LAYERS {
            return Err(ConfigError::LayerIndexOutOfRange(index));
        }
        Ok(Self(index as u8))
    }

    pub fn from_letter(letter: char) -> Result<Self, ConfigError> {
        let upper = letter.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return Err(ConfigError::InvalidLayerLetter(letter.to_string()));
        }
        Ok(Self(upper as u8 - b'A'))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn letter(self) -> char {
        (b'A' + self.0) as char
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for LayerId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_letter(c),
            _ => Err(ConfigError::InvalidLayerLetter(s.to_string())),
        }
    }
}

impl TryFrom<String> for LayerId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LayerId> for String {
    fn from(id: LayerId) -> Self {
        id.letter().to_string()
    }
}

/// Color used when prompting for a layer's passphrase. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerColor {
    BrightRed,
    BrightGreen,
    BrightBlue,
    BrightYellow,
    BrightMagenta,
    BrightCyan,
    White,
}

impl LayerColor {
    const PALETTE: [LayerColor; 6] = [
        LayerColor::BrightRed,
        LayerColor::BrightGreen,
        LayerColor::BrightBlue,
        LayerColor::BrightYellow,
        LayerColor::BrightMagenta,
        LayerColor::BrightCyan,
    ];

    /// Default color for a layer: the palette cycles red, green, blue, ...
    pub fn default_for(id: LayerId) -> Self {
        Self::PALETTE[id.index() % Self::PALETTE.len()]
    }
}

/// How each layer obtains the salt fed to the KDF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaltMode {
    /// Fresh random salt per encryption, stored at the front of the layer blob.
    #[default]
    Random,
    /// Fixed per-layer salt from configuration; only the IV travels in the blob.
    Static,
}

impl fmt::Display for SaltMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaltMode::Random => f.write_str("random"),
            SaltMode::Static => f.write_str("static"),
        }
    }
}

/// A fixed 16-byte salt bound to one layer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSalt([u8; STATIC_SALT_SIZE]);

impl StaticSalt {
    pub fn new(layer: LayerId, bytes: &[u8]) -> Result<Self, ConfigError> {
        let salt = <[u8; STATIC_SALT_SIZE]>::try_from(bytes).map_err(|_| {
            ConfigError::StaticSaltLength {
                layer,
                actual: bytes.len(),
            }
        })?;
        Ok(Self(salt))
    }

    /// `layerbak-layer-A`, `layerbak-layer-B`, ...: exactly 16 ASCII bytes.
    pub fn default_for(layer: LayerId) -> Self {
        let mut salt = *b"layerbak-layer-?";
        salt[STATIC_SALT_SIZE - 1] = layer.letter() as u8;
        Self(salt)
    }

    pub fn as_bytes(&self) -> &[u8; STATIC_SALT_SIZE] {
        &self.0
    }
}

/// Binding of a layer identity to its salt policy and prompt color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    pub id: LayerId,
    /// Present in static-salt mode; ignored in random-salt mode.
    pub static_salt: Option<StaticSalt>,
    pub color: LayerColor,
}

impl LayerConfig {
    /// Layer with the default color and default static salt.
    pub fn new(id: LayerId) -> Self {
        Self {
            id,
            static_salt: Some(StaticSalt::default_for(id)),
            color: LayerColor::default_for(id),
        }
    }
}

/// A validated, ascending set of layers sharing one salt mode.
///
/// This is the explicit configuration value handed to the chain functions;
/// nothing in the cipher path reads global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerChain {
    salt_mode: SaltMode,
    layers: Vec<LayerConfig>,
}

impl LayerChain {
    pub fn new(salt_mode: SaltMode, mut layers: Vec<LayerConfig>) -> Result<Self, ConfigError> {
        if layers.is_empty() || layers.len() > MAX_LAYERS {
            return Err(ConfigError::LayerCount(layers.len()));
        }

        layers.sort_by_key(|layer| layer.id);
        for pair in layers.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(ConfigError::DuplicateLayer(pair[0].id));
            }
        }

        if salt_mode == SaltMode::Static {
            if let Some(layer) = layers.iter().find(|l| l.static_salt.is_none()) {
                return Err(ConfigError::MissingStaticSalt(layer.id));
            }
        }

        Ok(Self { salt_mode, layers })
    }

    /// Layers `A..` up to `count` with default colors and salts.
    pub fn standard(count: usize, salt_mode: SaltMode) -> Result<Self, ConfigError> {
        if count == 0 || count > MAX_LAYERS {
            return Err(ConfigError::LayerCount(count));
        }
        let layers = (0..count)
            .map(|i| LayerId::from_index(i).map(LayerConfig::new))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(salt_mode, layers)
    }

    pub fn salt_mode(&self) -> SaltMode {
        self.salt_mode
    }

    /// Layers in ascending (encryption) order.
    pub fn layers(&self) -> &[LayerConfig] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&LayerConfig> {
        self.layers
            .binary_search_by_key(&id, |l| l.id)
            .ok()
            .map(|i| &self.layers[i])
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = LayerId> + '_ {
        self.layers.iter().map(|l| l.id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The salt the KDF must use for `id`, or `None` when the layer draws a
    /// fresh random salt (random-salt mode).
    pub fn static_salt(&self, id: LayerId) -> Option<&StaticSalt> {
        match self.salt_mode {
            SaltMode::Random => None,
            SaltMode::Static => self.layer(id).and_then(|l| l.static_salt.as_ref()),
        }
    }
}
