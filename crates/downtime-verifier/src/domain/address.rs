//! Producer identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Block height on the execution layer.
pub type BlockHeight = u64;

/// Numeric validator identifier as used by the authority registry.
pub type ValidatorId = u64;

/// Address that appears as block author.
///
/// Services disagree on hex casing, so the address is stored lower-cased and
/// equality is case-insensitive by construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ProducerAddress(String);

impl ProducerAddress {
    /// Create an address, normalising case and surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    /// Normalised textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if no address text was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ProducerAddress {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for ProducerAddress {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<ProducerAddress> for String {
    fn from(address: ProducerAddress) -> Self {
        address.0
    }
}

impl fmt::Display for ProducerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
