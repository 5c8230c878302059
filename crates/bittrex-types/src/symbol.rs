//! Market symbols (BTC-ETH format)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market symbol, two currency codes joined by a dash
///
/// Symbols are stored upper-case; the hub's channel names and the REST
/// paths both use that form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarketSymbol(String);

impl MarketSymbol {
    /// Create a symbol without validation
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_ascii_uppercase())
    }

    /// Get the symbol as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two currency codes, in the order they appear
    pub fn currencies(&self) -> Option<(&str, &str)> {
        self.0.split_once('-')
    }
}

impl FromStr for MarketSymbol {
    type Err = SymbolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (left, right) = s
            .split_once('-')
            .ok_or_else(|| SymbolParseError::MissingDash(s.to_string()))?;

        if left.is_empty() || right.is_empty() {
            return Err(SymbolParseError::EmptyPart(s.to_string()));
        }
        if right.contains('-') {
            return Err(SymbolParseError::InvalidFormat(s.to_string()));
        }

        Ok(Self::new(s))
    }
}

impl TryFrom<String> for MarketSymbol {
    type Error = SymbolParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MarketSymbol> for String {
    fn from(symbol: MarketSymbol) -> Self {
        symbol.0
    }
}

impl fmt::Display for MarketSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MarketSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error parsing a market symbol
#[derive(Debug, Clone, thiserror::Error)]
pub enum SymbolParseError {
    #[error("Market symbol must contain '-': {0}")]
    MissingDash(String),

    #[error("Invalid market symbol: {0}")]
    InvalidFormat(String),

    #[error("Market symbol has an empty currency: {0}")]
    EmptyPart(String),
}
