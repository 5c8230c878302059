//! Price level types with decimal precision

use crate::enums::LevelChangeType;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A single resting level in an orderbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    /// Quantity at this rate
    #[serde(alias = "Quantity", deserialize_with = "deserialize_decimal")]
    pub quantity: Decimal,
    /// Price of this level
    #[serde(alias = "Rate", deserialize_with = "deserialize_decimal")]
    pub rate: Decimal,
}

impl BookEntry {
    /// Create a new book entry
    pub fn new(rate: Decimal, quantity: Decimal) -> Self {
        Self { quantity, rate }
    }

    /// Check if this entry has zero quantity (level removed)
    pub fn is_zero(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// A level change carried by an exchange-state delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LevelChange {
    /// Add, remove or update (absent in snapshots, where every level is an add)
    #[serde(rename = "Type", default)]
    pub change: LevelChangeType,
    /// Price of the level
    #[serde(deserialize_with = "deserialize_decimal")]
    pub rate: Decimal,
    /// New quantity at the level
    #[serde(deserialize_with = "deserialize_decimal")]
    pub quantity: Decimal,
}

impl LevelChange {
    /// Returns true if the level leaves the book
    pub fn is_removal(&self) -> bool {
        self.change == LevelChangeType::Remove || self.quantity.is_zero()
    }
}

/// Decimal from either a JSON string or a JSON number
///
/// v3 sends quantities as strings, the legacy exchange-state feed sends raw
/// numbers; f64 parsing would lose precision on both.
pub(crate) fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use rust_decimal::prelude::FromPrimitive;
    use serde::de::Error;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Decimal::from_str(&s).map_err(D::Error::custom),
        StringOrNumber::Number(n) => {
            let s = n.to_string();
            // Scientific notation (e.g. 5e-6) goes through f64
            if s.contains('e') || s.contains('E') {
                let f = n.as_f64().ok_or_else(|| D::Error::custom("invalid number"))?;
                Decimal::from_f64(f).ok_or_else(|| D::Error::custom("cannot convert to decimal"))
            } else {
                Decimal::from_str(&s).map_err(D::Error::custom)
            }
        }
    }
}

/// Optional variant of [`deserialize_decimal`]; `null` maps to `None`
pub(crate) fn deserialize_optional_decimal<'de, D>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "deserialize_decimal")] Decimal);

    Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(d)| d))
}
