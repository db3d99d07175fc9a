//! Strongly-typed identifiers for the stock domain.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StockError;

/// Technical identifier of a stock record (the aggregate root).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockId(Uuid);

impl StockId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StockId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for StockId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for StockId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<StockId> for Uuid {
    fn from(value: StockId) -> Self {
        value.0
    }
}

impl FromStr for StockId {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| StockError::invalid_id(format!("StockId: {e}")))?;
        Ok(Self(uuid))
    }
}

macro_rules! impl_key_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create from a business key string; must not be blank.
            pub fn new(value: impl Into<String>) -> Result<Self, StockError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(StockError::invalid_id(concat!($name, " must not be blank")));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = StockError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

/// Business identifier of a product (e.g. a SKU like `ERICSSON-5G-RAD-001`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

/// Business identifier of a warehouse (e.g. `TX-HUB-DALLAS`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(String);

/// Party that owns the stock in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl_key_newtype!(ProductId, "ProductId");
impl_key_newtype!(WarehouseId, "WarehouseId");
impl_key_newtype!(OwnerId, "OwnerId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_keys_reject_blank_values() {
        assert!(ProductId::new("  ").is_err());
        assert!(WarehouseId::new("").is_err());
        assert!(OwnerId::new("ATT-NETWORK-OPS").is_ok());
    }

    #[test]
    fn stock_id_round_trips_through_string() {
        let id = StockId::new();
        let parsed: StockId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn stock_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<StockId>().is_err());
    }
}
