//! Static configuration for the storefront the flow authenticates against.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Minimum access level that grants clerk access to a store.
pub const DEFAULT_MIN_ACCESS_LEVEL: u64 = 1;

/// Configuration the flow needs about its store.
///
/// The store id may be overridden at runtime by a value persisted in the
/// checkpoint store (a host session switching stores); the configured value
/// is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Identifier of the store in the on-chain registry.
    pub store_id: B256,
    /// Minimum access level required to operate the store.
    #[serde(default = "default_min_access_level")]
    pub min_access_level: u64,
}

const fn default_min_access_level() -> u64 {
    DEFAULT_MIN_ACCESS_LEVEL
}

impl StoreConfig {
    /// Creates a configuration with the default access threshold.
    #[must_use]
    pub const fn new(store_id: B256) -> Self {
        Self {
            store_id,
            min_access_level: DEFAULT_MIN_ACCESS_LEVEL,
        }
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidInput`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        serde_json::from_str(json).map_err(|e| AuthError::invalid_input("config", e.to_string()))
    }
}
