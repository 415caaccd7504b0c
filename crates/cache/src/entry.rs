//! Cache entries and fetch errors.

use fly8_core::types::Timestamp;
use serde_json::Value;

use crate::key::QueryKey;

/// Why a fetch failed. Cloneable so it can live on the entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The fetch did not finish within the store's timeout.
    #[error("Request timed out")]
    Timeout,

    /// The backend rejected the credential.
    #[error("Not authenticated")]
    Unauthorized,

    /// Non-2xx status from the backend.
    #[error("Server error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Network or decode failure.
    #[error("Fetch failed: {0}")]
    Failed(String),
}

/// Snapshot of one cached query.
///
/// `is_fetching` and `error` are never both set. `data` survives
/// invalidation and failed refetches.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub data: Option<Value>,
    pub fetched_at: Option<Timestamp>,
    pub is_stale: bool,
    pub is_fetching: bool,
    pub error: Option<FetchError>,
}

impl CacheEntry {
    /// An unfetched entry. Empty entries start stale.
    pub fn empty(key: QueryKey) -> Self {
        Self {
            key,
            data: None,
            fetched_at: None,
            is_stale: true,
            is_fetching: false,
            error: None,
        }
    }

    /// First load in progress with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.is_fetching
    }

    /// Decode the cached data into `T`.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.data.as_ref().map(|v| serde_json::from_value(v.clone()))
    }
}
