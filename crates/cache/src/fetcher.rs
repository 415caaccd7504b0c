use async_trait::async_trait;
use serde_json::Value;

use crate::entry::FetchError;
use crate::key::QueryKey;

/// Loads the server response for a [`QueryKey`].
///
/// The store guarantees at most one concurrent call per key and applies
/// its own timeout around each call.
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> Result<Value, FetchError>;
}
