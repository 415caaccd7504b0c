use fly8_api::ApiError;
use fly8_cache::FetchError;
use fly8_core::error::CoreError;

/// Errors surfaced to the caller of a mutation or the facade.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The backend call failed. Nothing was invalidated.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Input rejected before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Session or configuration failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No session is stored; log in first.
    #[error("Not logged in")]
    NotLoggedIn,
}

impl From<validator::ValidationErrors> for SyncError {
    fn from(errors: validator::ValidationErrors) -> Self {
        SyncError::Validation(errors.to_string())
    }
}

/// Map a REST failure onto the cache's cloneable error.
pub fn to_fetch_error(error: ApiError) -> FetchError {
    match error {
        ApiError::Timeout => FetchError::Timeout,
        ApiError::Unauthorized => FetchError::Unauthorized,
        ApiError::Api { status, message } => FetchError::Status { status, message },
        other => FetchError::Failed(other.to_string()),
    }
}
