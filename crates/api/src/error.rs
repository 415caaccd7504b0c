/// Errors from the REST client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The backend returned a non-2xx status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body, or the raw body.
        message: String,
    },

    /// The backend rejected the bearer credential. The session has
    /// already been cleared.
    #[error("Not authenticated")]
    Unauthorized,

    /// The response body was not the expected JSON.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// A request body failed local validation and was not sent.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl ApiError {
    /// Network-level failures that a retry might fix.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Request(_) => true,
            ApiError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
