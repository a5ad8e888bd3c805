use propdb_core::ValidationErrors;
use thiserror::Error;

/// Errors returned by the listings API client and the stores built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered 404 for this path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or rejected bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Field-level validation failures, reported by the server or caught
    /// locally before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Any other non-2xx answer, with the server's error code when present.
    #[error("unexpected status {status} ({code}): {message}")]
    UnexpectedStatus {
        status: u16,
        code: String,
        message: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Reading or writing the local favorites file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}
