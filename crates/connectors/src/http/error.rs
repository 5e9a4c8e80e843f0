use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be built (bad URL, header or query).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The host could not be reached at all.
    #[error("Connection failed: {0}")]
    Unreachable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The response started but its body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    /// Fatal failures point at configuration, not at the remote side, and
    /// are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::InvalidRequest(_) | TransportError::Unreachable(_)
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}
