use connectors::{http::error::TransportError, sql::base::error::DbError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// `stream` was called before any table was prepared.
    #[error("No table has been prepared for streaming")]
    NotPrepared,
}

/// Conditions that end a pull run.
#[derive(Debug, Error)]
pub enum PullError {
    /// The request could not be sent at all; retrying cannot help.
    #[error("Transport failure on {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error("Aborted after {count} HTTP errors (last: HTTP {last_code} on {endpoint})")]
    ErrorBudgetExhausted {
        endpoint: String,
        count: usize,
        last_code: u16,
    },

    #[error("Gave up on {endpoint} after {attempts} attempts")]
    AttemptsExceeded { endpoint: String, attempts: usize },

    #[error("Pull cancelled")]
    Cancelled,

    #[error("Missing origin setting: {0}")]
    MissingSetting(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
