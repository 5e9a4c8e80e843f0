use crate::{
    http::error::TransportError,
    sql::base::error::{ConnectorError, DbError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// A mis-configured or unsupported database adapter was specified.
    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// Missing required property error.
    #[error("Connection '{alias}' is missing required property: {property}")]
    MissingProperty { alias: String, property: String },

    /// The connection exists but is of the wrong kind for the caller.
    #[error("Connection '{alias}' is not a {expected} connection")]
    WrongKind { alias: String, expected: String },

    /// Failed to initialize a data connector/adapter.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Database-related error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] TransportError),
}
