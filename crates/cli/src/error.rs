use connectors::error::AdapterError;
use engine_core::error::PullError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the configuration file: {0}")]
    ConfigFileRead(#[from] std::io::Error),

    #[error("Failed to parse the configuration file as TOML: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No connection named '{0}' in the configuration file")]
    UnknownConnection(String),

    #[error("Unknown origin '{name}' (available: {available})")]
    UnknownOrigin { name: String, available: String },

    #[error("Connection error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Pull failed: {0}")]
    Pull(#[from] PullError),
}

impl CliError {
    /// Whether the run ended because a shutdown signal cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CliError::Pull(PullError::Cancelled))
    }
}
