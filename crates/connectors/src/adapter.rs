use crate::{
    error::AdapterError,
    http::{
        client::{DEFAULT_TIMEOUT_SECS, ReqwestTransport},
        transport::{HttpRequest, HttpTransport},
    },
    sql::{
        base::{
            adapter::SqlAdapter,
            destination::{DbDataDestination, SqlDestination},
        },
        mysql::adapter::MySqlAdapter,
        postgres::adapter::PgAdapter,
    },
};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Database,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    MySql,
    Postgres,
}

/// One named connection as it appears in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub alias: String,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
    #[serde(default)]
    pub driver: Option<Driver>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Prepended to every table name the writer touches.
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ConnectionConfig {
    fn require<'a>(&self, value: &'a Option<String>, property: &str) -> Result<&'a str, AdapterError> {
        value.as_deref().ok_or_else(|| AdapterError::MissingProperty {
            alias: self.alias.clone(),
            property: property.to_string(),
        })
    }
}

/// A resolved, live connection.
#[derive(Clone)]
pub enum Adapter {
    MySql(MySqlAdapter),
    Postgres(PgAdapter),
    Http(ReqwestTransport),
}

impl Adapter {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, AdapterError> {
        let adapter = match config.kind {
            ConnectionKind::Database => {
                let url = config.require(&config.url, "url")?;
                match config.driver {
                    Some(Driver::MySql) => Adapter::MySql(MySqlAdapter::connect(url).await?),
                    Some(Driver::Postgres) => Adapter::Postgres(PgAdapter::connect(url).await?),
                    None => {
                        return Err(AdapterError::MissingProperty {
                            alias: config.alias.clone(),
                            property: "driver".to_string(),
                        });
                    }
                }
            }
            ConnectionKind::Api => {
                let base_url = config.require(&config.base_url, "base_url")?;
                let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
                Adapter::Http(ReqwestTransport::new(base_url, timeout)?)
            }
        };

        info!(alias = %config.alias, adapter = %adapter, "Connection resolved");
        Ok(adapter)
    }

    /// Round-trips to the server once.
    pub async fn ping(&self) -> Result<(), AdapterError> {
        match self {
            Adapter::MySql(adapter) => adapter.ping().await?,
            Adapter::Postgres(adapter) => adapter.ping().await?,
            Adapter::Http(transport) => {
                transport.get(&HttpRequest::get("")).await?;
            }
        }
        Ok(())
    }

    pub fn into_destination(self, alias: &str) -> Result<Box<dyn DbDataDestination>, AdapterError> {
        match self {
            Adapter::MySql(adapter) => Ok(Box::new(SqlDestination::new(adapter))),
            Adapter::Postgres(adapter) => Ok(Box::new(SqlDestination::new(adapter))),
            Adapter::Http(_) => Err(AdapterError::WrongKind {
                alias: alias.to_string(),
                expected: "database".to_string(),
            }),
        }
    }

    pub fn into_transport(self, alias: &str) -> Result<ReqwestTransport, AdapterError> {
        match self {
            Adapter::Http(transport) => Ok(transport),
            _ => Err(AdapterError::WrongKind {
                alias: alias.to_string(),
                expected: "api".to_string(),
            }),
        }
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adapter::MySql(adapter) => write!(f, "{}", adapter.dialect().name()),
            Adapter::Postgres(adapter) => write!(f, "{}", adapter.dialect().name()),
            Adapter::Http(transport) => write!(f, "HTTP {}", transport.base_url()),
        }
    }
}
