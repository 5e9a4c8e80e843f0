use crate::{env::EnvManager, error::CliError};
use connectors::adapter::ConnectionConfig;
use engine_core::{
    config::{PullConfig, WriterConfig},
    origin::OriginSettings,
};
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

/// Contents of `ferry.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FerryConfig {
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default)]
    pub origins: BTreeMap<String, OriginSettings>,
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub pull: PullConfig,
}

impl FerryConfig {
    pub fn load<P: AsRef<Path>>(path: P, env: &EnvManager) -> Result<Self, CliError> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source, env)
    }

    /// Parses `source`, expanding `${VAR}` in every string value first.
    pub fn parse(source: &str, env: &EnvManager) -> Result<Self, CliError> {
        let mut document: toml::Value = toml::from_str(source)?;
        expand_strings(&mut document, env)?;
        let config: FerryConfig = document.try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn connection(&self, alias: &str) -> Result<&ConnectionConfig, CliError> {
        self.connections
            .iter()
            .find(|c| c.alias == alias)
            .ok_or_else(|| CliError::UnknownConnection(alias.to_string()))
    }

    /// Settings for `origin`, matched case-insensitively.
    pub fn origin(&self, origin: &str) -> OriginSettings {
        self.origins
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(origin))
            .map(|(_, settings)| settings.clone())
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<(), CliError> {
        let mut seen = Vec::new();
        for connection in &self.connections {
            if seen.contains(&connection.alias.as_str()) {
                return Err(CliError::Config(format!(
                    "Duplicate connection alias '{}'",
                    connection.alias
                )));
            }
            seen.push(connection.alias.as_str());
        }
        if self.writer.batch_size == 0 {
            return Err(CliError::Config("writer.batch_size must be positive".to_string()));
        }
        Ok(())
    }
}

fn expand_strings(value: &mut toml::Value, env: &EnvManager) -> Result<(), CliError> {
    match value {
        toml::Value::String(text) => *text = env.expand(text)?,
        toml::Value::Array(items) => {
            for item in items {
                expand_strings(item, env)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                expand_strings(item, env)?;
            }
        }
        _ => {}
    }
    Ok(())
}
