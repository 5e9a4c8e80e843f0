use crate::{config::FerryConfig, error::CliError};
use connectors::{adapter::Adapter, http::transport::HttpTransport};
use engine_core::{
    origin::{Origin, OriginRegistry, Pipeline},
    storage::{database::DatabaseStorage, https::HttpsStorage},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

fn lookup<'a>(registry: &'a OriginRegistry, name: &str) -> Result<&'a dyn Origin, CliError> {
    registry.get(name).ok_or_else(|| CliError::UnknownOrigin {
        name: name.to_string(),
        available: registry.names().join(", "),
    })
}

/// Resolves both connections and runs `origin` from `input` into `output`.
pub async fn run_origin(
    config: &FerryConfig,
    registry: &OriginRegistry,
    origin: &str,
    input: &str,
    output: &str,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let selected = lookup(registry, origin)?;
    let input_config = config.connection(input)?;
    let output_config = config.connection(output)?;

    let transport: Arc<dyn HttpTransport> =
        Arc::new(Adapter::connect(input_config).await?.into_transport(input)?);
    let destination = Adapter::connect(output_config)
        .await?
        .into_destination(output)?;

    let client = HttpsStorage::new(transport, config.pull.clone(), cancel);
    let writer =
        DatabaseStorage::new(destination, config.writer.clone()).with_prefix(&output_config.prefix);
    let mut pipeline = Pipeline::new(client, writer, config.origin(origin));

    pipeline.execute(selected).await?;
    Ok(())
}

pub async fn test_connection(config: &FerryConfig, alias: &str) -> Result<(), CliError> {
    let adapter = Adapter::connect(config.connection(alias)?).await?;
    adapter.ping().await?;
    info!(alias, adapter = %adapter, "Connection OK");
    Ok(())
}

pub fn list_origins(registry: &OriginRegistry) {
    for name in registry.names() {
        if let Some(origin) = registry.get(name) {
            let features: Vec<String> = origin.features().iter().map(|f| f.to_string()).collect();
            println!("{:<16} {}", origin.name(), features.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvManager;

    #[tokio::test]
    async fn test_unknown_origin_lists_available() {
        let config = FerryConfig::default();
        let err = run_origin(
            &config,
            &OriginRegistry::new(),
            "myspace",
            "in",
            "out",
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            &err,
            CliError::UnknownOrigin { name, available } if name == "myspace" && available == "discord"
        ));
    }

    #[tokio::test]
    async fn test_unknown_alias_fails_before_connecting() {
        let config = FerryConfig::parse(
            "[[connections]]\nalias = \"api\"\ntype = \"api\"\nbase_url = \"http://127.0.0.1:9/\"\n",
            &EnvManager::default(),
        )
        .unwrap();

        let err = run_origin(
            &config,
            &OriginRegistry::new(),
            "discord",
            "api",
            "warehouse",
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CliError::UnknownConnection(alias) if alias == "warehouse"));

        let err = test_connection(&config, "missing").await.unwrap_err();
        assert!(matches!(err, CliError::UnknownConnection(_)));
    }
}
