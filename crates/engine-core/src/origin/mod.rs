//! External APIs that feed a run, and the handle they run against.

pub mod discord;

use crate::{
    bridge::{self, PageRequest, PullInfo},
    error::PullError,
    report::StorageReport,
    storage::{Storage, database::DatabaseStorage, https::HttpsStorage},
};
use async_trait::async_trait;
use connectors::http::transport::HttpTransport;
use serde::Deserialize;
use std::{collections::BTreeMap, fmt, sync::Arc};
use tokio::time::Instant;
use tracing::{error, info};

/// Kinds of content an origin can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Users,
    Channels,
    Threads,
    Messages,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::Users => "users",
            Feature::Channels => "channels",
            Feature::Threads => "threads",
            Feature::Messages => "messages",
        };
        f.write_str(name)
    }
}

#[async_trait]
pub trait Origin: Send + Sync {
    fn name(&self) -> &'static str;

    fn features(&self) -> &'static [Feature];

    /// Pulls everything this origin exports through `pipeline`.
    async fn run(&self, pipeline: &mut Pipeline) -> Result<(), PullError>;
}

/// Per-origin settings from the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OriginSettings {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl OriginSettings {
    pub fn token(&self) -> Result<&str, PullError> {
        self.token
            .as_deref()
            .ok_or_else(|| PullError::MissingSetting("token".to_string()))
    }

    pub fn extra(&self, key: &str) -> Result<&str, PullError> {
        self.extra
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| PullError::MissingSetting(key.to_string()))
    }
}

/// Everything an origin needs for one run: the pull client, the writer and
/// its own settings.
pub struct Pipeline {
    client: HttpsStorage<Arc<dyn HttpTransport>>,
    writer: DatabaseStorage,
    settings: OriginSettings,
    last_call: Option<Instant>,
}

impl Pipeline {
    pub fn new(
        client: HttpsStorage<Arc<dyn HttpTransport>>,
        writer: DatabaseStorage,
        settings: OriginSettings,
    ) -> Self {
        Self {
            client,
            writer,
            settings,
            last_call: None,
        }
    }

    pub fn settings(&self) -> &OriginSettings {
        &self.settings
    }

    pub fn client(&self) -> &HttpsStorage<Arc<dyn HttpTransport>> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut HttpsStorage<Arc<dyn HttpTransport>> {
        &mut self.client
    }

    pub fn writer(&self) -> &DatabaseStorage {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut DatabaseStorage {
        &mut self.writer
    }

    /// Pulls one page, keeping calls at least `min_interval` apart.
    pub async fn pull(&mut self, request: PageRequest<'_>) -> Result<PullInfo, PullError> {
        self.pace().await?;
        let result = bridge::pull(&mut self.client, &mut self.writer, request).await;
        self.last_call = Some(Instant::now());
        result
    }

    /// Waits out whatever remains of the minimum spacing since the last call.
    pub async fn pace(&mut self) -> Result<(), PullError> {
        let Some(last) = self.last_call else {
            return Ok(());
        };
        let wait = self
            .client
            .config()
            .min_interval()
            .saturating_sub(last.elapsed());
        if !wait.is_zero() {
            self.client.sleep(wait).await?;
        }
        Ok(())
    }

    /// Distinct ids already written to `table`, logged as a `get` report.
    pub async fn stored_ids(&self, table: &str, column: &str) -> Result<Vec<String>, PullError> {
        let started = Instant::now();
        let ids = self.writer.column_values(table, column).await?;
        StorageReport::new("get", table, started.elapsed(), ids.len(), 0).log();
        Ok(ids)
    }

    /// Runs `origin` between the writer's `begin` and `end`.
    ///
    /// `end` runs even when the origin fails or is cancelled, so buffered rows
    /// are flushed and integrity checks restored before the error surfaces.
    pub async fn execute(&mut self, origin: &dyn Origin) -> Result<(), PullError> {
        let started = Instant::now();
        info!(origin = origin.name(), "Starting origin run");
        self.writer.begin().await?;

        let result = origin.run(self).await;
        if let Err(e) = &result {
            error!(origin = origin.name(), error = %e, "Origin run failed");
        }
        self.writer.end().await?;

        if result.is_ok() {
            info!(
                origin = origin.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Origin run complete"
            );
        }
        result
    }
}

/// Origins available to the binary, by name.
pub struct OriginRegistry {
    origins: BTreeMap<String, Box<dyn Origin>>,
}

impl OriginRegistry {
    /// A registry holding every built-in origin.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(discord::Discord));
        registry
    }

    pub fn empty() -> Self {
        Self {
            origins: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, origin: Box<dyn Origin>) {
        self.origins.insert(origin.name().to_lowercase(), origin);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Origin> {
        self.origins.get(&name.to_lowercase()).map(|o| o.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.origins.keys().map(String::as_str).collect()
    }
}

impl Default for OriginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
