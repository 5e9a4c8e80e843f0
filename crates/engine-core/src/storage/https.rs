use crate::{
    config::PullConfig,
    error::{PullError, StorageError},
    storage::{
        Storage, StoreInfo,
        ledger::{ErrorLedger, LedgerEntry},
    },
};
use async_trait::async_trait;
use connectors::http::transport::{HeaderMap, HttpRequest, HttpResponse, HttpTransport};
use model::{
    core::{structure::TableStructure, utils::truncate_message},
    records::row::Row,
    transform::mapping::{FieldMap, FilterMap},
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const USER_AGENT: &str = concat!("ferry/", env!("CARGO_PKG_VERSION"));

/// A decoded successful reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PullResponse {
    pub status: u16,
    pub body: serde_json::Value,
    pub headers: HeaderMap,
}

/// Rate-limit-aware GET client for one HTTP origin.
///
/// * 429 with a usable `retry-after` waits as told and retries for free.
/// * Other 4xx/5xx go to the error ledger, wait `error_delay` and retry;
///   a full ledger ends the run.
/// * Redirects, undecodable bodies, timeouts and broken bodies retry for free.
/// * A request that cannot be sent at all ends the run immediately.
///
/// Every logical request is capped at `max_attempts` tries.
pub struct HttpsStorage<T> {
    transport: T,
    config: PullConfig,
    headers: Vec<(String, String)>,
    ledger: ErrorLedger,
    cancel: CancellationToken,
}

impl<T: HttpTransport> HttpsStorage<T> {
    pub fn new(transport: T, config: PullConfig, cancel: CancellationToken) -> Self {
        Self {
            transport,
            ledger: ErrorLedger::new(config.max_errors),
            config,
            headers: Vec::new(),
            cancel,
        }
    }

    /// Sets a header sent with every later request.
    pub fn set_header(&mut self, name: &str, value: &str) {
        merge_header(&mut self.headers, name, value);
    }

    /// Canonical headers, then persistent ones, then `extra`; later names
    /// replace earlier ones.
    pub fn request_headers(&self, extra: &[(String, String)]) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ];
        for (name, value) in self.headers.iter().chain(extra) {
            merge_header(&mut headers, name, value);
        }
        headers
    }

    pub fn ledger(&self) -> &ErrorLedger {
        &self.ledger
    }

    pub fn config(&self) -> &PullConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn get(
        &mut self,
        endpoint: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<PullResponse, PullError> {
        let request = HttpRequest::get(endpoint)
            .query(query)
            .headers(self.request_headers(headers));
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if self.cancel.is_cancelled() {
                return Err(PullError::Cancelled);
            }

            let sent = tokio::select! {
                _ = self.cancel.cancelled() => return Err(PullError::Cancelled),
                sent = self.transport.get(&request) => sent,
            };
            let response = match sent {
                Ok(response) => response,
                Err(err) if err.is_fatal() => {
                    error!(endpoint, error = %err, "ERROR: GET failed");
                    return Err(PullError::Transport {
                        endpoint: endpoint.to_string(),
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(endpoint, attempt, error = %err, "GET interrupted, retrying");
                    continue;
                }
            };

            match response.status {
                200..=299 => match decode(&response) {
                    Ok(body) => {
                        return Ok(PullResponse {
                            status: response.status,
                            body,
                            headers: response.headers,
                        });
                    }
                    Err(err) => {
                        warn!(endpoint, attempt, error = %err, "Undecodable response, retrying");
                    }
                },
                429 => match self.retry_after(&response) {
                    Some(wait) => {
                        info!(endpoint, wait_ms = wait.as_millis() as u64, "Rate limited, waiting");
                        self.sleep(wait).await?;
                    }
                    None => self.record_failure(endpoint, &response).await?,
                },
                300..=399 => {
                    warn!(endpoint, status = response.status, "HTTP redirect, retrying");
                }
                _ => self.record_failure(endpoint, &response).await?,
            }
        }

        error!(endpoint, attempts = max_attempts, "Retry ceiling reached");
        Err(PullError::AttemptsExceeded {
            endpoint: endpoint.to_string(),
            attempts: max_attempts,
        })
    }

    /// Server-directed wait, if it is positive and below the ceiling.
    fn retry_after(&self, response: &HttpResponse) -> Option<Duration> {
        let secs = response.header("retry-after")?.trim().parse::<f64>().ok()?;
        let wait = Duration::try_from_secs_f64(secs).ok()?;
        (!wait.is_zero() && wait < self.config.max_retry_after()).then_some(wait)
    }

    async fn record_failure(&mut self, endpoint: &str, response: &HttpResponse) -> Result<(), PullError> {
        let entry = LedgerEntry {
            code: response.status,
            message: truncate_message(&response.text(), 500, 300),
            headers: response.headers.clone(),
        };
        warn!(
            endpoint,
            status = entry.code,
            headers = ?entry.headers,
            "HTTP {} ({endpoint}) {}",
            entry.code,
            entry.message
        );

        if self.ledger.record(entry) {
            error!(endpoint, errors = self.ledger.len(), "ABORTED BY {} HTTP CODE RESPONSE", response.status);
            return Err(PullError::ErrorBudgetExhausted {
                endpoint: endpoint.to_string(),
                count: self.ledger.len(),
                last_code: response.status,
            });
        }
        self.sleep(self.config.error_delay()).await
    }

    /// Sleeps unless cancelled first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), PullError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(PullError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

fn merge_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        Some(existing) => existing.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

fn decode(response: &HttpResponse) -> Result<serde_json::Value, serde_json::Error> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    response.json()
}

/// An endpoint is not a table: the write half does nothing.
#[async_trait]
impl<T: HttpTransport> Storage for HttpsStorage<T> {
    async fn prepare(&mut self, _table: &str, _structure: &TableStructure) -> Result<(), StorageError> {
        Ok(())
    }

    async fn store(
        &mut self,
        _table: &str,
        _fields: &FieldMap,
        _structure: &TableStructure,
        _rows: Vec<Row>,
        _filters: &FilterMap,
    ) -> Result<StoreInfo, StorageError> {
        Ok(StoreInfo::default())
    }

    async fn stream(
        &mut self,
        _row: Row,
        _structure: &TableStructure,
        _is_final: bool,
    ) -> Result<StoreInfo, StorageError> {
        Ok(StoreInfo::default())
    }

    async fn flush(&mut self) -> Result<StoreInfo, StorageError> {
        Ok(StoreInfo::default())
    }

    async fn begin(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn end(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn exists(&self, _table: &str, _columns: &[String]) -> Result<bool, StorageError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;
    use connectors::http::error::TransportError;
    use serde_json::json;
    use tokio::time::Instant;

    fn client(transport: &ScriptedTransport) -> HttpsStorage<ScriptedTransport> {
        HttpsStorage::new(transport.clone(), PullConfig::default(), CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_for_hint_without_penalty() {
        let transport = ScriptedTransport::new()
            .respond_with_headers(429, json!({"retry_after": 3.0}), &[("Retry-After", "3")])
            .respond(200, json!([{"id": "1"}]));
        let mut client = client(&transport);

        let started = Instant::now();
        let response = client.get("guilds/1/members", &[], &[]).await.unwrap();
        let waited = started.elapsed();

        assert_eq!(response.body, json!([{"id": "1"}]));
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
        assert!(client.ledger().is_empty());

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_server_errors_abort() {
        let transport = (0..5).fold(ScriptedTransport::new(), |t, _| {
            t.respond(500, json!({"message": "boom"}))
        });
        let mut client = client(&transport);

        let err = client.get("channels/1/messages", &[], &[]).await.unwrap_err();
        assert!(matches!(
            err,
            PullError::ErrorBudgetExhausted { count: 5, last_code: 500, .. }
        ));
        assert_eq!(transport.requests().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_error_then_success_leaves_one_entry() {
        let transport = ScriptedTransport::new()
            .respond(500, json!({"message": "boom"}))
            .respond(200, json!([]));
        let mut client = client(&transport);

        let started = Instant::now();
        client.get("users", &[], &[]).await.unwrap();

        assert_eq!(client.ledger().len(), 1);
        assert_eq!(client.ledger().entries()[0].code, 500);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_without_hint_is_recorded() {
        let transport = ScriptedTransport::new()
            .respond(429, json!({}))
            .respond_with_headers(429, json!({}), &[("Retry-After", "900")])
            .respond(200, json!([]));
        let mut client = client(&transport);

        client.get("users", &[], &[]).await.unwrap();
        assert_eq!(client.ledger().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_hint_at_ceiling_is_recorded() {
        let transport = ScriptedTransport::new()
            .respond_with_headers(429, json!({}), &[("Retry-After", "300")])
            .respond_with_headers(429, json!({}), &[("Retry-After", "299")])
            .respond(200, json!([]));
        let mut client = client(&transport);

        let started = Instant::now();
        client.get("users", &[], &[]).await.unwrap();

        assert_eq!(client.ledger().len(), 1);
        assert_eq!(client.ledger().entries()[0].code, 429);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(300) && waited < Duration::from_secs(301));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fatal() {
        let transport = ScriptedTransport::new()
            .fail(TransportError::Unreachable("connection refused".to_string()))
            .respond(200, json!([]));
        let mut client = client(&transport);

        let err = client.get("users", &[], &[]).await.unwrap_err();
        assert!(matches!(err, PullError::Transport { .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_retry_for_free() {
        let transport = ScriptedTransport::new()
            .fail(TransportError::Timeout("deadline".to_string()))
            .respond(302, json!(null))
            .respond(200, json!({"threads": []}));
        let mut client = client(&transport);

        let response = client.get("threads", &[], &[]).await.unwrap();
        assert_eq!(response.body, json!({"threads": []}));
        assert!(client.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_attempt_ceiling() {
        let transport = (0..3).fold(ScriptedTransport::new(), |t, _| t.respond(301, json!(null)));
        let mut client = HttpsStorage::new(
            transport.clone(),
            PullConfig {
                max_attempts: 3,
                ..Default::default()
            },
            CancellationToken::new(),
        );

        let err = client.get("users", &[], &[]).await.unwrap_err();
        assert!(matches!(err, PullError::AttemptsExceeded { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let transport = ScriptedTransport::new()
            .respond(500, json!({}))
            .respond(200, json!([]));
        let token = CancellationToken::new();
        let mut client = HttpsStorage::new(transport.clone(), PullConfig::default(), token.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        let err = client.get("users", &[], &[]).await.unwrap_err();
        assert!(matches!(err, PullError::Cancelled));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_request_headers_merge_in_order() {
        let mut client = client(&ScriptedTransport::new());
        client.set_header("Authorization", "Bot one");
        client.set_header("authorization", "Bot two");

        let headers = client.request_headers(&[("User-Agent".to_string(), "custom".to_string())]);
        assert_eq!(
            headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), "custom".to_string()),
                ("Authorization".to_string(), "Bot two".to_string()),
            ]
        );
    }
}
