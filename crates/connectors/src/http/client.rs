use crate::http::{
    error::TransportError,
    transport::{HeaderMap, HttpRequest, HttpResponse, HttpTransport},
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default timeout for API requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url(&request.endpoint);
        debug!(
            url = %url,
            query = ?request.query,
            headers = ?request.redacted_headers(),
            "SENT: GET"
        );

        let builder = request.headers.iter().fold(
            self.client.get(&url).query(&request.query),
            |b, (name, value)| b.header(name, value),
        );
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        let body = response.bytes().await?.to_vec();

        debug!(url = %url, status, bytes = body.len(), "REPLY: HTTP");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
