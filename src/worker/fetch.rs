//! Network access for the offline worker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::error::Result;
use crate::worker::request::{Request, Response, ResponseKind};

/// Something that can turn a request into a response.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs the request. HTTP error statuses are returned as responses,
    /// only transport failures are errors.
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Builds a configured HTTP client for asset requests.
///
/// # Errors
///
/// Returns an error if the TLS backend fails to initialise.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .tcp_keepalive(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
}

/// [`Fetcher`] backed by `reqwest`. Responses whose final URL shares the
/// worker's origin are [`ResponseKind::Basic`]; everything else is
/// [`ResponseKind::Cors`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: Url,
}

impl HttpFetcher {
    /// Creates a fetcher that classifies responses against `origin`.
    #[must_use]
    pub const fn new(client: reqwest::Client, origin: Url) -> Self {
        Self { client, origin }
    }
}

/// Same-origin check on scheme, host and port.
#[must_use]
pub fn classify(origin: &Url, url: &Url) -> ResponseKind {
    if url.origin() == origin.origin() {
        ResponseKind::Basic
    } else {
        ResponseKind::Cors
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let response = self
            .client
            .request(request.method().clone(), request.url().clone())
            .send()
            .await?;

        let url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        log::debug!("Fetched {url} ({status}, {} bytes)", body.len());

        Ok(Response {
            kind: classify(&self.origin, &url),
            url: url.into(),
            status,
            headers,
            body,
        })
    }
}
