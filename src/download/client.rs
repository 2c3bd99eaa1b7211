//! HTTP client wrapper shared by the probe, chunk fetchers and resolvers.
//!
//! One [`HttpClient`] is built per engine and cloned into every task; clones
//! share the underlying connection pool.

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, RANGE};
use reqwest::{Client, Response};
use tracing::{debug, instrument};

use super::config::{EngineConfig, EngineError};
use super::constants::MIN_POOLED_CONNECTIONS;
use super::error::DownloadError;

const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Connection-pooled HTTP client.
///
/// # Example
///
/// ```no_run
/// use linkfetch_core::download::{EngineConfig, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(&EngineConfig::default())?;
/// let response = client.get("https://example.com/file.bin", None).await?;
/// println!("status: {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Builds a client whose pool holds at least as many idle connections per
    /// host as there are chunk fetchers.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Client`] if the reqwest builder fails.
    #[instrument(level = "debug", skip(config), fields(concurrency = config.concurrency))]
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let pool_size = config.concurrency.max(MIN_POOLED_CONNECTIONS);
        let client = build_client(&config.user_agent, config.request_timeout, pool_size)
            .map_err(EngineError::Client)?;
        debug!(pool_size, "built HTTP client");
        Ok(Self { client })
    }

    /// Sends a HEAD request bounded by `timeout`.
    ///
    /// Non-success statuses are returned as [`DownloadError::HttpStatus`].
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] on transport failure or error status.
    pub async fn head(&self, url: &str, timeout: Duration) -> Result<Response, DownloadError> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        check_status(url, response)
    }

    /// Sends a GET request, optionally with a `Range` header value.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] on transport failure or error status.
    pub async fn get(&self, url: &str, range: Option<&str>) -> Result<Response, DownloadError> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        check_status(url, response)
    }

    /// Fetches a page body as text within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] on transport failure or error status.
    pub async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, DownloadError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        let response = check_status(url, response)?;
        response
            .text()
            .await
            .map_err(|e| DownloadError::network(url, e))
    }
}

fn check_status(url: &str, response: Response) -> Result<Response, DownloadError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(DownloadError::http_status(url, status.as_u16()))
    }
}

fn build_client(
    user_agent: &str,
    request_timeout: Duration,
    pool_size: usize,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
    );

    Client::builder()
        .connect_timeout(request_timeout)
        .read_timeout(request_timeout)
        .pool_max_idle_per_host(pool_size)
        .pool_idle_timeout(Duration::from_secs(30))
        .default_headers(headers)
        .user_agent(user_agent)
        .build()
}
