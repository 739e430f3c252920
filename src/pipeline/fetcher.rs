//! HTTP fetcher implementation
//!
//! This module handles all listing page requests, including:
//! - Building HTTP clients with the configured user agent and optional proxy
//! - GET requests for listing pages
//! - Fixed-delay retry for transient failures
//! - Error classification

use crate::config::ScraperConfig;
use crate::pipeline::RawPage;
use crate::url::page_url;
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Failure to fetch one listing page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with a status that retrying will not fix, or
    /// kept answering with a transient one until attempts ran out
    #[error("page {page}: HTTP {status} after {attempts} attempt(s)")]
    Status {
        page: u32,
        status: u16,
        attempts: u32,
    },

    /// Transport failure (connect, timeout, body read) on the last attempt
    #[error("page {page}: {source} after {attempts} attempt(s)")]
    Network {
        page: u32,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Page number the failure belongs to
    pub fn page(&self) -> u32 {
        match self {
            Self::Status { page, .. } | Self::Network { page, .. } => *page,
        }
    }

    /// Returns true if the server reported the page as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - Listing fetch settings (user agent, request and connect timeouts)
/// * `proxy` - Optional proxy URL applied to every request of the run
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy or client setup failure
///
/// # Example
///
/// ```no_run
/// use shop_scraper::config::ScraperConfig;
/// use shop_scraper::pipeline::build_http_client;
///
/// let config = ScraperConfig::default();
/// let client = build_http_client(&config, Some("http://127.0.0.1:3128")).unwrap();
/// ```
pub fn build_http_client(
    config: &ScraperConfig,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Retry policy for page fetches
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Fixed wait between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Result of one attempt, before the retry decision
enum Attempt {
    Done(String),
    Transient(FetchError),
    Permanent(FetchError),
}

/// Fetches one listing page with retry
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Done |
/// | HTTP 5xx | Retry |
/// | HTTP 429 | Retry |
/// | Other non-2xx (404, 403, ...) | Immediate failure |
/// | Timeout / connect / body read error | Retry |
///
/// Attempts are separated by the policy's fixed delay (no backoff growth).
/// No shared state is touched besides the network.
pub async fn fetch_page(
    client: &Client,
    base_url: &str,
    page_number: u32,
    policy: RetryPolicy,
) -> Result<RawPage, FetchError> {
    let url = page_url(base_url, page_number);
    let mut attempt = 1;

    loop {
        match fetch_once(client, &url, page_number, attempt).await {
            Attempt::Done(markup) => {
                tracing::debug!("Fetched page {} ({} bytes)", page_number, markup.len());
                return Ok(RawPage {
                    page_number,
                    url,
                    markup,
                });
            }
            Attempt::Permanent(err) => return Err(err),
            Attempt::Transient(err) => {
                if attempt >= policy.max_attempts {
                    return Err(err);
                }
                tracing::debug!(
                    "Attempt {}/{} for page {} failed: {}; retrying in {:?}",
                    attempt,
                    policy.max_attempts,
                    page_number,
                    err,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

async fn fetch_once(client: &Client, url: &str, page: u32, attempts: u32) -> Attempt {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(source) => {
            return Attempt::Transient(FetchError::Network {
                page,
                attempts,
                source,
            })
        }
    };

    let status = response.status();
    if !status.is_success() {
        let err = FetchError::Status {
            page,
            status: status.as_u16(),
            attempts,
        };
        return if is_transient_status(status) {
            Attempt::Transient(err)
        } else {
            Attempt::Permanent(err)
        };
    }

    match response.text().await {
        Ok(markup) => Attempt::Done(markup),
        Err(source) => Attempt::Transient(FetchError::Network {
            page,
            attempts,
            source,
        }),
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
