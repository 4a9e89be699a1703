//! Plain HTTP GET with a short timeout and linear retry backoff.

use crate::config::read_user_agent;
use crate::error::{KitError, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Configuration for [`UrlFetcher`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout, covering connect and body read
    pub timeout: Duration,
    /// Backoff unit; retry `n` after a connection error waits `n * backoff_step`
    pub backoff_step: Duration,
    /// Retries after the first attempt
    pub attempts: u32,
    /// File holding the User-Agent used when no headers are supplied
    pub user_agent_path: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            backoff_step: Duration::from_secs(2),
            attempts: crate::DEFAULT_FETCH_ATTEMPTS,
            user_agent_path: PathBuf::from(crate::DEFAULT_USER_AGENT_PATH),
        }
    }
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_user_agent_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_agent_path = path.into();
        self
    }
}

/// How a failed request is handled by the retry loop.
enum Failure {
    Connection,
    Timeout,
    Fatal(reqwest::Error),
}

fn classify(err: reqwest::Error) -> Failure {
    if err.is_timeout() {
        Failure::Timeout
    } else if err.is_connect() || err.is_request() || err.is_body() {
        Failure::Connection
    } else {
        Failure::Fatal(err)
    }
}

/// HTTP fetcher that retries connection errors and timeouts.
pub struct UrlFetcher {
    client: Client,
    config: FetchConfig,
}

impl UrlFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET `url` and return the trimmed body.
    ///
    /// Makes at most `attempts + 1` requests. Returns an empty string once
    /// they are exhausted. Errors other than connection failures and
    /// timeouts are returned immediately.
    pub async fn get(&self, url: &str, headers: Option<HeaderMap>) -> Result<String> {
        let headers = match headers {
            Some(headers) if !headers.is_empty() => headers,
            _ => self.default_headers().await?,
        };

        info!("Loading {}", url);
        for attempt in 0..=self.config.attempts {
            let failure = match self.try_get(url, &headers).await {
                Ok(body) => return Ok(body),
                Err(e) => classify(e),
            };

            match failure {
                Failure::Connection => {
                    error!(attempt, "Connection Error for {}.", url);
                    tokio::time::sleep(self.config.backoff_step * attempt).await;
                }
                Failure::Timeout => error!(attempt, "URL read timeout for {}.", url),
                Failure::Fatal(e) => return Err(e.into()),
            }
        }

        error!("Connection retries exhausted for {}.", url);
        Ok(String::new())
    }

    async fn try_get(&self, url: &str, headers: &HeaderMap) -> reqwest::Result<String> {
        let response = self.client.get(url).headers(headers.clone()).send().await?;
        let body = response.text().await?;
        Ok(body.trim().to_string())
    }

    /// Fresh header map carrying the configured User-Agent.
    async fn default_headers(&self) -> Result<HeaderMap> {
        let agent = read_user_agent(&self.config.user_agent_path).await?;
        let value = HeaderValue::from_str(&agent)
            .map_err(|e| KitError::config_error(format!("invalid User-Agent: {}", e)))?;
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, value);
        Ok(headers)
    }
}

/// GET `url` with default settings and `attempts` retries.
pub async fn get_url(url: &str, headers: Option<HeaderMap>, attempts: u32) -> Result<String> {
    let fetcher = UrlFetcher::new(FetchConfig::default().with_attempts(attempts))?;
    fetcher.get(url, headers).await
}
