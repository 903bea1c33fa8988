use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use tracing::{debug, trace};
use url::Url;

use super::{ChannelLoader, LoadError};
use crate::config::TrackerConfig;

/// HTTP channel loader with connection pooling and optional retries.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: Client,
    base_url: String,
    user_agent: String,
    max_retries: u32,
    base_backoff: Duration,
}

impl HttpLoader {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let defaults = TrackerConfig::default();
        Self {
            client,
            base_url: base_url.into(),
            user_agent: defaults.user_agent,
            max_retries: defaults.max_retries,
            base_backoff: defaults.retry_backoff,
        }
    }

    pub fn with_retries(mut self, max_retries: u32, base_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_backoff = base_backoff;
        self
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self, reqwest::Error> {
        let client = Self::build_client(config.request_timeout)?;
        Ok(Self::from_config_with_client(config, client))
    }

    pub fn from_config_with_client(config: &TrackerConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.api_base_url.clone(),
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            base_backoff: config.retry_backoff,
        }
    }

    pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(20)
            .gzip(true)
            .build()
    }

    /// `<base_url>/<identifier>`, with the identifier percent-encoded as one path segment.
    pub fn channel_url(&self, identifier: &str) -> Result<Url, LoadError> {
        let invalid = |reason: String| LoadError::InvalidUrl {
            identifier: identifier.to_string(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .push(identifier);
        Ok(url)
    }
}

#[async_trait]
impl ChannelLoader for HttpLoader {
    async fn load(&self, identifier: &str) -> Result<String, LoadError> {
        let url = self.channel_url(identifier)?;
        let uri = url.as_str();
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let is_last = attempt == self.max_retries;

            if attempt > 0 {
                let backoff = self.base_backoff * 2u32.saturating_pow(attempt - 1);
                debug!(uri, attempt, backoff_ms = backoff.as_millis(), "Retrying channel lookup");
                tokio::time::sleep(backoff).await;
            }

            let request = self
                .client
                .get(url.clone())
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, &self.user_agent);

            match request.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.text().await {
                            Ok(body) => return Ok(body),
                            Err(e) => {
                                last_error = Some(LoadError::Network {
                                    url: uri.to_string(),
                                    reason: e.to_string(),
                                    is_last_retry: is_last,
                                });
                            }
                        }
                    } else {
                        let status = response.status().as_u16();
                        let message = response
                            .status()
                            .canonical_reason()
                            .unwrap_or("Unknown")
                            .to_string();
                        trace!(uri, status, attempt, "Channel lookup returned error status");
                        let permanent = (400..500).contains(&status) && status != 429;
                        let err = LoadError::Http {
                            url: uri.to_string(),
                            status,
                            message,
                            is_last_retry: is_last || permanent,
                        };

                        if permanent {
                            return Err(err);
                        }
                        last_error = Some(err);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        trace!(uri, attempt, "Channel lookup timed out");
                        last_error = Some(LoadError::Timeout {
                            url: uri.to_string(),
                            is_last_retry: is_last,
                        });
                    } else {
                        trace!(uri, attempt, error = %e, "Channel lookup network error");
                        last_error = Some(LoadError::Network {
                            url: uri.to_string(),
                            reason: e.to_string(),
                            is_last_retry: is_last,
                        });
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LoadError::Network {
            url: uri.to_string(),
            reason: "no attempt was made".to_string(),
            is_last_retry: true,
        }))
    }
}
