use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Floor applied to every refresh interval, whatever the settings ask for.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(3000);

pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 10_000;

pub const DEFAULT_API_BASE_URL: &str = "https://kick.com/api/v2/channels";

pub const DEFAULT_PROFILE_BASE_URL: &str = "https://kick.com";

/// Process-level knobs for talking to the upstream channel API.
///
/// These are fixed for the lifetime of a [`Tracker`](crate::Tracker). The parts that can
/// change at runtime (channel list, refresh interval, debug flag) live in
/// [`TrackerSettings`](crate::TrackerSettings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// HTTP request timeout for channel lookups.
    pub request_timeout: Duration,
    /// Retries for a failed lookup within one cycle. Zero means a single attempt.
    pub max_retries: u32,
    /// Base backoff between retries (doubled each attempt).
    pub retry_backoff: Duration,
    /// Channel lookups go to `<api_base_url>/<identifier>`.
    pub api_base_url: String,
    /// Public profile links are built as `<profile_base_url>/<identifier>`.
    pub profile_base_url: String,
    pub user_agent: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_retries: 0,
            retry_backoff: Duration::from_millis(250),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            profile_base_url: DEFAULT_PROFILE_BASE_URL.to_string(),
            user_agent: "kick-live-tracker/1.0".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn with_request_timeout(mut self, ms: u64) -> Self {
        self.request_timeout = Duration::from_millis(ms);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, ms: u64) -> Self {
        self.retry_backoff = Duration::from_millis(ms);
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_profile_base_url(mut self, url: impl Into<String>) -> Self {
        self.profile_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Clamp a requested refresh interval to [`MIN_REFRESH_INTERVAL`].
pub fn effective_refresh_interval(requested_ms: u64) -> Duration {
    Duration::from_millis(requested_ms).max(MIN_REFRESH_INTERVAL)
}
