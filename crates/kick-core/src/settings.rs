//! Runtime-replaceable tracker settings.
//!
//! Persisted as JSON:
//!
//! ```json
//! {
//!   "refreshInterval": 10000,
//!   "debug": false,
//!   "kickUsers": [
//!     { "username": "alice" },
//!     { "username": "bob", "displayName": "Bobby" }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{effective_refresh_interval, DEFAULT_REFRESH_INTERVAL_MS};
use crate::tracker::ChannelConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSettings {
    /// Requested refresh interval in milliseconds (floored to 3000 when applied).
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub kick_users: Vec<ChannelConfig>,
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
            debug: false,
            kick_users: Vec::new(),
        }
    }
}

impl TrackerSettings {
    pub fn new(channels: Vec<ChannelConfig>) -> Self {
        Self {
            kick_users: channels,
            ..Self::default()
        }
    }

    pub fn with_refresh_interval(mut self, ms: u64) -> Self {
        self.refresh_interval = ms;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.kick_users
    }

    pub fn effective_interval(&self) -> Duration {
        effective_refresh_interval(self.refresh_interval)
    }

    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.refresh_interval == 0 {
            return Err(SettingsError::Invalid(
                "refreshInterval must be greater than zero".into(),
            ));
        }

        let mut seen = HashSet::new();
        for (i, c) in self.kick_users.iter().enumerate() {
            if c.identifier.trim().is_empty() {
                return Err(SettingsError::Invalid(format!(
                    "kickUsers[{i}] has an empty username"
                )));
            }
            if !seen.insert(c.key()) {
                return Err(SettingsError::Invalid(format!(
                    "Duplicate username: {}",
                    c.identifier
                )));
            }
        }
        Ok(())
    }

    /// Merge `patch` into a copy of these settings and validate the result.
    ///
    /// On error nothing is applied; `self` is never modified.
    pub fn merged(&self, patch: SettingsPatch) -> Result<Self, SettingsError> {
        let mut next = self.clone();
        if let Some(ms) = patch.refresh_interval {
            next.refresh_interval = ms;
        }
        if let Some(debug) = patch.debug {
            next.debug = debug;
        }
        if let Some(users) = patch.kick_users {
            next.kick_users = users;
        }
        if let Some(text) = patch.kick_users_text {
            next.kick_users = parse_channel_lines(&text);
        }
        next.validate()?;
        Ok(next)
    }
}

/// Partial update sent by the admin surface.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub refresh_interval: Option<u64>,
    pub debug: Option<bool>,
    pub kick_users: Option<Vec<ChannelConfig>>,
    /// One `username|Display Name` per line; takes precedence over `kickUsers`.
    pub kick_users_text: Option<String>,
}

/// Parse the textarea format: blank lines skipped, usernames lower-cased, display name
/// defaulting to the username as typed.
pub fn parse_channel_lines(text: &str) -> Vec<ChannelConfig> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            let mut parts = line.splitn(2, '|').map(str::trim);
            let username = parts.next().unwrap_or_default();
            let display = parts
                .next()
                .filter(|n| !n.is_empty())
                .unwrap_or(username);
            ChannelConfig::new(username.to_lowercase()).with_display_name(display)
        })
        .collect()
}
