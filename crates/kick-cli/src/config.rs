//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//!
//! [admin]
//! username = "admin"
//! password = "change-me"
//!
//! [tracker]
//! settings_path = "config.json"
//! request_timeout_ms = 10000
//! max_retries = 1
//!
//! [[webhook]]
//! url = "https://discord.com/api/webhooks/123/abc"
//!
//! [[webhook]]
//! url = "https://hooks.example.com/kick"
//! secret = "my-key"
//! ```
//!
//! `DISCORD_WEBHOOK_URL`, `ADMIN_USER` and `ADMIN_PASS` override the file.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use kick_core::config::{DEFAULT_API_BASE_URL, DEFAULT_PROFILE_BASE_URL};
use kick_core::{TrackerConfig, WebhookConfig};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub tracker: TrackerDef,

    #[serde(default)]
    pub webhook: Vec<WebhookConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: default_log_format(),
        }
    }
}

pub fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_log_format() -> String {
    "pretty".into()
}

/// Admin panel credentials. Without a password the admin routes stay disabled.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_user")]
    pub username: String,

    #[serde(default)]
    pub password: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_user(),
            password: None,
        }
    }
}

fn default_admin_user() -> String {
    "admin".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerDef {
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_profile_base_url")]
    pub profile_base_url: String,

    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for TrackerDef {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            api_base_url: default_api_base_url(),
            profile_base_url: default_profile_base_url(),
            user_agent: None,
        }
    }
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("config.json")
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.into()
}

fn default_profile_base_url() -> String {
    DEFAULT_PROFILE_BASE_URL.into()
}

impl TrackerDef {
    pub fn to_tracker_config(&self) -> TrackerConfig {
        let mut c = TrackerConfig::default()
            .with_request_timeout(self.request_timeout_ms)
            .with_max_retries(self.max_retries)
            .with_retry_backoff(self.retry_backoff_ms)
            .with_api_base_url(&self.api_base_url)
            .with_profile_base_url(&self.profile_base_url);
        if let Some(ref ua) = self.user_agent {
            c = c.with_user_agent(ua);
        }
        c
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `DISCORD_WEBHOOK_URL`, `ADMIN_USER` and `ADMIN_PASS` from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DISCORD_WEBHOOK_URL") {
            if !self.webhook.iter().any(|w| w.url == url) {
                self.webhook.push(WebhookConfig::new(url));
            }
        }
        if let Some(user) = non_empty("ADMIN_USER") {
            self.admin.username = user;
        }
        if let Some(pass) = non_empty("ADMIN_PASS") {
            self.admin.password = Some(pass);
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (i, wh) in self.webhook.iter().enumerate() {
            let parsed = url::Url::parse(&wh.url)
                .map_err(|e| format!("Invalid webhook URL at index {}: {} ({})", i, wh.url, e))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(format!("Webhook URL must use http or https: {}", wh.url));
            }
        }

        for (name, value) in [
            ("api_base_url", &self.tracker.api_base_url),
            ("profile_base_url", &self.tracker.profile_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| format!("Invalid tracker.{}: {} ({})", name, value, e))?;
        }

        if self.tracker.request_timeout_ms == 0 {
            return Err("tracker.request_timeout_ms must be greater than zero".into());
        }

        if self.admin.password.is_some() && self.admin.username.trim().is_empty() {
            return Err("admin.username must not be empty".into());
        }

        match self.server.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        Ok(())
    }
}
