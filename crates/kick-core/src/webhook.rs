//! Go-live notifications.
//!
//! Every offline→live transition is handed to the [`NotificationDispatcher`], which
//! spawns one task per channel and sink. Delivery is a single attempt: failures are
//! logged and counted, never retried, and never reported back to the update cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::tracker::ChannelStatus;

pub const SIGNATURE_HEADER: &str = "X-Kick-Signature-256";

/// Used when a channel has neither a thumbnail nor an avatar.
pub const DEFAULT_IMAGE_URL: &str = "https://i.imgur.com/3QhZq.png";

const DISCORD_EMBED_COLOR: u32 = 0x57_F2_87;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookFormat {
    /// Discord embed for discord.com / discordapp.com URLs, generic JSON otherwise.
    #[default]
    Auto,
    Discord,
    Generic,
}

/// Configuration for a single webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,

    #[serde(default)]
    pub format: WebhookFormat,

    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,

    /// Optional HMAC-SHA256 signing secret for the `X-Kick-Signature-256` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

fn default_webhook_timeout_ms() -> u64 {
    5000
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: WebhookFormat::Auto,
            timeout_ms: default_webhook_timeout_ms(),
            secret: None,
        }
    }

    pub fn resolved_format(&self) -> WebhookFormat {
        match self.format {
            WebhookFormat::Auto => {
                let host = url::Url::parse(&self.url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_owned))
                    .unwrap_or_default();
                if host == "discord.com" || host == "discordapp.com" {
                    WebhookFormat::Discord
                } else {
                    WebhookFormat::Generic
                }
            }
            other => other,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("Failed to serialize webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The versioned JSON envelope POSTed to generic endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub version: u8,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub channel: String,
    pub data: serde_json::Value,
}

impl WebhookPayload {
    pub fn channel_live(channel: &ChannelStatus) -> Self {
        Self {
            version: 1,
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            notification_type: "channel_live".to_string(),
            channel: channel.identifier.clone(),
            data: serde_json::json!({
                "display_name": channel.display_name,
                "profile_url": channel.profile_url,
                "title": channel.title,
                "viewer_count": channel.viewer_count,
                "image_url": image_url(channel),
            }),
        }
    }
}

pub fn image_url(channel: &ChannelStatus) -> &str {
    channel
        .thumbnail_url
        .as_deref()
        .or(channel.avatar_url.as_deref())
        .unwrap_or(DEFAULT_IMAGE_URL)
}

pub fn discord_payload(channel: &ChannelStatus) -> serde_json::Value {
    let viewers = channel
        .viewer_count
        .map(|v| v.to_string())
        .unwrap_or_else(|| "n/a".to_string());

    serde_json::json!({
        "username": "Kick Live Notifier",
        "avatar_url": DEFAULT_IMAGE_URL,
        "embeds": [{
            "title": format!("\u{1F680} {} is now LIVE!", channel.display_name),
            "url": channel.profile_url,
            "description": channel.title.as_deref().unwrap_or("No stream description"),
            "color": DISCORD_EMBED_COLOR,
            "thumbnail": { "url": image_url(channel) },
            "fields": [
                { "name": "Viewers", "value": viewers, "inline": true }
            ],
            "timestamp": Utc::now().to_rfc3339(),
            "footer": { "text": "Kick Live Tracker" }
        }]
    })
}

/// An outbound sink for go-live alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn target(&self) -> &str;

    async fn notify(&self, channel: &ChannelStatus) -> Result<(), NotifyError>;
}

/// Posts go-live alerts to one webhook URL.
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn body(&self, channel: &ChannelStatus) -> Result<Vec<u8>, NotifyError> {
        let bytes = match self.config.resolved_format() {
            WebhookFormat::Discord => serde_json::to_vec(&discord_payload(channel))?,
            _ => serde_json::to_vec(&WebhookPayload::channel_live(channel))?,
        };
        Ok(bytes)
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn target(&self) -> &str {
        &self.config.url
    }

    async fn notify(&self, channel: &ChannelStatus) -> Result<(), NotifyError> {
        let body = self.body(channel)?;
        let url = &self.config.url;

        let mut req = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("User-Agent", "kick-live-tracker/1.0")
            .timeout(Duration::from_millis(self.config.timeout_ms));

        if let Some(secret) = self.config.secret.as_deref() {
            req = req.header(SIGNATURE_HEADER, format!("sha256={}", sign_payload(&body, secret)));
        }

        match req.body(body).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(NotifyError::Http {
                url: url.clone(),
                status: resp.status().as_u16(),
            }),
            Err(e) => Err(NotifyError::Request {
                url: url.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl DispatchStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Fire-and-forget fan-out of go-live alerts.
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    sinks: Vec<Arc<dyn Notifier>>,
    stats: Arc<DispatchStats>,
}

impl NotificationDispatcher {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self {
            sinks,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn from_webhooks(webhooks: Vec<WebhookConfig>, client: Client) -> Self {
        let sinks = webhooks
            .into_iter()
            .map(|wh| Arc::new(WebhookNotifier::new(wh, client.clone())) as Arc<dyn Notifier>)
            .collect();
        Self::new(sinks)
    }

    pub fn is_enabled(&self) -> bool {
        !self.sinks.is_empty()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Spawn one delivery task per channel and sink.
    ///
    /// The returned handles only exist so callers can wait in tests; the update cycle
    /// drops them.
    pub fn dispatch(&self, transitioned: Vec<ChannelStatus>) -> Vec<JoinHandle<()>> {
        if self.sinks.is_empty() {
            return Vec::new();
        }

        let mut handles = Vec::with_capacity(transitioned.len() * self.sinks.len());
        for channel in transitioned {
            let channel = Arc::new(channel);
            for sink in &self.sinks {
                let sink = Arc::clone(sink);
                let channel = Arc::clone(&channel);
                let stats = Arc::clone(&self.stats);
                handles.push(tokio::spawn(async move {
                    match sink.notify(&channel).await {
                        Ok(()) => {
                            stats.delivered.fetch_add(1, Ordering::Relaxed);
                            debug!(channel = %channel.identifier, target = sink.target(), "Go-live notification delivered");
                        }
                        Err(e) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            warn!(channel = %channel.identifier, target = sink.target(), error = %e, "Go-live notification failed");
                        }
                    }
                }));
            }
        }
        handles
    }
}

fn sign_payload(body: &[u8], secret: &str) -> String {
    // HMAC-SHA256 accepts keys of any length, so this cannot fail.
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
