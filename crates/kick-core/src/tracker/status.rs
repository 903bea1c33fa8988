use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collate::compare_display_names;

/// One tracked channel as configured by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(rename = "username")]
    pub identifier: String,
    #[serde(
        rename = "displayName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name_override: Option<String>,
}

impl ChannelConfig {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name_override: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name_override = Some(name.into());
        self
    }

    /// Identifiers are case-insensitive; this is the form used for lookups and keys.
    pub fn key(&self) -> String {
        self.identifier.to_lowercase()
    }
}

/// Live status of one channel, produced fresh every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub identifier: String,
    pub display_name: String,
    pub is_live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_count: Option<u64>,
    pub profile_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub fetch_failed: bool,
}

impl ChannelStatus {
    /// The status recorded when a lookup fails: offline, no metadata.
    pub fn failed(identifier: impl Into<String>, profile_url: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            display_name: identifier.clone(),
            identifier,
            is_live: false,
            title: None,
            viewer_count: None,
            profile_url: profile_url.into(),
            avatar_url: None,
            thumbnail_url: None,
            fetch_failed: true,
        }
    }

    pub fn key(&self) -> String {
        self.identifier.to_lowercase()
    }
}

/// Aggregated result of one update cycle.
///
/// Channels are ordered live-first, then by display name. The fields are private so the
/// counts and the ordering always agree with the channel list.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    generated_at: DateTime<Utc>,
    version: u64,
    channels: Vec<ChannelStatus>,
    live_count: usize,
    total_count: usize,
}

impl Snapshot {
    pub fn new(mut channels: Vec<ChannelStatus>, generated_at: DateTime<Utc>) -> Self {
        channels.sort_by(|a, b| {
            b.is_live
                .cmp(&a.is_live)
                .then_with(|| compare_display_names(&a.display_name, &b.display_name))
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        let live_count = channels.iter().filter(|c| c.is_live).count();
        let total_count = channels.len();
        Self {
            generated_at,
            version: 0,
            channels,
            live_count,
            total_count,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Utc::now())
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Publish counter; 0 until the first cycle completes.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn channels(&self) -> &[ChannelStatus] {
        &self.channels
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn failed_count(&self) -> usize {
        self.channels.iter().filter(|c| c.fetch_failed).count()
    }

    pub fn get(&self, identifier: &str) -> Option<&ChannelStatus> {
        let key = identifier.to_lowercase();
        self.channels.iter().find(|c| c.key() == key)
    }
}
