use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{trace, warn};

use super::status::ChannelStatus;
use crate::config::TrackerConfig;
use crate::loader::{ChannelLoader, LoadError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Malformed channel payload for {identifier}: {reason}")]
    Payload { identifier: String, reason: String },
}

/// Looks up one channel and normalizes the upstream payload into a [`ChannelStatus`].
///
/// Failures never escape [`fetch`](Self::fetch): they become an offline status with
/// `fetch_failed` set.
#[derive(Clone)]
pub struct ChannelStatusFetcher {
    loader: Arc<dyn ChannelLoader>,
    profile_base_url: String,
}

impl ChannelStatusFetcher {
    pub fn new(loader: Arc<dyn ChannelLoader>, config: &TrackerConfig) -> Self {
        Self {
            loader,
            profile_base_url: config.profile_base_url.clone(),
        }
    }

    pub fn profile_url(&self, identifier: &str) -> String {
        format!("{}/{}", self.profile_base_url, identifier)
    }

    pub async fn fetch(&self, identifier: &str, debug: bool) -> ChannelStatus {
        match self.try_fetch(identifier).await {
            Ok(status) => status,
            Err(e) => {
                if debug {
                    warn!(channel = identifier, error = %e, "Channel fetch failed");
                } else {
                    trace!(channel = identifier, error = %e, "Channel fetch failed");
                }
                ChannelStatus::failed(identifier, self.profile_url(identifier))
            }
        }
    }

    pub async fn try_fetch(&self, identifier: &str) -> Result<ChannelStatus, FetchError> {
        let body = self.loader.load(identifier).await?;
        normalize(identifier, self.profile_url(identifier), &body)
    }
}

/// Turn a raw channel payload into a status record.
pub fn normalize(
    identifier: &str,
    profile_url: String,
    body: &str,
) -> Result<ChannelStatus, FetchError> {
    let payload_error = |reason: String| FetchError::Payload {
        identifier: identifier.to_string(),
        reason,
    };

    let data: Value = serde_json::from_str(body).map_err(|e| payload_error(e.to_string()))?;
    if !data.is_object() {
        return Err(payload_error("expected a JSON object".to_string()));
    }

    let user = data.get("user").filter(|u| u.is_object());
    let livestream = data.get("livestream").filter(|l| l.is_object());

    let is_live = livestream.is_some_and(|l| {
        l.get("is_live") == Some(&Value::Bool(true)) || l.get("isLive") == Some(&Value::Bool(true))
    });

    let display_name = first_str(user, &["display_name", "displayName", "username"])
        .unwrap_or_else(|| identifier.to_string());
    let avatar_url = first_str(user, &["profile_pic", "profilePic", "pfp", "avatar"]);

    let title = first_str(livestream, &["session_title", "slug"]);
    let viewer_count = livestream.and_then(|l| {
        ["viewer_count", "viewers"]
            .iter()
            .find_map(|key| l.get(*key).and_then(count))
    });
    let thumbnail_url = livestream.and_then(|l| {
        non_empty(l.pointer("/thumbnail/url"))
            .or_else(|| non_empty(l.get("thumbnail_url")))
            .or_else(|| non_empty(l.get("thumbnail")))
    });

    Ok(ChannelStatus {
        identifier: identifier.to_string(),
        display_name,
        is_live,
        title,
        viewer_count,
        profile_url,
        avatar_url,
        thumbnail_url,
        fetch_failed: false,
    })
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn first_str(object: Option<&Value>, keys: &[&str]) -> Option<String> {
    let object = object?;
    keys.iter().find_map(|key| non_empty(object.get(*key)))
}

fn count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}
