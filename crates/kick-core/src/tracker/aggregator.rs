use chrono::Utc;
use futures::future::join_all;
use tracing::debug;

use super::fetcher::ChannelStatusFetcher;
use super::status::{ChannelConfig, ChannelStatus, Snapshot};

/// Fans out one fetch per configured channel and folds the results into a [`Snapshot`].
#[derive(Clone)]
pub struct StatusAggregator {
    fetcher: ChannelStatusFetcher,
}

impl StatusAggregator {
    pub fn new(fetcher: ChannelStatusFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &ChannelStatusFetcher {
        &self.fetcher
    }

    pub async fn aggregate(&self, configs: &[ChannelConfig], debug: bool) -> Snapshot {
        let fetches = configs
            .iter()
            .map(|c| self.fetcher.fetch(&c.identifier, debug));
        let results = join_all(fetches).await;

        debug!(
            channels = results.len(),
            failed = results.iter().filter(|s| s.fetch_failed).count(),
            "Channel fetches complete"
        );

        let channels = results
            .into_iter()
            .map(|status| apply_override(status, configs))
            .collect();

        Snapshot::new(channels, Utc::now())
    }
}

/// Resolve the display name: configured override, then fetched name, then identifier.
fn apply_override(mut status: ChannelStatus, configs: &[ChannelConfig]) -> ChannelStatus {
    let key = status.key();
    let name_override = configs
        .iter()
        .find(|c| c.key() == key)
        .and_then(|c| c.display_name_override.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty());

    if let Some(name) = name_override {
        status.display_name = name.to_string();
    } else if status.display_name.trim().is_empty() {
        status.display_name = status.identifier.clone();
    }
    status
}
