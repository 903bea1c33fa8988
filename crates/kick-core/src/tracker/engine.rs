use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::aggregator::StatusAggregator;
use super::fetcher::ChannelStatusFetcher;
use super::status::{ChannelStatus, Snapshot};
use super::store::SnapshotStore;
use super::transition::{self, PreviousStatusTable};
use crate::config::TrackerConfig;
use crate::loader::ChannelLoader;
use crate::settings::TrackerSettings;
use crate::webhook::NotificationDispatcher;

/// Outcome of one update cycle.
pub struct CycleReport {
    pub snapshot: Arc<Snapshot>,
    pub went_live: Vec<ChannelStatus>,
    /// Delivery tasks spawned for `went_live`. Dropping them does not cancel delivery.
    pub notifications: Vec<JoinHandle<()>>,
}

/// Owns everything one update cycle reads or writes.
///
/// The previous-status table is only touched from [`run_cycle`](Self::run_cycle); the
/// snapshot is readable from anywhere through [`snapshot`](Self::snapshot).
pub struct Tracker {
    config: TrackerConfig,
    settings: ArcSwap<TrackerSettings>,
    aggregator: StatusAggregator,
    previous: Mutex<PreviousStatusTable>,
    dispatcher: NotificationDispatcher,
    store: SnapshotStore,
    created_at: DateTime<Utc>,
}

impl Tracker {
    pub fn new(
        settings: TrackerSettings,
        config: TrackerConfig,
        loader: Arc<dyn ChannelLoader>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        let fetcher = ChannelStatusFetcher::new(loader, &config);
        Self {
            config,
            settings: ArcSwap::from_pointee(settings),
            aggregator: StatusAggregator::new(fetcher),
            previous: Mutex::new(PreviousStatusTable::new()),
            dispatcher,
            store: SnapshotStore::new(),
            created_at: Utc::now(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn settings(&self) -> Arc<TrackerSettings> {
        self.settings.load_full()
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    /// Swap in a new settings set. Takes effect from the next cycle; a cycle already
    /// running keeps the settings it started with.
    pub(crate) fn replace_settings(&self, settings: TrackerSettings) {
        self.settings.store(Arc::new(settings));
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let settings = self.settings.load_full();

        let snapshot = self
            .aggregator
            .aggregate(settings.channels(), settings.debug)
            .await;

        let went_live = {
            let mut previous = self.previous.lock().await;
            transition::advance(snapshot.channels(), &mut previous)
        };

        for c in &went_live {
            info!(channel = %c.identifier, name = %c.display_name, "Channel went live");
        }

        let notifications = self.dispatcher.dispatch(went_live.clone());
        let snapshot = self.store.publish(snapshot);

        if settings.debug {
            info!(
                version = snapshot.version(),
                live = snapshot.live_count(),
                total = snapshot.total_count(),
                failed = snapshot.failed_count(),
                "Update cycle complete"
            );
        } else {
            debug!(
                version = snapshot.version(),
                live = snapshot.live_count(),
                total = snapshot.total_count(),
                "Update cycle complete"
            );
        }

        CycleReport {
            snapshot,
            went_live,
            notifications,
        }
    }
}
