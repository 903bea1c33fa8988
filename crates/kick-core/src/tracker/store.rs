use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::status::Snapshot;

/// Holds the current [`Snapshot`] and swaps it atomically on publish.
///
/// Readers get an `Arc` to a complete snapshot and never wait on the writer.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    next_version: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            next_version: AtomicU64::new(1),
        }
    }

    /// Stamp the next version on `snapshot` and make it the current one.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let snapshot = Arc::new(snapshot.with_version(version));
        self.current.store(Arc::clone(&snapshot));
        snapshot
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::status::ChannelStatus;
    use chrono::Utc;

    fn snapshot(n: usize) -> Snapshot {
        let channels = (0..n)
            .map(|i| {
                let mut s = ChannelStatus::failed(format!("c{i}"), format!("https://kick.com/c{i}"));
                s.is_live = i % 2 == 0;
                s
            })
            .collect();
        Snapshot::new(channels, Utc::now())
    }

    #[test]
    fn starts_empty_at_version_zero() {
        let store = SnapshotStore::new();
        let s = store.current();
        assert_eq!(s.version(), 0);
        assert_eq!(s.total_count(), 0);
    }

    #[test]
    fn publish_replaces_and_bumps_version() {
        let store = SnapshotStore::new();
        let before = store.current();
        store.publish(snapshot(3));
        store.publish(snapshot(4));

        let now = store.current();
        assert_eq!(now.version(), 2);
        assert_eq!(now.total_count(), 4);
        // Earlier readers keep their own copy.
        assert_eq!(before.total_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_only_see_complete_snapshots() {
        let store = Arc::new(SnapshotStore::new());

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 1..=200 {
                    store.publish(snapshot(i % 17));
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for _ in 0..500 {
                        let s = store.current();
                        assert_eq!(s.total_count(), s.channels().len());
                        assert_eq!(
                            s.live_count(),
                            s.channels().iter().filter(|c| c.is_live).count()
                        );
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for r in readers {
            r.await.unwrap();
        }
        assert_eq!(store.current().version(), 200);
    }
}
