use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kick_core::{
    ChannelConfig, ChannelLoader, ChannelStatus, LoadError, NotificationDispatcher, Notifier,
    NotifyError, Snapshot, Tracker, TrackerConfig, TrackerSettings,
};
use kick_core::tracker::collate::compare_display_names;

fn live(title: &str, viewers: u64) -> Option<String> {
    Some(format!(
        r#"{{"user": {{"username": "u"}}, "livestream": {{"is_live": true, "session_title": "{title}", "viewer_count": {viewers}}}}}"#
    ))
}

fn named_live(name: &str) -> Option<String> {
    Some(format!(
        r#"{{"user": {{"display_name": "{name}"}}, "livestream": {{"is_live": true}}}}"#
    ))
}

fn offline() -> Option<String> {
    Some(r#"{"user": {"username": "u"}, "livestream": null}"#.to_string())
}

/// `None` entries fail with HTTP 500.
struct ScriptedLoader {
    step: Arc<AtomicUsize>,
    responses: HashMap<String, Vec<Option<String>>>,
}

#[async_trait]
impl ChannelLoader for ScriptedLoader {
    async fn load(&self, identifier: &str) -> Result<String, LoadError> {
        let steps = self
            .responses
            .get(identifier)
            .unwrap_or_else(|| panic!("ScriptedLoader: unexpected channel: {}", identifier));
        let idx = self.step.load(Ordering::SeqCst).min(steps.len() - 1);
        steps[idx].clone().ok_or_else(|| LoadError::Http {
            url: format!("https://kick.com/api/v2/channels/{identifier}"),
            status: 500,
            message: "Internal Server Error".into(),
            is_last_retry: true,
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn target(&self) -> &str {
        "recording"
    }

    async fn notify(&self, channel: &ChannelStatus) -> Result<(), NotifyError> {
        self.seen
            .lock()
            .unwrap()
            .push((channel.identifier.clone(), channel.display_name.clone()));
        Ok(())
    }
}

struct Harness {
    step: Arc<AtomicUsize>,
    tracker: Tracker,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new(channels: Vec<ChannelConfig>, script: Vec<(&str, Vec<Option<String>>)>) -> Self {
        let step = Arc::new(AtomicUsize::new(0));
        let responses = script
            .into_iter()
            .map(|(id, steps)| (id.to_string(), steps))
            .collect();
        let loader = Arc::new(ScriptedLoader {
            step: Arc::clone(&step),
            responses,
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = NotificationDispatcher::new(vec![notifier.clone() as Arc<dyn Notifier>]);
        let tracker = Tracker::new(
            TrackerSettings::new(channels),
            TrackerConfig::default(),
            loader,
            dispatcher,
        );
        Self {
            step,
            tracker,
            notifier,
        }
    }

    /// Run cycle number `step` and wait for its notifications.
    async fn cycle(&self, step: usize) -> Arc<Snapshot> {
        self.step.store(step, Ordering::SeqCst);
        let report = self.tracker.run_cycle().await;
        for h in report.notifications {
            h.await.unwrap();
        }
        report.snapshot
    }

    fn notified(&self) -> Vec<String> {
        self.notifier
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

fn assert_invariants(s: &Snapshot) {
    assert_eq!(s.total_count(), s.channels().len());
    assert_eq!(
        s.live_count(),
        s.channels().iter().filter(|c| c.is_live).count()
    );
    for pair in s.channels().windows(2) {
        assert!(
            pair[0].is_live || !pair[1].is_live,
            "offline channel {} precedes live channel {}",
            pair[0].identifier,
            pair[1].identifier
        );
        if pair[0].is_live == pair[1].is_live {
            assert_ne!(
                compare_display_names(&pair[0].display_name, &pair[1].display_name),
                std::cmp::Ordering::Greater
            );
        }
    }
}

#[tokio::test]
async fn alice_live_bob_overridden() {
    let h = Harness::new(
        vec![
            ChannelConfig::new("alice"),
            ChannelConfig::new("bob").with_display_name("Bobby"),
        ],
        vec![("alice", vec![live("Hello", 42)]), ("bob", vec![offline()])],
    );

    let s = h.cycle(0).await;
    assert_invariants(&s);
    assert_eq!(s.live_count(), 1);
    assert_eq!(s.total_count(), 2);

    let alice = &s.channels()[0];
    assert_eq!(alice.identifier, "alice");
    assert!(alice.is_live);
    assert_eq!(alice.title.as_deref(), Some("Hello"));
    assert_eq!(alice.viewer_count, Some(42));

    let bob = &s.channels()[1];
    assert_eq!(bob.identifier, "bob");
    assert_eq!(bob.display_name, "Bobby");
    assert!(!bob.is_live);

    assert_eq!(h.notified(), vec!["alice"]);
}

#[tokio::test]
async fn staying_live_notifies_once() {
    let h = Harness::new(
        vec![ChannelConfig::new("a")],
        vec![("a", vec![offline(), live("t", 1), live("t", 2), live("t", 3)])],
    );

    h.cycle(0).await;
    assert!(h.notified().is_empty());
    h.cycle(1).await;
    h.cycle(2).await;
    h.cycle(3).await;
    assert_eq!(h.notified(), vec!["a"]);
}

#[tokio::test]
async fn first_observed_live_notifies() {
    let h = Harness::new(vec![ChannelConfig::new("a")], vec![("a", vec![live("t", 1)])]);
    h.cycle(0).await;
    assert_eq!(h.notified(), vec!["a"]);
}

#[tokio::test]
async fn one_failing_channel_does_not_spoil_the_rest() {
    let h = Harness::new(
        vec![
            ChannelConfig::new("a"),
            ChannelConfig::new("b"),
            ChannelConfig::new("c"),
        ],
        vec![
            ("a", vec![named_live("Alpha")]),
            ("b", vec![None]),
            ("c", vec![offline()]),
        ],
    );

    let s = h.cycle(0).await;
    assert_invariants(&s);
    assert_eq!(s.total_count(), 3);

    let a = s.get("a").unwrap();
    assert!(a.is_live && !a.fetch_failed);
    assert_eq!(a.display_name, "Alpha");

    let b = s.get("b").unwrap();
    assert!(b.fetch_failed);
    assert!(!b.is_live);
    assert_eq!(b.display_name, "b");
    assert_eq!(b.profile_url, "https://kick.com/b");

    let c = s.get("c").unwrap();
    assert!(!c.fetch_failed && !c.is_live);
}

#[tokio::test]
async fn all_failures_still_publish() {
    let h = Harness::new(
        vec![ChannelConfig::new("a"), ChannelConfig::new("b")],
        vec![("a", vec![None]), ("b", vec![None])],
    );

    let s = h.cycle(0).await;
    assert_eq!(s.version(), 1);
    assert_eq!(s.total_count(), 2);
    assert_eq!(s.live_count(), 0);
    assert_eq!(s.failed_count(), 2);
    assert_eq!(h.tracker.snapshot().version(), 1);
}

#[tokio::test]
async fn transient_failure_renotifies() {
    let h = Harness::new(
        vec![ChannelConfig::new("a")],
        vec![("a", vec![live("t", 1), None, live("t", 1)])],
    );

    h.cycle(0).await;
    h.cycle(1).await;
    h.cycle(2).await;
    assert_eq!(h.notified(), vec!["a", "a"]);
}

#[tokio::test]
async fn notification_uses_resolved_display_name() {
    let h = Harness::new(
        vec![ChannelConfig::new("Zed").with_display_name("Zed the Streamer")],
        vec![("Zed", vec![named_live("zed_kick")])],
    );

    h.cycle(0).await;
    let seen = h.notifier.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![("Zed".to_string(), "Zed the Streamer".to_string())]);
}

#[tokio::test]
async fn ordering_is_deterministic_across_cycles() {
    let h = Harness::new(
        vec![
            ChannelConfig::new("z"),
            ChannelConfig::new("m"),
            ChannelConfig::new("b"),
            ChannelConfig::new("k"),
        ],
        vec![
            ("z", vec![named_live("Żaneta")]),
            ("m", vec![offline()]),
            ("b", vec![named_live("bartek")]),
            ("k", vec![None]),
        ],
    );

    let first = h.cycle(0).await;
    let second = h.cycle(0).await;
    assert_invariants(&first);

    let order = |s: &Snapshot| -> Vec<String> {
        s.channels().iter().map(|c| c.identifier.clone()).collect()
    };
    assert_eq!(order(&first), vec!["b", "z", "k", "m"]);
    assert_eq!(order(&first), order(&second));
    assert_eq!(second.version(), 2);
}

#[tokio::test]
async fn empty_channel_list_publishes_empty_snapshot() {
    let h = Harness::new(vec![], vec![]);
    let s = h.cycle(0).await;
    assert_eq!(s.total_count(), 0);
    assert_eq!(s.live_count(), 0);
    assert_eq!(s.version(), 1);
}
