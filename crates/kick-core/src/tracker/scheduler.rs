use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::engine::Tracker;
use crate::config::effective_refresh_interval;
use crate::settings::{SettingsError, TrackerSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Clears the in-flight flag when a cycle ends, even if it panicked.
struct CycleGuard(Arc<AtomicBool>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The part of the scheduler shared with its timer task.
#[derive(Clone)]
struct CycleRunner {
    tracker: Arc<Tracker>,
    in_flight: Arc<AtomicBool>,
    started: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
}

impl CycleRunner {
    /// Start a cycle unless one is already running.
    fn try_start(&self) -> Option<JoinHandle<()>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            debug!("Previous update cycle still running, skipping tick");
            return None;
        }

        self.started.fetch_add(1, Ordering::Relaxed);
        let guard = CycleGuard(Arc::clone(&self.in_flight));
        let tracker = Arc::clone(&self.tracker);
        Some(tokio::spawn(async move {
            let _guard = guard;
            tracker.run_cycle().await;
        }))
    }
}

/// Drives [`Tracker::run_cycle`] on a fixed period without ever overlapping cycles.
pub struct UpdateScheduler {
    runner: CycleRunner,
    period: Mutex<Duration>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl UpdateScheduler {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        let period = tracker.settings().effective_interval();
        Self {
            runner: CycleRunner {
                tracker,
                in_flight: Arc::new(AtomicBool::new(false)),
                started: Arc::new(AtomicU64::new(0)),
                skipped: Arc::new(AtomicU64::new(0)),
            },
            period: Mutex::new(period),
            timer: Mutex::new(None),
        }
    }

    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.runner.tracker
    }

    pub fn state(&self) -> SchedulerState {
        if self.runner.in_flight.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub async fn period(&self) -> Duration {
        *self.period.lock().await
    }

    pub async fn is_scheduled(&self) -> bool {
        self.timer
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn cycles_started(&self) -> u64 {
        self.runner.started.load(Ordering::Relaxed)
    }

    pub fn cycles_skipped(&self) -> u64 {
        self.runner.skipped.load(Ordering::Relaxed)
    }

    /// Run one cycle right away, then tick at the configured refresh interval.
    pub async fn start(&self) -> Duration {
        self.runner.try_start();
        let requested = self.runner.tracker.settings().refresh_interval;
        self.reschedule(requested).await
    }

    /// Start an out-of-band cycle. Returns `false` if one is already running.
    pub fn trigger(&self) -> bool {
        self.runner.try_start().is_some()
    }

    /// Replace the timer with one ticking every `period_ms` (at least 3000 ms).
    ///
    /// The first tick of the new timer is one full period from now. A cycle already in
    /// flight keeps running and still blocks overlapping cycles.
    pub async fn reschedule(&self, period_ms: u64) -> Duration {
        let period = effective_refresh_interval(period_ms);
        let mut timer = self.timer.lock().await;
        if let Some(old) = timer.take() {
            old.abort();
        }
        *timer = Some(spawn_timer(self.runner.clone(), period));
        *self.period.lock().await = period;

        info!(
            requested_ms = period_ms,
            period_ms = period.as_millis() as u64,
            "Update timer scheduled"
        );
        period
    }

    /// Validate and apply new settings, then restart the timer with their interval.
    ///
    /// Invalid settings are rejected and the running configuration stays in place.
    pub async fn reconfigure(&self, settings: TrackerSettings) -> Result<Duration, SettingsError> {
        settings.validate()?;
        let requested = settings.refresh_interval;
        info!(
            channels = settings.channels().len(),
            debug = settings.debug,
            "Applying new tracker settings"
        );
        self.runner.tracker.replace_settings(settings);
        Ok(self.reschedule(requested).await)
    }

    /// Stop ticking. A cycle already running completes and publishes.
    pub async fn stop(&self) {
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
            info!("Update timer stopped");
        }
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}

fn spawn_timer(runner: CycleRunner, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            runner.try_start();
        }
    })
}
