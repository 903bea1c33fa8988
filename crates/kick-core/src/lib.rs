#![forbid(unsafe_code)]

pub mod config;
pub mod loader;
pub mod settings;
pub mod tracker;
pub mod webhook;

pub use config::{TrackerConfig, MIN_REFRESH_INTERVAL};
pub use loader::{ChannelLoader, HttpLoader, LoadError};
pub use settings::{SettingsError, SettingsPatch, TrackerSettings};
pub use tracker::{
    ChannelConfig, ChannelStatus, ChannelStatusFetcher, CycleReport, FetchError,
    PreviousStatusTable, SchedulerState, Snapshot, SnapshotStore, StatusAggregator, Tracker,
    UpdateScheduler,
};
pub use webhook::{
    NotificationDispatcher, Notifier, NotifyError, WebhookConfig, WebhookFormat,
    WebhookNotifier, WebhookPayload,
};
