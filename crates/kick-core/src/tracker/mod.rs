pub mod aggregator;
pub mod collate;
pub mod engine;
pub mod fetcher;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod transition;

pub use aggregator::StatusAggregator;
pub use engine::{CycleReport, Tracker};
pub use fetcher::{ChannelStatusFetcher, FetchError};
pub use scheduler::{SchedulerState, UpdateScheduler};
pub use status::{ChannelConfig, ChannelStatus, Snapshot};
pub use store::SnapshotStore;
pub use transition::PreviousStatusTable;
