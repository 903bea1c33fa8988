use std::collections::HashMap;

use super::status::ChannelStatus;

/// Last observed live flag per channel, keyed by lower-cased identifier.
///
/// Lives for the process lifetime only. Unknown channels read as offline.
#[derive(Debug, Clone, Default)]
pub struct PreviousStatusTable {
    live: HashMap<String, bool>,
}

impl PreviousStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn was_live(&self, identifier: &str) -> bool {
        self.live
            .get(&identifier.to_lowercase())
            .copied()
            .unwrap_or(false)
    }

    /// Overwrite the flag of every channel in `channels`, failed fetches included.
    pub fn record(&mut self, channels: &[ChannelStatus]) {
        for c in channels {
            self.live.insert(c.key(), c.is_live);
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

/// Channels that are live now and were not live (or never seen) last cycle.
pub fn detect(channels: &[ChannelStatus], previous: &PreviousStatusTable) -> Vec<ChannelStatus> {
    channels
        .iter()
        .filter(|c| c.is_live && !previous.was_live(&c.identifier))
        .cloned()
        .collect()
}

/// Detect transitions and then record the new flags, as one step of an update cycle.
pub fn advance(channels: &[ChannelStatus], previous: &mut PreviousStatusTable) -> Vec<ChannelStatus> {
    let transitions = detect(channels, previous);
    previous.record(channels);
    transitions
}
