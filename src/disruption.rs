//! Disruption Mode
//!
//! A channel-wide suppression window. While active, every inbound message in
//! the channel is deleted after a short delay and otherwise ignored. The
//! first message arriving after the window ends it.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::state::ChannelStore;

/// Default suppression window
pub const DEFAULT_DISRUPTION_SECS: i64 = 180;

/// Outcome of checking a message against the channel's disruption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisruptionStatus {
    /// No disruption in this channel
    Inactive,
    /// The disruption just expired; processing continues
    Ended,
    /// Still disrupted; the message must be suppressed
    Active { until: DateTime<Utc> },
}

#[derive(Debug, Clone)]
pub struct DisruptionMode {
    duration: Duration,
    store: ChannelStore,
}

impl DisruptionMode {
    pub fn new(store: ChannelStore, duration: Duration) -> Self {
        Self { duration, store }
    }

    pub fn with_default_duration(store: ChannelStore) -> Self {
        Self::new(store, Duration::seconds(DEFAULT_DISRUPTION_SECS))
    }

    /// Start (or restart) the disruption, returning its end
    pub fn activate(&self, channel: &str, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let until = timestamp + self.duration;
        self.store.update(channel, |state| {
            state.disruption_until = Some(until);
        });
        info!(channel, %until, "Disruption activated");
        until
    }

    /// Check a message stamped `timestamp`, ending an expired disruption
    pub fn check(&self, channel: &str, timestamp: DateTime<Utc>) -> DisruptionStatus {
        self.store
            .update_existing(channel, |state| match state.disruption_until {
                None => DisruptionStatus::Inactive,
                Some(until) if timestamp > until => {
                    state.disruption_until = None;
                    info!(channel, "Disruption ended");
                    DisruptionStatus::Ended
                }
                Some(until) => DisruptionStatus::Active { until },
            })
            .unwrap_or(DisruptionStatus::Inactive)
    }

    pub fn until(&self, channel: &str) -> Option<DateTime<Utc>> {
        self.store
            .read(channel, |state| state.disruption_until)
            .flatten()
    }
}
