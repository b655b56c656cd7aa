//! Per-channel mutable state shared by the gate and disruption mode

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// State kept for one channel for the lifetime of the process
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    /// User id -> timestamp of the last allowed interaction
    pub last_interaction: HashMap<String, DateTime<Utc>>,
    /// End of the current disruption, if any
    pub disruption_until: Option<DateTime<Utc>>,
}

/// Channel id -> state, behind a single lock.
///
/// Cloning shares the same underlying map. Each operation takes the lock
/// once, so read-modify-write sequences never interleave.
#[derive(Debug, Clone, Default)]
pub struct ChannelStore {
    inner: Arc<Mutex<HashMap<String, ChannelState>>>,
}

impl ChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the channel's state, creating it when absent
    pub fn update<R>(&self, channel: &str, f: impl FnOnce(&mut ChannelState) -> R) -> R {
        let mut channels = self.inner.lock();
        let state = channels.entry(channel.to_string()).or_default();
        f(state)
    }

    /// Run `f` on the channel's state if it exists
    pub fn update_existing<R>(
        &self,
        channel: &str,
        f: impl FnOnce(&mut ChannelState) -> R,
    ) -> Option<R> {
        self.inner.lock().get_mut(channel).map(f)
    }

    /// Read the channel's state if it exists
    pub fn read<R>(&self, channel: &str, f: impl FnOnce(&ChannelState) -> R) -> Option<R> {
        self.inner.lock().get(channel).map(f)
    }

    pub fn channel_count(&self) -> usize {
        self.inner.lock().len()
    }
}
