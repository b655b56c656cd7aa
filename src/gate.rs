//! Interaction Gate
//!
//! Decides whether the agent engages with a message, per (channel, user):
//!
//! ```text
//! Unknown ──allow──► Active ──cooldown elapses──► Expired (same as Unknown)
//!    ▲                 │
//!    └─────block───────┘
//! ```
//!
//! A user stays engaged for the cooldown window after each allowed
//! interaction; saying the agent's name re-opens the window at any time.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::channels::IncomingMessage;
use crate::lexicon::{categories, Lexicon};
use crate::state::ChannelStore;

/// Default engagement window
pub const DEFAULT_COOLDOWN_SECS: i64 = 120;

/// Per-channel, per-user engagement tracker
#[derive(Debug, Clone)]
pub struct InteractionGate {
    cooldown: Duration,
    store: ChannelStore,
}

impl InteractionGate {
    pub fn new(store: ChannelStore, cooldown: Duration) -> Self {
        Self { cooldown, store }
    }

    /// Create with the default 120s cooldown
    pub fn with_default_cooldown(store: ChannelStore) -> Self {
        Self::new(store, Duration::seconds(DEFAULT_COOLDOWN_SECS))
    }

    /// True iff the user interacted within the cooldown window before `now`
    pub fn is_allowed(&self, channel: &str, user: &str, now: DateTime<Utc>) -> bool {
        self.store
            .read(channel, |state| {
                state
                    .last_interaction
                    .get(user)
                    .is_some_and(|last| now - *last <= self.cooldown)
            })
            .unwrap_or(false)
    }

    /// Upsert the user's last interaction
    pub fn record_allow(&self, channel: &str, user: &str, timestamp: DateTime<Utc>) {
        self.store.update(channel, |state| {
            state.last_interaction.insert(user.to_string(), timestamp);
        });
    }

    /// Forget the user's last interaction; no-op when absent
    pub fn record_block(&self, channel: &str, user: &str) {
        self.store.update_existing(channel, |state| {
            state.last_interaction.remove(user);
        });
    }

    pub fn last_interaction(&self, channel: &str, user: &str) -> Option<DateTime<Utc>> {
        self.store
            .read(channel, |state| state.last_interaction.get(user).copied())
            .flatten()
    }

    /// Decide and record whether the agent engages with `message`.
    ///
    /// A message mentioning users is engaged with only when the agent is one
    /// of them. Otherwise the author must be inside the cooldown window or
    /// call the agent by name.
    pub fn decide_interaction(
        &self,
        message: &IncomingMessage,
        agent_id: &str,
        lexicon: &Lexicon,
    ) -> bool {
        let channel = message.channel.id.as_str();
        let author = message.author.id.as_str();

        let allow = if message.mentions.is_empty() {
            self.is_allowed(channel, author, message.timestamp)
                || lexicon.matches(&message.content, categories::NAME)
        } else {
            message.mentions_user(agent_id)
        };

        if allow {
            self.record_allow(channel, author, message.timestamp);
        } else {
            self.record_block(channel, author);
        }

        debug!(channel, author, allow, "Interaction decided");
        allow
    }
}
