//! Chatgate
//!
//! Conversational gateway agent: listens to a chat event stream, guesses
//! what a message wants with typo-tolerant keyword matching and answers with
//! randomized template lines, while throttling how often it engages.
//!
//! # Features
//!
//! - **Lexicon Matcher**: fuzzy word/phrase matching with transposition tolerance
//! - **Line Renderer**: weighted random lines, `{a|b}` alternation, placeholders
//! - **Interaction Gate**: per-channel, per-user cooldown state machine
//! - **Disruption Mode**: temporary channel-wide suppression with auto-expiry
//! - **Intent Dispatcher**: first-match decision tree over message intents
//!
//! # Architecture
//!
//! ```text
//! EventSource ──► Agent ──► Disruption ──► Gate ──► Dispatcher ──► Transport
//!  (stdin/JSON)     │                                   │         (Discord/stdout)
//!                   │                                   ├── Lexicon
//!                   └── Content (words, lines,          └── LineRenderer
//!                        channels, bots)
//! ```

pub mod agent;
pub mod channels;
pub mod config;
pub mod content;
pub mod dispatcher;
pub mod disruption;
pub mod gate;
pub mod lexicon;
pub mod lines;
pub mod random;
pub mod registry;
pub mod state;
pub mod text;
pub mod welcome;

pub use agent::{Agent, AgentError, AgentSettings};
pub use config::Config;
pub use content::{Content, ContentError};
pub use dispatcher::{AgentIdentity, Intent, IntentDispatcher, Response};
pub use disruption::{DisruptionMode, DisruptionStatus};
pub use gate::InteractionGate;
pub use lexicon::{fuzzy_contains, fuzzy_equal, Lexicon};
pub use lines::{FormatError, LineBank, LineEntry, LineRenderer, Placeholders, WeightedLine};
pub use random::{RandomSource, ScriptedRandom, ThreadRandom};
pub use registry::{ChannelInfo, ChannelRegistry, PeerInfo, PeerRegistry};
