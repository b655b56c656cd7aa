//! Transport Framework
//!
//! The chat platform is an external collaborator. The agent only sees:
//! - an [`EventSource`] yielding gateway events
//! - a [`Transport`] that sends text, deletes messages and answers
//!   permission queries
//!
//! Implementations:
//! - Discord (REST API outbound)
//! - JSON lines (stdin events, stdout actions) for bridging and dry runs

pub mod discord;
pub mod stdio;
pub mod traits;

pub use discord::{DiscordChannel, DiscordConfig};
pub use stdio::{JsonLinesEvents, JsonLinesTransport, OutboundAction};
pub use traits::{
    channel_mention, user_mention, ChannelError, ChannelRef, EventSource, GatewayEvent,
    IncomingMessage, MemberJoined, Permission, ServerRef, Transport, UserRef, VerificationLevel,
};
