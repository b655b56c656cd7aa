//! Transport Trait Definitions
//!
//! Gateway events flowing in, and the capabilities the agent needs to act on
//! them: sending text, deleting messages and querying permissions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error types for transport operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A user as referenced by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
    /// Server nickname, if any
    #[serde(default)]
    pub display_name: Option<String>,
    /// Automated account
    #[serde(default)]
    pub bot: bool,
}

impl UserRef {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            display_name: None,
            bot: false,
        }
    }

    pub fn bot(id: &str, name: &str) -> Self {
        Self {
            bot: true,
            ..Self::new(id, name)
        }
    }

    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn mention(&self) -> String {
        user_mention(&self.id)
    }
}

/// A channel as referenced by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl ChannelRef {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    pub fn mention(&self) -> String {
        channel_mention(&self.id)
    }
}

/// Server membership verification requirements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// A server (guild)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub verification_level: VerificationLevel,
    /// Where welcomes are posted
    #[serde(default)]
    pub default_channel: Option<ChannelRef>,
}

impl ServerRef {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            verification_level: VerificationLevel::None,
            default_channel: None,
        }
    }
}

/// Inbound chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    pub author: UserRef,
    pub channel: ChannelRef,
    #[serde(default)]
    pub server: Option<ServerRef>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Users explicitly mentioned
    #[serde(default)]
    pub mentions: Vec<UserRef>,
    /// Channels explicitly mentioned
    #[serde(default)]
    pub channel_mentions: Vec<ChannelRef>,
    /// Author's permissions in the channel, as resolved by the gateway
    #[serde(default)]
    pub author_permissions: Vec<Permission>,
}

impl IncomingMessage {
    /// Create a plain text message stamped now
    pub fn text(author: UserRef, channel: ChannelRef, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author,
            channel,
            server: None,
            content: content.to_string(),
            timestamp: Utc::now(),
            mentions: Vec::new(),
            channel_mentions: Vec::new(),
            author_permissions: Vec::new(),
        }
    }

    pub fn with_server(mut self, server: ServerRef) -> Self {
        self.server = Some(server);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<UserRef>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn with_channel_mentions(mut self, channels: Vec<ChannelRef>) -> Self {
        self.channel_mentions = channels;
        self
    }

    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.author_permissions = permissions;
        self
    }

    pub fn server_id(&self) -> Option<&str> {
        self.server.as_ref().map(|s| s.id.as_str())
    }

    pub fn mentions_user(&self, user_id: &str) -> bool {
        self.mentions.iter().any(|u| u.id == user_id)
    }
}

/// A member joining a server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberJoined {
    pub member: UserRef,
    pub server: ServerRef,
    /// Account creation time
    pub created_at: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
}

/// Event delivered by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    Ready { user: UserRef },
    MemberJoined(MemberJoined),
    MessageReceived(IncomingMessage),
}

/// Channel permissions the agent checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageMessages,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageMessages => "manage_messages",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform mention markup for a user
pub fn user_mention(id: &str) -> String {
    format!("<@{}>", id)
}

/// Platform mention markup for a channel
pub fn channel_mention(id: &str) -> String {
    format!("<#{}>", id)
}

/// Outbound capabilities - implement for each platform
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name identifier
    fn name(&self) -> &str;

    /// Send text to a channel, returning the platform message id
    async fn send(&self, channel_id: &str, text: &str) -> Result<String, ChannelError>;

    /// Delete a message
    async fn delete(&self, channel_id: &str, message_id: &str) -> Result<(), ChannelError>;

    /// Whether the message author holds `permission` in the message channel
    async fn author_has_permission(
        &self,
        message: &IncomingMessage,
        permission: Permission,
    ) -> Result<bool, ChannelError> {
        Ok(message.author_permissions.contains(&permission))
    }
}

/// Inbound event stream
#[async_trait]
pub trait EventSource: Send {
    /// Next event, `None` once the stream is closed
    async fn next_event(&mut self) -> Result<Option<GatewayEvent>, ChannelError>;
}
