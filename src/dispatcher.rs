//! Intent Dispatcher
//!
//! Classifies an engaged message into one intent (first match wins) and
//! renders the matching response:
//!
//! | # | Trigger                                   | Response                 |
//! |---|-------------------------------------------|--------------------------|
//! | 1 | `greeting`                                | greeting line            |
//! | 2 | `help`                                    | about-self + about-help  |
//! | 3 | `tell`, or `question` ending in `?`       | channel / peer listing   |
//! | 4 | `neurotoxin` + manage_messages permission | start disruption         |
//! | 5 | `stop`                                    | end engagement, silent   |
//! | 6 | `name` or agent mentioned                 | greeting line            |
//! | 7 | anything of 8+ characters                 | unknown line             |

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::channels::{channel_mention, user_mention, IncomingMessage};
use crate::content::Content;
use crate::lexicon::{categories, fuzzy_equal};
use crate::lines::{FormatError, LineRenderer, Placeholders};
use crate::text::{pretty_and, pretty_list};

/// Line ids rendered by the agent
pub mod line_ids {
    pub const GREETING: &str = "greeting";
    pub const ABOUT_SELF: &str = "about-self";
    pub const ABOUT_HELP: &str = "about-help";
    pub const ABOUT_WELCOME: &str = "about-welcome";
    pub const UNKNOWN: &str = "unknown";
    pub const NEUROTOXIN: &str = "neurotoxin";
    pub const NEUROTOXIN_DISABLED: &str = "neurotoxin-disabled";
    pub const CHANNELS_LIST: &str = "channels-list";
    pub const BOT_LIST: &str = "bot-list";
    pub const BOT_HOSTED: &str = "bot-hosted";
    pub const WELCOME: &str = "welcome";
    pub const WELCOME_VERIFICATION_MEDIUM: &str = "welcome-verification-medium";
    pub const WELCOME_VERIFICATION_HIGH: &str = "welcome-verification-high";
    pub const WELCOME_VERIFICATION_ACCOUNT: &str = "welcome-verification-account";
}

/// Messages shorter than this get no "unknown" reply
const MIN_UNKNOWN_LEN: usize = 8;

/// How far from the end a `?` still marks a question
const QUESTION_TAIL: usize = 5;

/// Who the agent is on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub id: String,
    pub display_name: String,
}

impl AgentIdentity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// What a message asks of the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Help,
    Describe,
    Disrupt,
    Stop,
    Addressed,
    Unknown,
    Ignore,
}

/// What the agent should do about a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Send text to the message channel (skipped when empty)
    Reply(String),
    /// Start disruption mode and announce it
    Disrupt { notice: String },
    /// Stop engaging with the author
    Block,
    /// Do nothing
    Silent,
}

/// Placeholder values drawn from a message
pub fn message_placeholders(message: &IncomingMessage) -> Placeholders {
    Placeholders::new()
        .with("user", message.author.display())
        .with("user_mention", message.author.mention())
        .with("channel", message.channel.name.as_str())
        .with("channel_mention", message.channel.mention())
        .with(
            "server",
            message
                .server
                .as_ref()
                .map(|s| s.name.as_str())
                .unwrap_or_default(),
        )
}

fn ends_with_question(content: &str) -> bool {
    content.chars().rev().take(QUESTION_TAIL).any(|c| c == '?')
}

pub struct IntentDispatcher {
    content: Arc<Content>,
    renderer: LineRenderer,
    agent: AgentIdentity,
}

impl IntentDispatcher {
    pub fn new(content: Arc<Content>, renderer: LineRenderer, agent: AgentIdentity) -> Self {
        Self {
            content,
            renderer,
            agent,
        }
    }

    pub fn agent(&self) -> &AgentIdentity {
        &self.agent
    }

    fn matches(&self, message: &IncomingMessage, category: &str) -> bool {
        self.content.lexicon.matches(&message.content, category)
    }

    /// Whether the message asks for disruption, so the caller knows to check permissions
    pub fn requests_disruption(&self, message: &IncomingMessage) -> bool {
        self.matches(message, categories::NEUROTOXIN)
    }

    /// Pick the intent; `may_manage_messages` gates the disruption branch
    pub fn classify(&self, message: &IncomingMessage, may_manage_messages: bool) -> Intent {
        let intent = if self.matches(message, categories::GREETING) {
            Intent::Greeting
        } else if self.matches(message, categories::HELP) {
            Intent::Help
        } else if self.matches(message, categories::TELL)
            || (self.matches(message, categories::QUESTION)
                && ends_with_question(&message.content))
        {
            Intent::Describe
        } else if may_manage_messages && self.requests_disruption(message) {
            Intent::Disrupt
        } else if self.matches(message, categories::STOP) {
            Intent::Stop
        } else if self.matches(message, categories::NAME) || message.mentions_user(&self.agent.id)
        {
            Intent::Addressed
        } else if message.content.chars().count() >= MIN_UNKNOWN_LEN {
            Intent::Unknown
        } else {
            Intent::Ignore
        };

        debug!(message_id = %message.id, ?intent, "Message classified");
        intent
    }

    /// Render the response for an already classified message
    pub fn respond(&self, message: &IncomingMessage, intent: Intent) -> Result<Response, FormatError> {
        let response = match intent {
            Intent::Greeting | Intent::Addressed => Response::Reply(
                self.renderer
                    .format_line(line_ids::GREETING, &message_placeholders(message))?,
            ),
            Intent::Help => {
                let about = self.renderer.format_line(
                    line_ids::ABOUT_SELF,
                    &Placeholders::new().with("client", self.agent.display_name.as_str()),
                )?;
                Response::Reply(format!(
                    "{}\n{}",
                    about,
                    self.renderer.get_line(line_ids::ABOUT_HELP)
                ))
            }
            Intent::Describe => Response::Reply(self.describe_entities(message)?),
            Intent::Disrupt => Response::Disrupt {
                notice: self.renderer.get_line(line_ids::NEUROTOXIN),
            },
            Intent::Stop => Response::Block,
            Intent::Unknown => Response::Reply(
                self.renderer
                    .format_line(line_ids::UNKNOWN, &message_placeholders(message))?,
            ),
            Intent::Ignore => Response::Silent,
        };
        Ok(response)
    }

    /// Describe the channels and peer bots a message asks about
    pub fn describe_entities(&self, message: &IncomingMessage) -> Result<String, FormatError> {
        let registry = &self.content;
        let mut channels: BTreeSet<&str> = message
            .channel_mentions
            .iter()
            .map(|c| c.id.as_str())
            .filter(|id| registry.channels.contains(id))
            .collect();
        let mut peers: BTreeSet<&str> = message
            .mentions
            .iter()
            .filter(|u| u.bot)
            .map(|u| u.id.as_str())
            .filter(|id| registry.peers.contains(id))
            .collect();

        for word in message.content.split_whitespace() {
            let channel_word = word.trim_start_matches('#');
            for (id, info) in registry.channels.iter() {
                if info.names(id).any(|name| fuzzy_equal(channel_word, name)) {
                    channels.insert(id);
                }
            }
            let peer_word = word.trim_start_matches('@');
            for (id, info) in registry.peers.iter() {
                if info.names(id).any(|name| fuzzy_equal(peer_word, name)) {
                    peers.insert(id);
                }
            }
        }

        let mut text = String::new();

        if channels.is_empty() && self.matches(message, categories::CHANNEL) {
            text.push('\n');
            text.push_str(&self.renderer.get_line(line_ids::CHANNELS_LIST));
            channels = registry.channels.iter().map(|(id, _)| id).collect();
        }

        let mut listed: Vec<_> = channels
            .iter()
            .filter_map(|id| registry.channels.get(id).map(|info| (*id, info)))
            .filter(|(_, info)| info.on_server(message.server_id()))
            .collect();
        listed.sort_by_key(|(_, info)| info.position);

        for (id, info) in listed {
            text.push('\n');
            text.push_str(&channel_mention(id));
            text.push(' ');
            text.push_str(&self.renderer.render(&info.desc));
        }

        if peers.is_empty() && self.matches(message, categories::BOTS) {
            text.push('\n');
            text.push_str(&self.renderer.get_line(line_ids::BOT_LIST));
            peers = registry.peers.iter().map(|(id, _)| id).collect();
        }

        let mut hosted = Vec::new();
        for id in &peers {
            let Some(info) = registry.peers.get(id) else {
                continue;
            };
            text.push('\n');
            text.push_str(&user_mention(id));
            text.push(' ');
            text.push_str(&self.renderer.render(&info.desc));

            if !info.prefixes.is_empty() {
                let label = if info.prefixes.len() > 1 { "prefixes" } else { "prefix" };
                let list = pretty_list(&info.prefixes, |p| format!("`{}`", p), "and");
                text.push_str(&format!(" ({}: {})", label, list));
            }
            if info.hosted {
                hosted.push(user_mention(id));
            }
        }

        if !hosted.is_empty() {
            let summary = self.renderer.format_line(
                line_ids::BOT_HOSTED,
                &Placeholders::new().with("bot_list", pretty_and(&hosted)),
            )?;
            text.push('\n');
            text.push_str(&summary);
        }

        Ok(text.trim().to_string())
    }
}
