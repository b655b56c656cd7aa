//! Discord Transport
//!
//! Outbound actions over the Discord REST API. Inbound events arrive through
//! an [`EventSource`](super::EventSource) fed by the gateway bridge.

use super::traits::*;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

const API_BASE: &str = "https://discord.com/api/v10";

/// Discord transport configuration
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token
    pub bot_token: String,
    /// Maximum message length (Discord limit: 2000)
    pub max_message_length: usize,
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            max_message_length: 2000,
        }
    }
}

/// Discord REST transport
pub struct DiscordChannel {
    config: DiscordConfig,
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.config.bot_token)
    }

    /// Verify the token by fetching the current user
    pub async fn connect(&self) -> Result<UserRef, ChannelError> {
        let response = self
            .client
            .get(format!("{}/users/@me", API_BASE))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChannelError::AuthenticationFailed(
                "Invalid Discord bot token".to_string(),
            ));
        }

        let me: DiscordUser = response
            .json()
            .await
            .map_err(|e| ChannelError::Internal(e.to_string()))?;
        info!(user = %me.username, "Discord transport connected");
        Ok(UserRef::bot(&me.id, &me.username))
    }

    async fn post_message(&self, channel_id: &str, content: &str) -> Result<String, ChannelError> {
        let response = self
            .client
            .post(format!("{}/channels/{}/messages", API_BASE, channel_id))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let result: DiscordMessageResponse = response
                .json()
                .await
                .map_err(|e| ChannelError::Internal(e.to_string()))?;
            Ok(result.id)
        } else if status.as_u16() == 429 {
            Err(ChannelError::RateLimited(5))
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(ChannelError::SendFailed(format!(
                "Discord error {}: {}",
                status, error_text
            )))
        }
    }
}

/// Break `text` into messages of at most `limit` characters.
///
/// Lines are packed together while they fit; a line longer than `limit` is
/// cut on character boundaries.
fn chunk_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Option<(String, usize)> = None;

    for piece in text.split('\n').flat_map(|line| cut_line(line, limit)) {
        let piece_len = piece.chars().count();
        match &mut current {
            Some((buf, len)) if *len + 1 + piece_len <= limit => {
                buf.push('\n');
                buf.push_str(piece);
                *len += 1 + piece_len;
            }
            slot => {
                if let Some((buf, _)) = slot.take() {
                    chunks.push(buf);
                }
                *slot = Some((piece.to_string(), piece_len));
            }
        }
    }

    if let Some((buf, _)) = current {
        chunks.push(buf);
    }
    chunks
}

/// Pieces of `line` with at most `limit` characters each; `[""]` for an empty line
fn cut_line(line: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = line;
    while let Some((at, _)) = rest.char_indices().nth(limit) {
        let (head, tail) = rest.split_at(at);
        pieces.push(head);
        rest = tail;
    }
    pieces.push(rest);
    pieces
}

#[async_trait]
impl Transport for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, channel_id: &str, text: &str) -> Result<String, ChannelError> {
        let chunks = chunk_message(text, self.config.max_message_length);
        let mut last_id = String::new();

        for (i, chunk) in chunks.iter().enumerate() {
            last_id = self.post_message(channel_id, chunk).await?;
            if i < chunks.len() - 1 {
                tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
            }
        }

        debug!(channel_id, chunks = chunks.len(), "Discord message sent");
        Ok(last_id)
    }

    async fn delete(&self, channel_id: &str, message_id: &str) -> Result<(), ChannelError> {
        let response = self
            .client
            .delete(format!(
                "{}/channels/{}/messages/{}",
                API_BASE, channel_id, message_id
            ))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| ChannelError::DeleteFailed(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::DeleteFailed(format!(
                "Discord error {} deleting {}",
                response.status(),
                message_id
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct DiscordMessageResponse {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_lens(chunks: &[String]) -> Vec<usize> {
        chunks.iter().map(|c| c.chars().count()).collect()
    }

    #[test]
    fn test_short_message_is_single_chunk() {
        assert_eq!(chunk_message("hi", 2000), vec!["hi".to_string()]);
    }

    #[test]
    fn test_lines_are_packed_up_to_limit() {
        let text = (0..20)
            .map(|i| format!("line number {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk_message(&text, 50);
        assert!(chunks.len() > 1);
        assert!(char_lens(&chunks).iter().all(|&n| n <= 50));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_single_long_line_is_cut() {
        let text = format!("<#1> {}", "x".repeat(2500));
        let chunks = chunk_message(&text, 2000);
        assert_eq!(char_lens(&chunks), vec![2000, 505]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        let text = "é".repeat(2500);
        let chunks = chunk_message(&text, 2000);
        assert_eq!(char_lens(&chunks), vec![2000, 500]);
        assert_eq!(chunks.concat(), text);

        // 1500 two-byte characters fit in one message
        let fits = "é".repeat(1500);
        assert_eq!(chunk_message(&fits, 2000), vec![fits.clone()]);
    }

    #[test]
    fn test_long_line_between_short_ones() {
        let text = format!("intro\n{}\nout", "y".repeat(25));
        let chunks = chunk_message(&text, 10);
        assert_eq!(
            chunks,
            vec!["intro", "yyyyyyyyyy", "yyyyyyyyyy", "yyyyy\nout"]
        );
    }
}
