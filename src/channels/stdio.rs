//! JSON-lines Transport
//!
//! Gateway events are read one JSON object per line (stdin in production);
//! outbound actions are written the same way so a bridge process can relay
//! them to the real platform.

use super::traits::*;
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Reads [`GatewayEvent`]s from newline-delimited JSON
pub struct JsonLinesEvents<R> {
    reader: R,
    line: String,
}

impl JsonLinesEvents<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesEvents<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EventSource for JsonLinesEvents<R> {
    async fn next_event(&mut self) -> Result<Option<GatewayEvent>, ChannelError> {
        loop {
            self.line.clear();
            let bytes_read = self
                .reader
                .read_line(&mut self.line)
                .await
                .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

            if bytes_read == 0 {
                debug!("Event stream closed");
                return Ok(None);
            }

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<GatewayEvent>(trimmed) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => {
                    warn!("Skipping malformed event: {}", e);
                    continue;
                }
            }
        }
    }
}

/// Outbound action record
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutboundAction<'a> {
    Send { channel: &'a str, text: &'a str },
    Delete { channel: &'a str, message: &'a str },
}

/// Writes outbound actions as JSON lines
pub struct JsonLinesTransport<W> {
    writer: Mutex<W>,
}

impl JsonLinesTransport<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer, e.g. to inspect captured output
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn emit(&self, action: &OutboundAction<'_>) -> Result<(), ChannelError> {
        let mut line =
            serde_json::to_string(action).map_err(|e| ChannelError::Internal(e.to_string()))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Transport for JsonLinesTransport<W> {
    fn name(&self) -> &str {
        "stdio"
    }

    async fn send(&self, channel_id: &str, text: &str) -> Result<String, ChannelError> {
        self.emit(&OutboundAction::Send {
            channel: channel_id,
            text,
        })
        .await?;
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn delete(&self, channel_id: &str, message_id: &str) -> Result<(), ChannelError> {
        self.emit(&OutboundAction::Delete {
            channel: channel_id,
            message: message_id,
        })
        .await
    }
}
