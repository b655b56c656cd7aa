//! Gateway Agent
//!
//! Drives one event at a time through disruption check, interaction gate and
//! intent dispatch. Sends and delayed deletions are spawned in the background
//! and never awaited by the handler; their failures are logged and dropped.

use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::channels::{
    ChannelError, EventSource, GatewayEvent, IncomingMessage, MemberJoined, Permission, Transport,
};
use crate::content::Content;
use crate::dispatcher::{line_ids, AgentIdentity, IntentDispatcher, Response};
use crate::disruption::{DisruptionMode, DisruptionStatus, DEFAULT_DISRUPTION_SECS};
use crate::gate::{InteractionGate, DEFAULT_COOLDOWN_SECS};
use crate::lines::{FormatError, LineRenderer};
use crate::random::RandomSource;
use crate::state::ChannelStore;
use crate::welcome::compose_welcome;

/// Per-event handling failure
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("failed to render reply: {0}")]
    Format(#[from] FormatError),

    #[error("transport error: {0}")]
    Channel(#[from] ChannelError),
}

/// Timing knobs
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Engagement window per user
    pub cooldown: Duration,
    /// Disruption length
    pub disruption: Duration,
    /// One unit of the 1-5 unit delay before deleting a suppressed message
    pub delete_delay_unit: std::time::Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            disruption: Duration::seconds(DEFAULT_DISRUPTION_SECS),
            delete_delay_unit: std::time::Duration::from_secs(1),
        }
    }
}

const DELETE_DELAY_MIN_UNITS: u64 = 1;
const DELETE_DELAY_MAX_UNITS: u64 = 5;

/// Counts background sends/deletes so shutdown can wait for them
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn start(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }

    async fn wait_idle(&self) {
        loop {
            let idle = self.idle.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }
}

struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct Agent {
    renderer: LineRenderer,
    dispatcher: IntentDispatcher,
    content: Arc<Content>,
    gate: InteractionGate,
    disruption: DisruptionMode,
    transport: Arc<dyn Transport>,
    rng: Arc<dyn RandomSource>,
    delete_delay_unit: std::time::Duration,
    in_flight: Arc<InFlight>,
}

impl Agent {
    pub fn new(
        identity: AgentIdentity,
        content: Arc<Content>,
        transport: Arc<dyn Transport>,
        rng: Arc<dyn RandomSource>,
        settings: AgentSettings,
    ) -> Self {
        let store = ChannelStore::new();
        let renderer = LineRenderer::new(Arc::new(content.lines.clone()), rng.clone());
        let dispatcher = IntentDispatcher::new(content.clone(), renderer.clone(), identity);

        Self {
            renderer,
            dispatcher,
            content,
            gate: InteractionGate::new(store.clone(), settings.cooldown),
            disruption: DisruptionMode::new(store, settings.disruption),
            transport,
            rng,
            delete_delay_unit: settings.delete_delay_unit,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn identity(&self) -> &AgentIdentity {
        self.dispatcher.agent()
    }

    pub fn gate(&self) -> &InteractionGate {
        &self.gate
    }

    pub fn disruption(&self) -> &DisruptionMode {
        &self.disruption
    }

    /// Consume events until the source closes. Per-event failures are logged.
    pub async fn run<S: EventSource + ?Sized>(&self, source: &mut S) -> Result<(), ChannelError> {
        info!(
            agent = %self.identity().display_name,
            transport = self.transport.name(),
            "Agent ready, waiting for events..."
        );

        while let Some(event) = source.next_event().await? {
            if let Err(e) = self.handle_event(event).await {
                error!("Event handling failed: {}", e);
            }
        }

        info!("Event stream ended, waiting for pending actions");
        self.flush().await;
        Ok(())
    }

    /// Wait until every spawned send and delete has finished
    pub async fn flush(&self) {
        self.in_flight.wait_idle().await;
    }

    pub async fn handle_event(&self, event: GatewayEvent) -> Result<(), AgentError> {
        match event {
            GatewayEvent::Ready { user } => {
                info!(user = %user.name, id = %user.id, "Logged in");
                if user.id != self.identity().id {
                    warn!(
                        expected = %self.identity().id,
                        actual = %user.id,
                        "Gateway identity differs from configured agent id"
                    );
                }
                Ok(())
            }
            GatewayEvent::MemberJoined(joined) => self.handle_member_joined(&joined).await,
            GatewayEvent::MessageReceived(message) => self.handle_message(&message).await,
        }
    }

    pub async fn handle_member_joined(&self, event: &MemberJoined) -> Result<(), AgentError> {
        let Some(channel) = event.server.default_channel.as_ref() else {
            warn!(server = %event.server.id, "No default channel to welcome {}", event.member.name);
            return Ok(());
        };

        let text = compose_welcome(
            &self.renderer,
            &self.identity().display_name,
            event,
            Utc::now(),
        )?;
        self.spawn_send(&channel.id, vec![text]);
        Ok(())
    }

    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<(), AgentError> {
        if message.author.bot || message.author.id == self.identity().id {
            return Ok(());
        }

        let channel = message.channel.id.as_str();
        let mut outgoing = Vec::new();
        match self.disruption.check(channel, message.timestamp) {
            DisruptionStatus::Inactive => {}
            DisruptionStatus::Ended => {
                outgoing.push(self.renderer.get_line(line_ids::NEUROTOXIN_DISABLED));
            }
            DisruptionStatus::Active { until } => {
                debug!(channel, message_id = %message.id, %until, "Suppressing message");
                self.spawn_delete(message, self.delete_delay());
                return Ok(());
            }
        }

        // the end-of-disruption notice goes out even when rendering the reply fails
        let result = self.engage(message, &mut outgoing).await;
        self.spawn_send(channel, outgoing);
        result
    }

    /// Gate and dispatch `message`, queueing any text for its channel
    async fn engage(
        &self,
        message: &IncomingMessage,
        outgoing: &mut Vec<String>,
    ) -> Result<(), AgentError> {
        if !self
            .gate
            .decide_interaction(message, &self.identity().id, &self.content.lexicon)
        {
            return Ok(());
        }

        let may_manage_messages = self.dispatcher.requests_disruption(message)
            && self.author_may_manage_messages(message).await;
        let intent = self.dispatcher.classify(message, may_manage_messages);

        let channel = message.channel.id.as_str();
        match self.dispatcher.respond(message, intent)? {
            Response::Reply(text) => outgoing.push(text),
            Response::Disrupt { notice } => {
                self.disruption.activate(channel, message.timestamp);
                outgoing.push(notice);
            }
            Response::Block => self.gate.record_block(channel, &message.author.id),
            Response::Silent => {}
        }
        Ok(())
    }

    /// Wait before deleting a suppressed message: 1 to 5 units
    pub fn delete_delay(&self) -> std::time::Duration {
        let units = self
            .rng
            .between(DELETE_DELAY_MIN_UNITS, DELETE_DELAY_MAX_UNITS)
            .clamp(DELETE_DELAY_MIN_UNITS, DELETE_DELAY_MAX_UNITS);
        self.delete_delay_unit * units as u32
    }

    async fn author_may_manage_messages(&self, message: &IncomingMessage) -> bool {
        match self
            .transport
            .author_has_permission(message, Permission::ManageMessages)
            .await
        {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(
                    permission = %Permission::ManageMessages,
                    "Permission check failed for {}: {}", message.author.id, e
                );
                false
            }
        }
    }

    /// Fire-and-forget send of `texts` in order, from one task; empty texts are dropped
    fn spawn_send(&self, channel_id: &str, texts: Vec<String>) {
        let texts: Vec<String> = texts.into_iter().filter(|t| !t.is_empty()).collect();
        if texts.is_empty() {
            return;
        }
        let transport = self.transport.clone();
        let channel_id = channel_id.to_string();
        let guard = self.in_flight.start();
        tokio::spawn(async move {
            let _guard = guard;
            for text in texts {
                if let Err(e) = transport.send(&channel_id, &text).await {
                    warn!("Failed to send to {}: {}", channel_id, e);
                }
            }
        });
    }

    /// Delete `message` after `delay`, even if the handler has returned
    fn spawn_delete(&self, message: &IncomingMessage, delay: std::time::Duration) {
        let transport = self.transport.clone();
        let channel_id = message.channel.id.clone();
        let message_id = message.id.clone();
        let guard = self.in_flight.start();
        tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            if let Err(e) = transport.delete(&channel_id, &message_id).await {
                warn!("Failed to delete {} in {}: {}", message_id, channel_id, e);
            }
        });
    }
}
