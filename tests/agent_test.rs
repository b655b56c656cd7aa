//! Agent Integration Tests
//!
//! Drives whole messages through disruption, gate and dispatch against a
//! recording transport.

use async_trait::async_trait;
use chatgate::channels::{
    ChannelError, ChannelRef, GatewayEvent, IncomingMessage, JsonLinesEvents, Permission, ServerRef,
    Transport, UserRef,
};
use chatgate::{
    Agent, AgentIdentity, AgentSettings, Content, LineBank, Lexicon, ScriptedRandom,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Send { channel: String, text: String },
    Delete { channel: String, message: String },
}

#[derive(Default)]
struct RecordingTransport {
    actions: Mutex<Vec<Action>>,
    delete_times: Mutex<Vec<tokio::time::Instant>>,
    fail_sends: bool,
    /// Text whose delivery is held back before it is recorded
    slow_text: Option<&'static str>,
}

impl RecordingTransport {
    fn sent(&self) -> Vec<String> {
        self.actions
            .lock()
            .iter()
            .filter_map(|a| match a {
                Action::Send { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn deleted(&self) -> Vec<String> {
        self.actions
            .lock()
            .iter()
            .filter_map(|a| match a {
                Action::Delete { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, channel_id: &str, text: &str) -> Result<String, ChannelError> {
        if self.fail_sends {
            return Err(ChannelError::SendFailed("offline".to_string()));
        }
        if self.slow_text == Some(text) {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        self.actions.lock().push(Action::Send {
            channel: channel_id.to_string(),
            text: text.to_string(),
        });
        Ok("sent".to_string())
    }

    async fn delete(&self, channel_id: &str, message_id: &str) -> Result<(), ChannelError> {
        self.delete_times.lock().push(tokio::time::Instant::now());
        self.actions.lock().push(Action::Delete {
            channel: channel_id.to_string(),
            message: message_id.to_string(),
        });
        Ok(())
    }
}

fn content() -> Content {
    Content {
        lexicon: Lexicon::from_pairs([
            ("name", &["glados"][..]),
            ("greeting", &["hello"][..]),
            ("help", &["help"][..]),
            ("tell", &["tell"][..]),
            ("neurotoxin", &["neurotoxin"][..]),
            ("stop", &["stop"][..]),
        ]),
        lines: LineBank::from_plain([
            ("greeting", "Oh. It's you, {user}."),
            ("unknown", "I have no idea what {user} means."),
            ("neurotoxin", "Neurotoxin released."),
            ("neurotoxin-disabled", "Neurotoxin vented."),
            ("welcome", "Welcome {user_mention} to {server}."),
            ("about-self", "I am {client}."),
            ("about-welcome", "Enjoy the tests."),
        ]),
        ..Content::default()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn agent_with(transport: Arc<RecordingTransport>, content: Content) -> Agent {
    agent_with_rng(transport, content, ScriptedRandom::first(), 1)
}

fn agent_with_rng(
    transport: Arc<RecordingTransport>,
    content: Content,
    rng: ScriptedRandom,
    delete_unit_ms: u64,
) -> Agent {
    let settings = AgentSettings {
        delete_delay_unit: std::time::Duration::from_millis(delete_unit_ms),
        ..AgentSettings::default()
    };
    Agent::new(
        AgentIdentity::new("agent", "GLaDOS"),
        Arc::new(content),
        transport,
        Arc::new(rng),
        settings,
    )
}

fn agent(transport: Arc<RecordingTransport>) -> Agent {
    agent_with(transport, content())
}

fn message(id: &str, content: &str, at: DateTime<Utc>) -> IncomingMessage {
    let mut msg = IncomingMessage::text(
        UserRef::new("chell", "Chell"),
        ChannelRef::new("c1", "test-chamber"),
        content,
    )
    .with_server(ServerRef::new("s1", "Aperture"))
    .with_timestamp(at);
    msg.id = id.to_string();
    msg
}

#[tokio::test]
async fn test_greeting_by_name_opens_engagement() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());

    agent
        .handle_message(&message("m1", "hello glados", t0()))
        .await
        .unwrap();
    agent.flush().await;

    assert_eq!(transport.sent(), vec!["Oh. It's you, Chell."]);
    assert!(agent.gate().is_allowed("c1", "chell", t0()));
    assert_eq!(agent.gate().last_interaction("c1", "chell"), Some(t0()));
}

#[tokio::test]
async fn test_unengaged_user_is_ignored() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());

    agent
        .handle_message(&message("m1", "hello everybody", t0()))
        .await
        .unwrap();
    agent.flush().await;

    assert!(transport.sent().is_empty());
    assert!(agent.gate().last_interaction("c1", "chell").is_none());
}

#[tokio::test]
async fn test_short_unknown_message_gets_no_reply() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());
    agent.gate().record_allow("c1", "chell", t0());

    let msg = message("m1", "ok then", t0() + Duration::seconds(10));
    assert_eq!(msg.content.chars().count(), 7);
    agent.handle_message(&msg).await.unwrap();
    agent.flush().await;

    assert!(transport.sent().is_empty());
    // engagement is still refreshed
    assert!(agent.gate().is_allowed("c1", "chell", t0() + Duration::seconds(125)));
}

#[tokio::test]
async fn test_longer_unknown_message_gets_unknown_line() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());
    agent.gate().record_allow("c1", "chell", t0());

    agent
        .handle_message(&message("m1", "the cake is a lie", t0() + Duration::seconds(10)))
        .await
        .unwrap();
    agent.flush().await;

    assert_eq!(transport.sent(), vec!["I have no idea what Chell means."]);
}

#[tokio::test]
async fn test_stop_ends_engagement_silently() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());
    agent.gate().record_allow("c1", "chell", t0());

    agent
        .handle_message(&message("m1", "please stop", t0() + Duration::seconds(5)))
        .await
        .unwrap();
    agent.flush().await;

    assert!(transport.sent().is_empty());
    assert!(agent.gate().last_interaction("c1", "chell").is_none());
}

#[tokio::test]
async fn test_bot_authors_are_ignored() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());

    let mut msg = message("m1", "hello glados", t0());
    msg.author = UserRef::bot("turret", "Turret");
    agent.handle_message(&msg).await.unwrap();
    agent.flush().await;

    assert!(transport.sent().is_empty());
    assert!(agent.gate().last_interaction("c1", "turret").is_none());
}

#[tokio::test]
async fn test_disruption_lifecycle() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());

    // moderator triggers disruption
    let trigger = message("m1", "glados release the neurotoxin", t0())
        .with_permissions(vec![Permission::ManageMessages]);
    agent.handle_message(&trigger).await.unwrap();
    agent.flush().await;
    assert_eq!(transport.sent(), vec!["Neurotoxin released."]);
    assert_eq!(agent.disruption().until("c1"), Some(t0() + Duration::seconds(180)));

    // messages during the window are deleted and otherwise ignored
    let during = message("m2", "hello glados", t0() + Duration::seconds(100));
    agent.handle_message(&during).await.unwrap();
    agent.flush().await;
    assert_eq!(transport.deleted(), vec!["m2"]);
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(agent.gate().last_interaction("c1", "chell"), Some(t0()));

    // first message after the window ends it and is processed normally
    let after = message("m3", "hello glados", t0() + Duration::seconds(181));
    agent.handle_message(&after).await.unwrap();
    agent.flush().await;
    assert_eq!(
        transport.sent(),
        vec!["Neurotoxin released.", "Neurotoxin vented.", "Oh. It's you, Chell."]
    );
    assert!(agent.disruption().until("c1").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disruption_end_notice_precedes_reply() {
    let transport = Arc::new(RecordingTransport {
        slow_text: Some("Neurotoxin vented."),
        ..RecordingTransport::default()
    });
    let agent = agent(transport.clone());
    agent.disruption().activate("c1", t0());

    let after = message("m1", "hello glados", t0() + Duration::seconds(181));
    agent.handle_message(&after).await.unwrap();
    agent.flush().await;

    assert_eq!(
        transport.sent(),
        vec!["Neurotoxin vented.", "Oh. It's you, Chell."]
    );
}

#[tokio::test]
async fn test_end_notice_survives_reply_format_error() {
    let transport = Arc::new(RecordingTransport::default());
    let mut content = content();
    content
        .lines
        .insert("greeting", chatgate::LineEntry::plain("Hi {nickname}"));
    let agent = agent_with(transport.clone(), content);
    agent.disruption().activate("c1", t0());

    let result = agent
        .handle_message(&message("m1", "hello glados", t0() + Duration::seconds(181)))
        .await;
    agent.flush().await;

    assert!(matches!(result, Err(chatgate::AgentError::Format(_))));
    assert_eq!(transport.sent(), vec!["Neurotoxin vented."]);
}

#[tokio::test(start_paused = true)]
async fn test_delete_delay_is_clamped_to_five_units() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent_with_rng(transport.clone(), content(), ScriptedRandom::new([9]), 10);
    agent.disruption().activate("c1", t0());

    let started = tokio::time::Instant::now();
    agent
        .handle_message(&message("m1", "hello glados", t0() + Duration::seconds(30)))
        .await
        .unwrap();
    agent.flush().await;

    assert_eq!(transport.deleted(), vec!["m1"]);
    let waited = transport.delete_times.lock()[0] - started;
    assert!(waited >= std::time::Duration::from_millis(50), "{:?}", waited);
    assert!(waited < std::time::Duration::from_millis(60), "{:?}", waited);
}

#[tokio::test(start_paused = true)]
async fn test_delete_delay_is_at_least_one_unit() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent_with_rng(transport.clone(), content(), ScriptedRandom::first(), 10);
    agent.disruption().activate("c1", t0());

    let started = tokio::time::Instant::now();
    agent
        .handle_message(&message("m1", "anything", t0() + Duration::seconds(30)))
        .await
        .unwrap();
    agent.flush().await;

    let waited = transport.delete_times.lock()[0] - started;
    assert!(waited >= std::time::Duration::from_millis(10), "{:?}", waited);
    assert!(waited < std::time::Duration::from_millis(20), "{:?}", waited);
}

#[tokio::test]
async fn test_disruption_needs_permission() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());

    let trigger = message("m1", "glados release the neurotoxin", t0());
    agent.handle_message(&trigger).await.unwrap();
    agent.flush().await;

    assert!(agent.disruption().until("c1").is_none());
    // falls through to being addressed by name
    assert_eq!(transport.sent(), vec!["Oh. It's you, Chell."]);
}

#[tokio::test]
async fn test_format_error_surfaces_and_sends_nothing() {
    let transport = Arc::new(RecordingTransport::default());
    let mut content = content();
    content
        .lines
        .insert("greeting", chatgate::LineEntry::plain("Hi {nickname}"));
    let agent = agent_with(transport.clone(), content);

    let result = agent
        .handle_message(&message("m1", "hello glados", t0()))
        .await;
    agent.flush().await;

    assert!(matches!(result, Err(chatgate::AgentError::Format(_))));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_send_failures_are_not_fatal() {
    let transport = Arc::new(RecordingTransport {
        fail_sends: true,
        ..RecordingTransport::default()
    });
    let agent = agent(transport.clone());

    agent
        .handle_message(&message("m1", "hello glados", t0()))
        .await
        .unwrap();
    agent.flush().await;

    assert!(transport.sent().is_empty());
    assert!(agent.gate().is_allowed("c1", "chell", t0()));
}

#[tokio::test]
async fn test_run_consumes_json_event_stream() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());

    let input = concat!(
        r#"{"type":"ready","user":{"id":"agent","name":"GLaDOS","bot":true}}"#,
        "\n",
        r#"{"type":"member_joined","member":{"id":"5","name":"wheatley"},"server":{"id":"s1","name":"Aperture","default_channel":{"id":"lobby","name":"lobby"}},"created_at":"2020-01-01T00:00:00Z","joined_at":"2020-01-01T00:00:00Z"}"#,
        "\n",
        r#"{"type":"message_received","id":"m1","author":{"id":"chell","name":"Chell"},"channel":{"id":"c1","name":"test-chamber"},"content":"hello glados","timestamp":"2024-01-01T12:00:00Z"}"#,
        "\n"
    );
    let mut events = JsonLinesEvents::new(input.as_bytes());
    agent.run(&mut events).await.unwrap();

    let actions = transport.actions.lock().clone();
    assert_eq!(
        actions,
        vec![
            Action::Send {
                channel: "lobby".into(),
                text: "Welcome <@5> to Aperture.\nI am GLaDOS.\nEnjoy the tests.".into(),
            },
            Action::Send {
                channel: "c1".into(),
                text: "Oh. It's you, Chell.".into(),
            },
        ]
    );
}

#[tokio::test]
async fn test_handle_event_dispatches_messages() {
    let transport = Arc::new(RecordingTransport::default());
    let agent = agent(transport.clone());

    agent
        .handle_event(GatewayEvent::MessageReceived(message("m1", "glados", t0())))
        .await
        .unwrap();
    agent.flush().await;

    assert_eq!(transport.sent(), vec!["Oh. It's you, Chell."]);
}
