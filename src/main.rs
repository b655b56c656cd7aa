//! Chatgate - Entry Point
//!
//! Modes:
//! - Default: JSON-lines events on stdin, JSON-lines actions on stdout
//! - --discord / -d: JSON-lines events on stdin, Discord REST outbound
//! - --check / -c: load and validate content, then exit

use anyhow::Context;
use chatgate::channels::{DiscordChannel, DiscordConfig, JsonLinesEvents, JsonLinesTransport, Transport};
use chatgate::{Agent, AgentIdentity, Config, Content, ThreadRandom};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let discord_mode = args.iter().any(|a| a == "--discord" || a == "-d");
    let check_mode = args.iter().any(|a| a == "--check" || a == "-c");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");

    if help_mode {
        println!("Chatgate v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: chatgate [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --discord, -d   Send replies through the Discord REST API");
        println!("  --check, -c     Validate content files and exit");
        println!("  --help, -h      Show this help");
        println!();
        println!("Default: read events from stdin, write actions to stdout");
        println!();
        println!("Environment variables:");
        println!("  CHATGATE_DATA_DIR          Content directory (words/lines/channels/bots.json)");
        println!("  CHATGATE_TOKEN_FILE        Token file (default: <data>/secret/token)");
        println!("  DISCORD_BOT_TOKEN          Discord bot token (overrides token file)");
        println!("  CHATGATE_AGENT_ID          Platform user id of the agent");
        println!("  CHATGATE_AGENT_NAME        Name the agent introduces itself with");
        println!("  CHATGATE_COOLDOWN_SECS     Engagement window (default: 120)");
        println!("  CHATGATE_DISRUPTION_SECS   Disruption length (default: 180)");
        return Ok(());
    }

    // Setup logging based on mode
    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if discord_mode || check_mode {
        // stdout is free - log to it with colors
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(env_filter())
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        // stdout carries actions - log to stderr as JSON
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let config = Config::from_env()?;

    // Content is fatal when malformed - fail before accepting events
    let content = Content::load(&config.data_dir)
        .with_context(|| format!("loading content from {}", config.data_dir.display()))?;

    if check_mode {
        info!("Content OK");
        return Ok(());
    }

    let (transport, agent_id): (Arc<dyn Transport>, String) = if discord_mode {
        info!("Chatgate Discord agent v{}", env!("CARGO_PKG_VERSION"));
        let discord = DiscordChannel::new(DiscordConfig::new(config.load_token()?));
        let me = discord.connect().await?;
        let agent_id = config.agent_id.clone().unwrap_or(me.id);
        (Arc::new(discord), agent_id)
    } else {
        info!("Chatgate stdio agent v{}", env!("CARGO_PKG_VERSION"));
        let agent_id = config
            .agent_id
            .clone()
            .context("CHATGATE_AGENT_ID is required in stdio mode")?;
        (Arc::new(JsonLinesTransport::stdout()), agent_id)
    };

    let agent = Agent::new(
        AgentIdentity::new(agent_id, config.agent_name.clone()),
        Arc::new(content),
        transport,
        Arc::new(ThreadRandom),
        config.agent_settings(),
    );

    let mut events = JsonLinesEvents::stdin();
    agent.run(&mut events).await?;

    Ok(())
}
