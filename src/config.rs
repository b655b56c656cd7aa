//! Configuration management

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::agent::AgentSettings;
use crate::disruption::DEFAULT_DISRUPTION_SECS;
use crate::gate::DEFAULT_COOLDOWN_SECS;

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding words.json, lines.json, channels.json and bots.json
    pub data_dir: PathBuf,

    /// File holding the platform token
    pub token_path: PathBuf,

    /// Token from the environment, preferred over `token_path`
    pub token: Option<String>,

    /// Platform user id of the agent (learned from the platform when absent)
    pub agent_id: Option<String>,

    /// Name the agent introduces itself with
    pub agent_name: String,

    /// Engagement window in seconds
    pub cooldown_secs: i64,

    /// Disruption length in seconds
    pub disruption_secs: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("CHATGATE_DATA_DIR")
            .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()))
            .unwrap_or_else(|_| default_data_dir());

        let token_path = std::env::var("CHATGATE_TOKEN_FILE")
            .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()))
            .unwrap_or_else(|_| data_dir.join("secret").join("token"));

        let token = std::env::var("DISCORD_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let agent_id = std::env::var("CHATGATE_AGENT_ID").ok();

        let agent_name =
            std::env::var("CHATGATE_AGENT_NAME").unwrap_or_else(|_| "GLaDOS".to_string());

        let cooldown_secs = parse_secs("CHATGATE_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS)?;
        let disruption_secs = parse_secs("CHATGATE_DISRUPTION_SECS", DEFAULT_DISRUPTION_SECS)?;

        Ok(Self {
            data_dir,
            token_path,
            token,
            agent_id,
            agent_name,
            cooldown_secs,
            disruption_secs,
        })
    }

    /// Resolve the platform token, reading the token file when not in the environment
    pub fn load_token(&self) -> Result<String> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        read_token(&self.token_path)
    }

    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            cooldown: chrono::Duration::seconds(self.cooldown_secs),
            disruption: chrono::Duration::seconds(self.disruption_secs),
            ..AgentSettings::default()
        }
    }
}

fn parse_secs(var: &str, default: i64) -> Result<i64> {
    match std::env::var(var) {
        Ok(raw) => {
            let secs: i64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", var))?;
            anyhow::ensure!(secs > 0, "{} must be positive", var);
            Ok(secs)
        }
        Err(_) => Ok(default),
    }
}

fn read_token(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read token file {}", path.display()))?;
    let token = raw.trim().to_string();
    anyhow::ensure!(!token.is_empty(), "token file {} is empty", path.display());
    Ok(token)
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("chatgate"))
        .unwrap_or_else(|| PathBuf::from("data"))
}
