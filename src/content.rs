//! Static content loading
//!
//! All word lists, lines and registries are read once at startup from a data
//! directory and shared read-only afterwards. Any malformed file aborts the
//! load so the agent never starts on broken content.
//!
//! ```text
//! <data>/words.json     category -> [phrase]
//! <data>/lines.json     line id  -> line entry
//! <data>/channels.json  channel id -> channel info
//! <data>/bots.json      peer id  -> peer info
//! ```

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::lexicon::Lexicon;
use crate::lines::LineBank;
use crate::registry::{ChannelRegistry, PeerRegistry};

pub const WORDS_FILE: &str = "words.json";
pub const LINES_FILE: &str = "lines.json";
pub const CHANNELS_FILE: &str = "channels.json";
pub const PEERS_FILE: &str = "bots.json";

/// Content loading failure
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed content in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the agent reads but never mutates
#[derive(Debug, Clone, Default)]
pub struct Content {
    pub lexicon: Lexicon,
    pub lines: LineBank,
    pub channels: ChannelRegistry,
    pub peers: PeerRegistry,
}

impl Content {
    /// Load all content files from `dir`
    pub fn load(dir: &Path) -> Result<Self, ContentError> {
        let content = Self {
            lexicon: read_json(&dir.join(WORDS_FILE))?,
            lines: read_json(&dir.join(LINES_FILE))?,
            channels: read_json(&dir.join(CHANNELS_FILE))?,
            peers: read_json(&dir.join(PEERS_FILE))?,
        };

        info!(
            dir = %dir.display(),
            categories = content.lexicon.len(),
            lines = content.lines.len(),
            channels = content.channels.len(),
            peers = content.peers.len(),
            "Content loaded"
        );
        Ok(content)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ContentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_all(dir: &Path, words: &str, lines: &str, channels: &str, peers: &str) {
        std::fs::write(dir.join(WORDS_FILE), words).unwrap();
        std::fs::write(dir.join(LINES_FILE), lines).unwrap();
        std::fs::write(dir.join(CHANNELS_FILE), channels).unwrap();
        std::fs::write(dir.join(PEERS_FILE), peers).unwrap();
    }

    #[test]
    fn test_load_valid_content() {
        let temp = TempDir::new().unwrap();
        write_all(
            temp.path(),
            r#"{"greeting": ["hello", "good morning"]}"#,
            r#"{"greeting": "Hello {user}."}"#,
            r#"{"1": {"name": "general", "desc": "Talk."}}"#,
            r#"{"2": {"name": "bot", "prefix": ["!"], "desc": "Beeps."}}"#,
        );

        let content = Content::load(temp.path()).unwrap();
        assert_eq!(content.lexicon.phrases("greeting").len(), 2);
        assert!(content.lines.get("greeting").is_some());
        assert!(content.channels.contains("1"));
        assert!(content.peers.contains("2"));
    }

    #[test]
    fn test_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let err = Content::load(temp.path()).unwrap_err();
        assert!(matches!(err, ContentError::Io { .. }));
    }

    #[test]
    fn test_malformed_lines_fail_fast() {
        let temp = TempDir::new().unwrap();
        write_all(
            temp.path(),
            "{}",
            r#"{"pool": [{"s": "zero", "w": 0}]}"#,
            "{}",
            "{}",
        );

        let err = Content::load(temp.path()).unwrap_err();
        match err {
            ContentError::Parse { path, .. } => assert!(path.ends_with(LINES_FILE)),
            other => panic!("unexpected error: {}", other),
        }
    }
}
