//! Channel and peer registries
//!
//! Static descriptions of the channels and peer bots the agent can talk
//! about. Keyed by platform id; entries carry their description line inline
//! under `desc`.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::lines::LineEntry;

/// A described channel
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Display position, lower sorts first
    #[serde(default)]
    pub position: i64,
    /// Owning server; `None` matches any server
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub desc: LineEntry,
}

impl ChannelInfo {
    /// Id, name and aliases, the strings a token can fuzzily refer to
    pub fn names<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> {
        std::iter::once(id)
            .chain((!self.name.is_empty()).then_some(self.name.as_str()))
            .chain(self.aliases.iter().map(String::as_str))
    }

    pub fn on_server(&self, server: Option<&str>) -> bool {
        match &self.server {
            Some(owner) => server == Some(owner.as_str()),
            None => true,
        }
    }
}

/// A described peer bot
#[derive(Debug, Clone, Deserialize)]
pub struct PeerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nicknames: Vec<String>,
    /// Command prefixes the peer answers to
    #[serde(default, rename = "prefix", alias = "prefixes")]
    pub prefixes: Vec<String>,
    /// Whether this agent hosts the peer
    #[serde(default)]
    pub hosted: bool,
    #[serde(default)]
    pub desc: LineEntry,
}

impl PeerInfo {
    pub fn names<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> {
        std::iter::once(id)
            .chain((!self.name.is_empty()).then_some(self.name.as_str()))
            .chain(self.nicknames.iter().map(String::as_str))
    }
}

/// Channel id -> info
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ChannelRegistry {
    entries: BTreeMap<String, ChannelInfo>,
}

/// Peer id -> info
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct PeerRegistry {
    entries: BTreeMap<String, PeerInfo>,
}

macro_rules! registry_impl {
    ($registry:ty, $info:ty) => {
        impl $registry {
            pub fn new(entries: impl IntoIterator<Item = (String, $info)>) -> Self {
                Self {
                    entries: entries.into_iter().collect(),
                }
            }

            pub fn get(&self, id: &str) -> Option<&$info> {
                self.entries.get(id)
            }

            pub fn contains(&self, id: &str) -> bool {
                self.entries.contains_key(id)
            }

            /// Entries in id order
            pub fn iter(&self) -> impl Iterator<Item = (&str, &$info)> {
                self.entries.iter().map(|(id, info)| (id.as_str(), info))
            }

            pub fn len(&self) -> usize {
                self.entries.len()
            }

            pub fn is_empty(&self) -> bool {
                self.entries.is_empty()
            }
        }
    };
}

registry_impl!(ChannelRegistry, ChannelInfo);
registry_impl!(PeerRegistry, PeerInfo);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_registry() {
        let registry: ChannelRegistry = serde_json::from_str(
            r#"{
                "100": {"name": "general", "aliases": ["main"], "position": 2, "server": "s1", "desc": "Chat here."},
                "200": {"desc": [{"s": "Rules.", "w": 1}]}
            }"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        let general = registry.get("100").unwrap();
        assert_eq!(general.names("100").collect::<Vec<_>>(), ["100", "general", "main"]);
        assert!(general.on_server(Some("s1")));
        assert!(!general.on_server(Some("s2")));
        assert!(!general.on_server(None));
        assert!(registry.get("200").unwrap().on_server(Some("anything")));
    }

    #[test]
    fn test_parse_peer_registry() {
        let registry: PeerRegistry = serde_json::from_str(
            r#"{"7": {"name": "Wheatley", "nicknames": ["moron"], "prefix": ["!", "?"], "hosted": true, "desc": "A core."}}"#,
        )
        .unwrap();

        let peer = registry.get("7").unwrap();
        assert_eq!(peer.prefixes, ["!", "?"]);
        assert!(peer.hosted);
        assert_eq!(peer.desc, LineEntry::plain("A core."));
        assert_eq!(peer.names("7").count(), 3);
    }
}
