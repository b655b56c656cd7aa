//! Line Renderer
//!
//! Lines are looked up by id in a [`LineBank`], chosen at random when the
//! entry is a weighted pool, then post-processed:
//!
//! 1. `{a|b|c}` alternation spans are replaced by one random alternative
//! 2. whitespace runs collapse to a single space
//! 3. `<br>` markers become newlines
//!
//! [`LineRenderer::format_line`] additionally fills `{name}` placeholders.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

use crate::random::RandomSource;

/// Placeholder formatting failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("line `{line}` has no value for placeholder `{name}`")]
    MissingField { line: String, name: String },

    #[error("line `{line}` has an unmatched `{brace}` at byte {position}")]
    UnmatchedBrace {
        line: String,
        brace: char,
        position: usize,
    },
}

/// One alternative of a weighted pool
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WeightedLine {
    #[serde(rename = "s", alias = "text")]
    pub text: String,
    #[serde(rename = "w", alias = "weight")]
    pub weight: NonZeroU32,
}

impl WeightedLine {
    pub fn new(text: impl Into<String>, weight: NonZeroU32) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

/// A line bank value, with `{"desc": ...}` wrappers already unwrapped
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLine")]
pub enum LineEntry {
    Plain(String),
    Weighted(Vec<WeightedLine>),
}

impl LineEntry {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }
}

impl Default for LineEntry {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

/// Shapes accepted in the JSON line bank
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLine {
    Text(String),
    Pool(Vec<WeightedLine>),
    Described { desc: Option<Box<RawLine>> },
}

impl TryFrom<RawLine> for LineEntry {
    type Error = String;

    fn try_from(raw: RawLine) -> Result<Self, Self::Error> {
        match raw {
            RawLine::Text(text) => Ok(Self::Plain(text)),
            RawLine::Pool(pool) if pool.is_empty() => {
                Err("weighted line pool must not be empty".to_string())
            }
            RawLine::Pool(pool) => Ok(Self::Weighted(pool)),
            RawLine::Described { desc: None } => Ok(Self::default()),
            RawLine::Described { desc: Some(inner) } => Self::try_from(*inner),
        }
    }
}

/// Line id -> entry, immutable after load
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LineBank {
    lines: HashMap<String, LineEntry>,
}

impl LineBank {
    pub fn new(lines: HashMap<String, LineEntry>) -> Self {
        Self { lines }
    }

    pub fn from_plain<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            lines: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), LineEntry::plain(v)))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: LineEntry) {
        self.lines.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&LineEntry> {
        self.lines.get(key)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Named values for `{name}` placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    values: BTreeMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").expect("valid placeholder regex"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Renders lines from a bank using an injected random source
#[derive(Clone)]
pub struct LineRenderer {
    bank: Arc<LineBank>,
    rng: Arc<dyn RandomSource>,
}

impl LineRenderer {
    pub fn new(bank: Arc<LineBank>, rng: Arc<dyn RandomSource>) -> Self {
        Self { bank, rng }
    }

    /// Render the line stored under `key`; empty when the key is unknown
    pub fn get_line(&self, key: &str) -> String {
        match self.bank.get(key) {
            Some(entry) => self.render(entry),
            None => {
                debug!(key, "line not found");
                String::new()
            }
        }
    }

    /// Render an entry that does not live in the bank (e.g. a registry description)
    pub fn render(&self, entry: &LineEntry) -> String {
        let raw = match entry {
            LineEntry::Plain(text) => text.as_str(),
            LineEntry::Weighted(pool) => self.choose_weighted(pool),
        };
        let text = resolve_alternations(raw, self.rng.as_ref());
        let text = collapse_whitespace(&text);
        text.replace("<br>", "\n")
    }

    /// Render `key` and substitute its placeholders
    pub fn format_line(&self, key: &str, values: &Placeholders) -> Result<String, FormatError> {
        fill_placeholders(key, &self.get_line(key), values)
    }

    /// Each alternative is as likely as its weight relative to the pool total
    fn choose_weighted<'a>(&self, pool: &'a [WeightedLine]) -> &'a str {
        let total: usize = pool.iter().map(|l| l.weight.get() as usize).sum();
        if total == 0 {
            return "";
        }
        let mut ticket = self.rng.pick(total);
        for line in pool {
            let weight = line.weight.get() as usize;
            if ticket < weight {
                return &line.text;
            }
            ticket -= weight;
        }
        pool.last().map(|l| l.text.as_str()).unwrap_or("")
    }
}

/// Replace `{a|b}` spans with one random alternative.
///
/// Scans right to left: takes the last `{` before the cursor and the first
/// `}` after it, substitutes when the span holds a `|`, then continues before
/// that `{`. Nested groups therefore resolve innermost first. Stops at the
/// first `{` with no closing `}` after it.
pub fn resolve_alternations(text: &str, rng: &dyn RandomSource) -> String {
    let mut text = text.to_string();
    let mut cursor = text.len();

    loop {
        let Some(open) = text[..cursor].rfind('{') else {
            return text;
        };
        let Some(close) = text[open..].find('}').map(|i| open + i) else {
            return text;
        };
        let inner = &text[open + 1..close];
        if inner.contains('|') {
            let options: Vec<&str> = inner.split('|').collect();
            let choice = options[rng.pick(options.len())].to_string();
            text.replace_range(open..=close, &choice);
        }
        cursor = open;
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Substitute `{name}` fields; `{{` and `}}` are literal braces
pub fn fill_placeholders(
    line_id: &str,
    text: &str,
    values: &Placeholders,
) -> Result<String, FormatError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        match whole.as_str() {
            "{{" => out.push('{'),
            "}}" => out.push('}'),
            "{" | "}" => {
                return Err(FormatError::UnmatchedBrace {
                    line: line_id.to_string(),
                    brace: whole.as_str().chars().next().unwrap_or('{'),
                    position: whole.start(),
                })
            }
            _ => {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let value = values.get(name).ok_or_else(|| FormatError::MissingField {
                    line: line_id.to_string(),
                    name: name.to_string(),
                })?;
                out.push_str(value);
            }
        }
    }
    out.push_str(&text[last..]);
    Ok(out)
}
