//! Lexicon Matcher
//!
//! Typo-tolerant matching of free text against named trigger categories.
//! A category is a list of words or multi-word phrases; a phrase matches when
//! some window of whitespace tokens is within a small edit distance of it.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::trace;

/// Category names the dispatcher relies on
pub mod categories {
    pub const NAME: &str = "name";
    pub const GREETING: &str = "greeting";
    pub const HELP: &str = "help";
    pub const TELL: &str = "tell";
    pub const QUESTION: &str = "question";
    pub const NEUROTOXIN: &str = "neurotoxin";
    pub const STOP: &str = "stop";
    pub const CHANNEL: &str = "channel";
    pub const BOTS: &str = "bots";
}

/// Named trigger word lists, immutable after load
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Lexicon {
    categories: HashMap<String, Vec<String>>,
}

impl Lexicon {
    pub fn new(categories: HashMap<String, Vec<String>>) -> Self {
        Self { categories }
    }

    /// Build from `(category, phrases)` pairs
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        let categories = pairs
            .into_iter()
            .map(|(name, words)| {
                (
                    name.to_string(),
                    words.iter().map(|w| w.to_string()).collect(),
                )
            })
            .collect();
        Self { categories }
    }

    /// Phrases of a category (empty when unknown)
    pub fn phrases(&self, category: &str) -> &[String] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of phrases of `category` found in `text`
    pub fn count(&self, text: &str, category: &str) -> usize {
        let count = fuzzy_contains(text, self.phrases(category));
        if count > 0 {
            trace!(category, count, "lexicon match");
        }
        count
    }

    /// Whether any phrase of `category` appears in `text`
    pub fn matches(&self, text: &str, category: &str) -> bool {
        self.count(text, category) > 0
    }
}

/// Count the phrases that fuzzily appear in `text`.
///
/// A phrase containing `k` spaces is compared against every run of `k + 1`
/// consecutive whitespace tokens, re-joined with single spaces.
pub fn fuzzy_contains<S: AsRef<str>>(text: &str, phrases: &[S]) -> usize {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    phrases
        .iter()
        .filter(|phrase| contains_phrase(&tokens, phrase.as_ref()))
        .count()
}

fn contains_phrase(tokens: &[&str], phrase: &str) -> bool {
    let width = phrase.matches(' ').count() + 1;
    if tokens.len() < width {
        return false;
    }
    tokens
        .windows(width)
        .any(|window| fuzzy_equal(&window.join(" "), phrase))
}

/// Case-insensitive closeness test tolerating small typos.
///
/// Accepts when the edit distance is at most `(len(a) + len(b)) / 6`, or when
/// swapping a single pair of adjacent characters in `b` brings it within that
/// bound. Lengths are character counts of the text as written, before case
/// folding.
pub fn fuzzy_equal(a: &str, b: &str) -> bool {
    let bound = (a.chars().count() + b.chars().count()) / 6;
    let a: Vec<char> = a.chars().flat_map(char::to_lowercase).collect();
    let mut b: Vec<char> = b.chars().flat_map(char::to_lowercase).collect();

    if edit_distance(&a, &b) <= bound {
        return true;
    }

    for i in 0..b.len().saturating_sub(1) {
        b.swap(i, i + 1);
        let close = edit_distance(&a, &b) <= bound;
        b.swap(i, i + 1);
        if close {
            return true;
        }
    }
    false
}

/// Levenshtein distance over characters
pub fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
