//! Intent detection and entity extraction
//!
//! A small ordered rule table: each rule names its intent, the trigger
//! keywords that select it, and the function that pulls entities out of the
//! text. The first rule whose trigger occurs in the lowercased text wins.
//! Extraction never fails; an entity that cannot be found is simply absent.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// Classified purpose of a user utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Asking for a product's price
    GetProductPrice,
    /// Asking for a network device's status
    CheckDeviceStatus,
    /// Anything else
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::GetProductPrice => "get_product_price",
            Intent::CheckDeviceStatus => "check_device_status",
            Intent::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys of the entity map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKey {
    ProductName,
    /// Either an exact device id (`OLT-BDG-001`) or a bare category token (`OLT`)
    DeviceId,
}

/// Transient key -> value bag extracted from one utterance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entities(BTreeMap<EntityKey, String>);

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: EntityKey, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: EntityKey, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: EntityKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Extractor output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub intent: Intent,
    pub entities: Entities,
}

impl Extraction {
    fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            entities: Entities::new(),
        }
    }
}

/// Device categories usable as partial-match tokens
pub const DEVICE_CATEGORIES: &[&str] = &["OLT", "ROUTER", "SERVER"];

/// Whether a `device_id` entity is a category token rather than a full id
pub fn is_device_category(value: &str) -> bool {
    DEVICE_CATEGORIES.contains(&value)
}

/// Dropped from the end of a captured name; includes the price triggers
/// themselves so "laptopnya harga berapa" does not name a product "Harga"
const FILLER_WORDS: &[&str] = &["berapa", "adalah", "ya", "sih", "dong", "harga", "price"];

/// Longest run of word tokens kept as a product name
const MAX_NAME_TOKENS: usize = 3;

static PRODUCT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // Suffixed forms ("laptopnya", "laptops") still count as the keyword
    Regex::new(r"\b(produk|handphone|laptop|keyboard|headset|hp)[a-z]*((?:\s+[a-z0-9]+){0,3})")
        .expect("product pattern is valid")
});

static DEVICE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-z]+-[a-z]{3}-[0-9]{3}\b").expect("device id pattern is valid")
});

static DEVICE_TYPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(olt|router|server)\b").expect("device type pattern is valid")
});

struct Rule {
    intent: Intent,
    triggers: &'static [&'static str],
    extract: fn(&str) -> Entities,
}

impl Rule {
    fn matches(&self, text: &str) -> bool {
        self.triggers.iter().any(|trigger| text.contains(trigger))
    }
}

const RULES: &[Rule] = &[
    Rule {
        intent: Intent::GetProductPrice,
        triggers: &["harga", "price", "berapa"],
        extract: extract_product,
    },
    Rule {
        intent: Intent::CheckDeviceStatus,
        triggers: &["status", "cek"],
        extract: extract_device,
    },
];

/// Rule-based intent classifier
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentExtractor;

impl IntentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Classify `text` and pull out its entities
    pub fn extract(&self, text: &str) -> Extraction {
        let text = text.to_lowercase();

        RULES
            .iter()
            .find(|rule| rule.matches(&text))
            .map(|rule| Extraction {
                intent: rule.intent,
                entities: (rule.extract)(&text),
            })
            .unwrap_or_else(Extraction::unknown)
    }
}

fn extract_product(text: &str) -> Entities {
    let mut entities = Entities::new();

    if let Some(caps) = PRODUCT_PATTERN.captures(text) {
        let keyword = caps.get(1).map_or("", |m| m.as_str());
        let tail = caps.get(2).map_or("", |m| m.as_str());

        let mut tokens: Vec<&str> = tail.split_whitespace().collect();
        strip_trailing_fillers(&mut tokens);
        if tokens.is_empty() {
            tokens.push(keyword);
        }
        entities.insert(EntityKey::ProductName, title_case(&tokens));
    } else if let Some((_, rest)) = text.split_once("harga") {
        // Best effort: whatever follows "harga"
        let mut tokens: Vec<&str> = rest
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .take(MAX_NAME_TOKENS)
            .collect();
        strip_trailing_fillers(&mut tokens);
        if !tokens.is_empty() {
            entities.insert(EntityKey::ProductName, title_case(&tokens));
        }
    }

    entities
}

fn extract_device(text: &str) -> Entities {
    let mut entities = Entities::new();

    if let Some(m) = DEVICE_ID_PATTERN.find(text) {
        entities.insert(EntityKey::DeviceId, m.as_str().to_uppercase());
    } else if let Some(m) = DEVICE_TYPE_PATTERN.find(text) {
        entities.insert(EntityKey::DeviceId, m.as_str().to_uppercase());
    }

    entities
}

fn strip_trailing_fillers(tokens: &mut Vec<&str>) {
    while tokens.last().is_some_and(|t| FILLER_WORDS.contains(t)) {
        tokens.pop();
    }
}

/// Upper-case every letter that does not follow another letter,
/// so `x1pro` becomes `X1Pro`
fn title_case(words: &[&str]) -> String {
    let mut titled = String::new();
    let mut after_letter = false;
    for ch in words.join(" ").chars() {
        if after_letter {
            titled.extend(ch.to_lowercase());
        } else {
            titled.extend(ch.to_uppercase());
        }
        after_letter = ch.is_alphabetic();
    }
    titled
}
