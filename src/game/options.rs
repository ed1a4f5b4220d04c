//! Lobby Options
//!
//! Free-form key/value settings the host attaches to a lobby. Values arrive
//! as text; the literals `"true"` and `"false"` become booleans, everything
//! else stays text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A stored option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Coerced from `"true"` / `"false"`.
    Bool(bool),
    /// Anything else, as provided.
    Text(String),
}

impl OptionValue {
    /// Apply the boolean coercion rule to a raw value.
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            other => Self::Text(other.to_string()),
        }
    }

    /// Get as bool, if this is a coerced boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(_) => None,
        }
    }

    /// Get as text, if this was left uncoerced.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Bool(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(raw: &str) -> Self {
        Self::Text(raw.to_string())
    }
}

/// The options bag of a lobby.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyOptions(BTreeMap<String, OptionValue>);

impl LobbyOptions {
    /// Create an empty options bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge raw options in, coercing booleans.
    pub fn merge_raw(&mut self, raw: &BTreeMap<String, String>) {
        for (key, value) in raw {
            self.0.insert(key.clone(), OptionValue::coerce(value));
        }
    }

    /// Wrap raw options without any coercion (used when echoing input back).
    pub fn uncoerced(raw: &BTreeMap<String, String>) -> Self {
        Self(
            raw.iter()
                .map(|(k, v)| (k.clone(), OptionValue::from(v.as_str())))
                .collect(),
        )
    }

    /// Look up a stored value.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    /// Boolean option, `false` when absent or not a boolean.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(OptionValue::as_bool).unwrap_or(false)
    }

    /// Integer option parsed from text.
    pub fn integer(&self, key: &str) -> Option<u32> {
        self.get(key)?.as_text()?.trim().parse().ok()
    }

    /// Number of stored options.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no options are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    /// Remove an option, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.0.remove(key)
    }
}
