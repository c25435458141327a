//! Input contract types: component instances and design goals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of a candidate netlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInstance {
    pub id: String,
    #[serde(alias = "blockType")]
    pub block_type: String,
    /// Terminal name -> net name. Terminals missing from the block's spec are
    /// tolerated; instances may be partially wired.
    pub connections: BTreeMap<String, String>,
}

impl ComponentInstance {
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            connections: BTreeMap::new(),
        }
    }

    pub fn connect(mut self, terminal: impl Into<String>, net: impl Into<String>) -> Self {
        self.connections.insert(terminal.into(), net.into());
        self
    }

    pub fn net_of(&self, terminal: &str) -> Option<&str> {
        self.connections.get(terminal).map(String::as_str)
    }
}

/// Desired input topology expressed by the `inputType` goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTopology {
    Differential,
    SingleEnded,
}

impl InputTopology {
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "differential" | "diff" | "diffpair" => Some(InputTopology::Differential),
            "singleended" | "single" => Some(InputTopology::SingleEnded),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InputTopology::Differential => "differential input",
            InputTopology::SingleEnded => "single-ended input",
        }
    }
}

/// Caller-supplied design goals. Absent or empty goals leave goal-aware
/// rules inert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Goals {
    entries: BTreeMap<String, String>,
}

impl Goals {
    pub const INPUT_TYPE: &'static str = "inputType";
    const INPUT_TYPE_ALIAS: &'static str = "input_type";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The requested input topology, if the goals constrain it.
    pub fn input_type(&self) -> Option<InputTopology> {
        self.get(Self::INPUT_TYPE)
            .or_else(|| self.get(Self::INPUT_TYPE_ALIAS))
            .and_then(InputTopology::parse)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Goals {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut goals = Goals::new();
        for (k, v) in iter {
            goals.insert(k, v);
        }
        goals
    }
}
