//! Component library data model.
//!
//! A library maps a block-type name to its [`ComponentSpec`]: the device kind,
//! the functional roles the block can fill and the kind of every terminal.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Role tags used by the built-in rule set.
pub mod roles {
    pub const GAIN_STAGE: &str = "GAIN_STAGE";
    pub const LOAD_ACTIVE: &str = "LOAD_ACTIVE";
    pub const BIAS_SOURCE: &str = "BIAS_SOURCE";
    pub const DIFFERENTIAL_INPUT: &str = "DIFFERENTIAL_INPUT";
    pub const SINGLE_ENDED_INPUT: &str = "SINGLE_ENDED_INPUT";
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Component library is empty")]
    Empty,
    #[error("Block type '{block_type}' uses unregistered role '{role}'")]
    UnknownRole { block_type: String, role: String },
    #[error("Block type '{block_type}' declares no terminals")]
    NoTerminals { block_type: String },
    #[error("Failed to parse library JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Device kind of a block. Compared by equality only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    Nmos,
    Pmos,
    Npn,
    Pnp,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceType::Nmos => "NMOS",
            DeviceType::Pmos => "PMOS",
            DeviceType::Npn => "NPN",
            DeviceType::Pnp => "PNP",
        };
        f.write_str(s)
    }
}

/// Functional category of a single terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalKind {
    VInput,
    IInput,
    IOutput,
    Power,
}

impl std::fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerminalKind::VInput => "V_INPUT",
            TerminalKind::IInput => "I_INPUT",
            TerminalKind::IOutput => "I_OUTPUT",
            TerminalKind::Power => "POWER",
        };
        f.write_str(s)
    }
}

/// Library entry for one block type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(default)]
    pub description: String,
    #[serde(alias = "deviceType")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    pub terminals: BTreeMap<String, TerminalKind>,
}

impl ComponentSpec {
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            description: String::new(),
            device_type,
            roles: BTreeSet::new(),
            terminals: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_terminal(mut self, name: impl Into<String>, kind: TerminalKind) -> Self {
        self.terminals.insert(name.into(), kind);
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn terminal_kind(&self, terminal: &str) -> Option<TerminalKind> {
        self.terminals.get(terminal).copied()
    }

    /// Terminal names of the given kind, in name order.
    pub fn terminals_of_kind(&self, kind: TerminalKind) -> impl Iterator<Item = &str> {
        self.terminals
            .iter()
            .filter(move |(_, k)| **k == kind)
            .map(|(name, _)| name.as_str())
    }
}

/// Registered role tags. Roles stay open strings so the rule catalog can grow,
/// but a library may only use tags registered here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleVocabulary {
    tags: BTreeSet<String>,
}

impl RoleVocabulary {
    pub fn empty() -> Self {
        Self {
            tags: BTreeSet::new(),
        }
    }

    pub fn register(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with(mut self, tag: impl Into<String>) -> Self {
        self.register(tag);
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

impl Default for RoleVocabulary {
    fn default() -> Self {
        Self::empty()
            .with(roles::GAIN_STAGE)
            .with(roles::LOAD_ACTIVE)
            .with(roles::BIAS_SOURCE)
            .with(roles::DIFFERENTIAL_INPUT)
            .with(roles::SINGLE_ENDED_INPUT)
    }
}

/// Immutable catalog of block types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Library {
    blocks: BTreeMap<String, ComponentSpec>,
}

impl Library {
    /// Build a library, validating every entry against `vocabulary`.
    pub fn new(
        blocks: BTreeMap<String, ComponentSpec>,
        vocabulary: &RoleVocabulary,
    ) -> Result<Self, LibraryError> {
        if blocks.is_empty() {
            return Err(LibraryError::Empty);
        }
        for (block_type, spec) in &blocks {
            if spec.terminals.is_empty() {
                return Err(LibraryError::NoTerminals {
                    block_type: block_type.clone(),
                });
            }
            if let Some(role) = spec.roles.iter().find(|r| !vocabulary.contains(r)) {
                tracing::warn!("Rejecting library entry {}: unknown role {}", block_type, role);
                return Err(LibraryError::UnknownRole {
                    block_type: block_type.clone(),
                    role: role.clone(),
                });
            }
        }
        Ok(Self { blocks })
    }

    /// Parse a JSON object of `block_type -> ComponentSpec`.
    pub fn from_json_str(json: &str, vocabulary: &RoleVocabulary) -> Result<Self, LibraryError> {
        let blocks: BTreeMap<String, ComponentSpec> = serde_json::from_str(json)?;
        Self::new(blocks, vocabulary)
    }

    pub fn get(&self, block_type: &str) -> Option<&ComponentSpec> {
        self.blocks.get(block_type)
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.blocks.contains_key(block_type)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Entries in block-type name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentSpec)> {
        self.blocks.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Block types holding `role`, in name order.
    pub fn block_types_with_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a str> {
        self.iter()
            .filter(move |(_, spec)| spec.has_role(role))
            .map(|(name, _)| name)
    }

    pub fn to_pretty_json(&self) -> Result<String, LibraryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
