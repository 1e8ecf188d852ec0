// ── State tree model ──
//
// Types shared by the parsers, the publisher and the store: declared value
// types, typed values, quality codes and object definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

// ── Values ──────────────────────────────────────────────────────────

/// Declared type of a state object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Number,
    String,
}

/// A typed state value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl StateValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Boolean,
            Self::Number(_) => ValueType::Number,
            Self::Text(_) => ValueType::String,
        }
    }
}

impl std::fmt::Display for StateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Numeric quality annotation written alongside each value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Quality(pub u8);

impl Quality {
    pub const GOOD: Self = Self(0x00);
}

// ── Severity ────────────────────────────────────────────────────────

/// Result code reported by performance checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Ok = 0,
    Warning = 1,
    Error = 2,
    Delayed = 3,
}

impl Severity {
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Error => 2,
            Self::Delayed => 3,
        }
    }

    /// Code → label map attached to severity states.
    pub fn labels() -> BTreeMap<i64, String> {
        Self::iter()
            .map(|s| (i64::from(s.code()), s.to_string()))
            .collect()
    }
}

impl TryFrom<i64> for Severity {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, i64> {
        Self::iter()
            .find(|s| i64::from(s.code()) == value)
            .ok_or(value)
    }
}

// ── Object definitions ──────────────────────────────────────────────

/// Metadata of a state object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateCommon {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub role: String,
    pub read: bool,
    pub write: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<BTreeMap<i64, String>>,
}

impl StateCommon {
    /// Read-only state metadata.
    pub fn read_only(name: impl Into<String>, value_type: ValueType, role: &str) -> Self {
        Self {
            name: name.into(),
            value_type,
            role: role.to_owned(),
            read: true,
            write: false,
            states: None,
        }
    }

    pub fn with_states(mut self, states: BTreeMap<i64, String>) -> Self {
        self.states = Some(states);
        self
    }
}

/// An object as declared in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObjectDef {
    Folder { name: String },
    Device { name: String },
    State(StateCommon),
}

impl ObjectDef {
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::State(common) => Some(common.value_type),
            _ => None,
        }
    }
}

/// A value write: value, acknowledgement flag and quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateWrite {
    pub value: StateValue,
    pub ack: bool,
    pub quality: Quality,
}

// ── Parser output ───────────────────────────────────────────────────

/// A single typed, addressable value ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub id: String,
    pub value: StateValue,
    pub common: StateCommon,
}

/// One node of parser output. Parents always precede their children.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Folder { id: String },
    State(Leaf),
}

impl Entry {
    pub fn id(&self) -> &str {
        match self {
            Self::Folder { id } => id,
            Self::State(leaf) => &leaf.id,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::State(leaf) => Some(leaf),
            Self::Folder { .. } => None,
        }
    }
}
