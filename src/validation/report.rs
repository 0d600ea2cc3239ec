//! Error report produced by a validation run
//!
//! One entry per field path at most: the first rule to flag a path wins and
//! later entries for the same path are dropped.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Rule family that produced an error entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Unconditional, context or conditional absence
    #[serde(rename = "required")]
    Required,
    /// Policy-gated absence
    #[serde(rename = "policy")]
    Policy,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "phone")]
    Phone,
    #[serde(rename = "trigram")]
    Trigram,
    #[serde(rename = "oneOf")]
    OneOf,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "int")]
    Int,
    /// Value already used by another record
    #[serde(rename = "unique")]
    Unique,
}

impl ErrorKind {
    /// Returns the wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Required => "required",
            ErrorKind::Policy => "policy",
            ErrorKind::Email => "email",
            ErrorKind::Phone => "phone",
            ErrorKind::Trigram => "trigram",
            ErrorKind::OneOf => "oneOf",
            ErrorKind::Date => "date",
            ErrorKind::Time => "time",
            ErrorKind::Int => "int",
            ErrorKind::Unique => "unique",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single violation on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Dotted field path
    pub key: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    /// Policy that demanded the field, for `policy` entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

impl ErrorEntry {
    pub fn new(key: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            message: message.into(),
            policy: None,
        }
    }

    /// Entry for a field required because of how the document was created
    pub fn required_via(path: &str, created_via: &str) -> Self {
        Self::new(
            path,
            ErrorKind::Required,
            format!("{} is required because created via {}, but not set", path, created_via),
        )
    }

    /// Entry for a field required by a firing condition
    pub fn required_if(target: &str, operand: &str, value: &str) -> Self {
        Self::new(
            target,
            ErrorKind::Required,
            format!("{} is required because {} is {}, but not set", target, operand, value),
        )
    }

    /// Entry for a field required by an active policy
    pub fn required_by_policy(path: &str, policy: &str) -> Self {
        Self {
            policy: Some(policy.to_string()),
            ..Self::new(
                path,
                ErrorKind::Policy,
                format!("{} is required by policy {}, but not set", path, policy),
            )
        }
    }

    /// Entry for a value already used by another record
    pub fn duplicate(path: &str, value: &str) -> Self {
        Self::new(
            path,
            ErrorKind::Unique,
            format!("{} must be unique. {} is already used.", path, value),
        )
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Mapping from field path to at most one error entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorReport {
    entries: BTreeMap<String, ErrorEntry>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entry` unless its path already carries an error.
    ///
    /// Returns true if the entry was recorded.
    pub fn insert(&mut self, entry: ErrorEntry) -> bool {
        match self.entries.entry(entry.key.clone()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Merges `other` into this report; existing entries are kept.
    pub fn merge(&mut self, other: ErrorReport) {
        for (_, entry) in other.entries {
            self.insert(entry);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&ErrorEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order
    pub fn iter(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.values()
    }
}

impl IntoIterator for ErrorReport {
    type Item = ErrorEntry;
    type IntoIter = btree_map::IntoValues<String, ErrorEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

/// A defect in a model descriptor, reported to operators.
///
/// Never part of an [`ErrorReport`]: the document is not at fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl ConfigWarning {
    pub fn new(model: impl Into<String>, path: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            path: path.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "model '{}', path '{}': {}", self.model, path, self.message),
            None => write!(f, "model '{}': {}", self.model, self.message),
        }
    }
}

/// What one validation stage found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    pub errors: ErrorReport,
    pub warnings: Vec<ConfigWarning>,
}

impl StageOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a configuration warning for `model`
    pub fn warn(&mut self, model: &str, path: Option<&str>, message: impl Into<String>) {
        self.warnings.push(ConfigWarning::new(model, path, message));
    }
}
