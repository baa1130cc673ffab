//! Defines the error types for rule compilation.
use super::groups::GroupError;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// The global table a reference failed to resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Validation,
    Axis,
    Message,
    Group,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceKind::Validation => "validation",
            ReferenceKind::Axis => "axis",
            ReferenceKind::Message => "message",
            ReferenceKind::Group => "sub-type-class",
        })
    }
}

/// Where in the rule specification an error was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryLocation {
    /// An element of `sub-type-element-validations`, with a compact snapshot.
    Entry { position: usize, snapshot: String },
    AxisValidation { key: String },
    Validation { key: String },
}

impl EntryLocation {
    pub(crate) fn entry(position: usize, raw: &Value) -> Self {
        EntryLocation::Entry { position, snapshot: raw.to_string() }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            EntryLocation::Entry { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl fmt::Display for EntryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryLocation::Entry { position, snapshot } => {
                write!(f, "sub-type-element-validations[{}] {}", position, snapshot)
            }
            EntryLocation::AxisValidation { key } => write!(f, "axis-validations[\"{}\"]", key),
            EntryLocation::Validation { key } => write!(f, "validations[\"{}\"]", key),
        }
    }
}

/// A structural problem in the rule specification.
///
/// Compilation collects every one of these instead of stopping at the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Missing \"{field}\" from {location}")]
    MissingField { location: EntryLocation, field: String },
    #[error("Invalid format for \"{field}\" in {location}: {detail}")]
    InvalidFormat { location: EntryLocation, field: String, detail: String },
    #[error("Missing {kind}[\"{key}\"] referenced from {location}")]
    UnknownReference { location: EntryLocation, kind: ReferenceKind, key: String },
    #[error("Circular reference to @{name} ({}) in {location}", .cycle.join(" -> "))]
    CircularReference { location: EntryLocation, name: String, cycle: Vec<String> },
    #[error("\"{field}\" in {location} must be {expected}")]
    TypeMismatch { location: EntryLocation, field: String, expected: &'static str },
}

impl RuleError {
    pub fn location(&self) -> &EntryLocation {
        match self {
            RuleError::MissingField { location, .. }
            | RuleError::InvalidFormat { location, .. }
            | RuleError::UnknownReference { location, .. }
            | RuleError::CircularReference { location, .. }
            | RuleError::TypeMismatch { location, .. } => location,
        }
    }

    pub(crate) fn from_group(location: EntryLocation, field: &str, err: GroupError) -> Self {
        match err {
            GroupError::Unknown { name } => RuleError::UnknownReference {
                location,
                kind: ReferenceKind::Group,
                key: name,
            },
            GroupError::Circular { name, cycle } => RuleError::CircularReference { location, name, cycle },
            GroupError::NotASequence { .. } | GroupError::NotALeaf { .. } => RuleError::TypeMismatch {
                location,
                field: field.to_string(),
                expected: "a list of tokens or group references",
            },
        }
    }
}
