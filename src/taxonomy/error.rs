//! Defines the error types for taxonomy lookups and derived caches.
use crate::facts::ConceptId;
use crate::rules::GroupError;
use thiserror::Error;

/// A descendant walk revisited a concept already on its path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    #[error("Cycle in containment relationships: {}", join(.cycle))]
    Cycle { cycle: Vec<ConceptId> },
}

fn join(cycle: &[ConceptId]) -> String {
    cycle.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
}

/// A malformed catalog document (axis replacements, compatibility classes).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Pattern for {key} does not compile: {reason}")]
    Pattern { key: String, reason: String },
    #[error("{key} must be {expected}")]
    Shape { key: String, expected: &'static str },
    #[error("Catalog is not valid JSON: {0}")]
    Json(String),
    #[error(transparent)]
    Group(#[from] GroupError),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cache file could not be moved into place: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Cache file {} must hold a JSON object", .path.display())]
    NotAnObject { path: std::path::PathBuf },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
