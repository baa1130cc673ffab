//! Defines the error types for fact binding.
use thiserror::Error;

/// A binding policy that cannot be evaluated.
///
/// Raised before any fact is examined; no partial bindings exist on error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Alignment modes {first} and {second} are mutually exclusive")]
    ConflictingAlignment { first: &'static str, second: &'static str },
    #[error("An explicit alignment must name at least one axis")]
    EmptyAlignment,
}
