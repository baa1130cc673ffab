//! Compilation of the declarative rule specification.
//!
//! The raw specification is a JSON document of heterogeneous entries that
//! reference shared tables (validations, axis validations, messages) and
//! reusable named groups. `compile` checks every entry, resolves every group
//! and pattern, and produces an immutable `RuleSet` for one validation run.
pub mod compiler;
pub mod entry;
pub mod error;
pub mod groups;
pub mod raw;
pub mod value_pattern;

// Re-export key types for convenient access
pub use compiler::{compile, CompileContext, CompileOutcome, ConceptModel};
pub use entry::{
    Citation, CompiledRule, FieldValue, ReferenceCondition, References, RuleKind, RuleSet, SourceMode, WhereClause,
};
pub use error::{EntryLocation, ReferenceKind, RuleError};
pub use groups::{GroupError, GroupResolver, OrderedTokens, TokenSet};
pub use raw::RawSpec;
pub use value_pattern::{ValuePattern, ValuePatternError, ValueRange};
