//! Fact records, their binding into aligned groups, and precision reduction.
pub mod binding;
pub mod error;
pub mod precision;
pub mod types;

pub use binding::{
    Binding, BindingKey, BindingPolicy, BindingRequest, Bindings, Containment, FactBindingEngine, FactFilter, GroupKey,
    Slot, SubKey,
};
pub use error::PolicyError;
pub use precision::least_decimals;
pub use types::{
    ConceptId, Decimals, DimensionMember, DimensionalContext, Fact, FactSet, FactValue, Member, Period, Unit,
    ValidationState,
};
