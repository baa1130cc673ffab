//! Lookups against external taxonomy data.
//!
//! Nothing here builds a taxonomy. These helpers answer the few questions the
//! rule engine asks of one: which release of a family is newest, how a
//! namespace abbreviates, which members descend from a domain, which concepts
//! are deprecated, which concepts must not be negative, and whether the DQC
//! rules apply.
pub mod axes;
pub mod cache;
pub mod compat;
pub mod dqc;
pub mod error;
pub mod family;
pub mod graph;
pub mod namespace;
pub mod signs;

pub use axes::AxisReplacementCatalog;
pub use cache::{read_json_cache, sort_keys, write_sorted_json, DeprecationCatalog};
pub use compat::TaxonomyCompatibility;
pub use dqc::{load_dqc_rules, us_gaap_year, TaxonomyUsage};
pub use error::{CacheError, CatalogError, WalkError};
pub use family::{latest_family, FamilyDescriptor, FamilyRegistry};
pub use graph::{
    axis_members, domain_members, is_descendant, member_children, Arcrole, ContainmentGraph, Relationship,
    RelationshipOracle,
};
pub use namespace::{abbreviated_namespace, conflict_class, effective_authority, Abbreviation};
pub use signs::{ExcludedMember, SignWarnings};
