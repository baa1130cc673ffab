//! Defines the fact records the binding engine consumes.
//!
//! Facts are produced by an external loader and are read-only here. A
//! `FactSet` owns them and keeps a by-local-name index whose per-name order
//! is the insertion order; binding tie-breaks depend on that order.
use chrono::NaiveDate;
use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A namespaced concept (or axis, or member) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConceptId {
    pub namespace: String,
    pub local_name: String,
}

impl ConceptId {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), local_name: local_name.into() }
    }
}

impl fmt::Display for ConceptId {
    /// Clark notation, `{namespace}localName`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Member {
    Explicit(ConceptId),
    /// Canonical text of a typed dimension value.
    Typed(String),
}

impl Member {
    pub fn concept(&self) -> Option<&ConceptId> {
        match self {
            Member::Explicit(c) => Some(c),
            Member::Typed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimensionMember {
    pub axis: ConceptId,
    pub member: Member,
}

impl DimensionMember {
    pub fn explicit(axis: ConceptId, member: ConceptId) -> Self {
        Self { axis, member: Member::Explicit(member) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Instant(NaiveDate),
    Duration { start: NaiveDate, end: NaiveDate },
    Forever,
}

/// A period plus an axis-ordered set of (axis, member) pairs.
///
/// Dimensions are kept sorted by axis with at most one member per axis, so
/// structural equality is independent of declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimensionalContext {
    period: Period,
    dims: SmallVec<[DimensionMember; 4]>,
}

impl DimensionalContext {
    pub fn new(period: Period, dims: impl IntoIterator<Item = DimensionMember>) -> Self {
        let mut dims: SmallVec<[DimensionMember; 4]> = dims.into_iter().collect();
        dims.sort_by(|a, b| a.axis.cmp(&b.axis));
        // Last declaration of an axis wins.
        let mut deduped: SmallVec<[DimensionMember; 4]> = SmallVec::with_capacity(dims.len());
        for dim in dims {
            match deduped.last_mut() {
                Some(last) if last.axis == dim.axis => *last = dim,
                _ => deduped.push(dim),
            }
        }
        Self { period, dims: deduped }
    }

    pub fn period(&self) -> Period { self.period }
    pub fn dims(&self) -> &[DimensionMember] { &self.dims }
    pub fn is_dimensionless(&self) -> bool { self.dims.is_empty() }

    pub fn member(&self, axis: &ConceptId) -> Option<&Member> {
        self.dims
            .binary_search_by(|d| d.axis.cmp(axis))
            .ok()
            .map(|i| &self.dims[i].member)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Unit(pub String);

/// Inferred decimal precision. `Infinite` (an exact value) orders above every finite value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Decimals {
    Finite(i32),
    Infinite,
}

impl fmt::Display for Decimals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decimals::Finite(d) => write!(f, "{}", d),
            Decimals::Infinite => f.write_str("INF"),
        }
    }
}

/// Outcome of lower-level type and format validation, ordered by validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ValidationState {
    Unvalidated,
    Unknown,
    Invalid,
    #[default]
    Valid,
    ValidId,
    ValidNoContent,
}

impl ValidationState {
    pub fn is_valid(self) -> bool { self >= ValidationState::Valid }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FactValue {
    Nil,
    Text(String),
    Number(Decimal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub concept: ConceptId,
    pub value: FactValue,
    /// Facts without a resolvable context never bind.
    pub context: Option<Arc<DimensionalContext>>,
    pub unit: Option<Unit>,
    pub decimals: Decimals,
    pub validation_state: ValidationState,
}

impl Fact {
    pub fn new(concept: ConceptId, value: FactValue) -> Self {
        Self {
            concept,
            value,
            context: None,
            unit: None,
            decimals: Decimals::Infinite,
            validation_state: ValidationState::default(),
        }
    }

    pub fn with_context(mut self, context: Arc<DimensionalContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(Unit(unit.into()));
        self
    }

    pub fn with_decimals(mut self, decimals: Decimals) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_validation_state(mut self, state: ValidationState) -> Self {
        self.validation_state = state;
        self
    }

    pub fn local_name(&self) -> &str { &self.concept.local_name }
    pub fn is_nil(&self) -> bool { matches!(self.value, FactValue::Nil) }
}

/// An immutable-after-load collection of facts indexed by concept local name.
#[derive(Debug, Clone, Default)]
pub struct FactSet {
    facts: Vec<Fact>,
    by_local_name: HashMap<String, Vec<usize>>,
}

impl FactSet {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, fact: Fact) {
        self.by_local_name
            .entry(fact.concept.local_name.clone())
            .or_default()
            .push(self.facts.len());
        self.facts.push(fact);
    }

    pub fn len(&self) -> usize { self.facts.len() }
    pub fn is_empty(&self) -> bool { self.facts.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, Fact> { self.facts.iter() }

    /// Facts with the given local name, in insertion order.
    pub fn by_local_name<'s>(&'s self, local_name: &str) -> impl Iterator<Item = &'s Fact> + 's {
        self.by_local_name
            .get(local_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |&i| &self.facts[i])
    }
}

impl FromIterator<Fact> for FactSet {
    fn from_iter<I: IntoIterator<Item = Fact>>(iter: I) -> Self {
        let mut set = Self::new();
        for fact in iter {
            set.push(fact);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(name: &str) -> ConceptId { ConceptId::new("http://example.com/dim", name) }

    #[test]
    fn test_context_equality_ignores_declaration_order() {
        let day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let a = DimensionalContext::new(
            Period::Instant(day),
            [
                DimensionMember::explicit(axis("Segment"), axis("Retail")),
                DimensionMember::explicit(axis("Geography"), axis("Europe")),
            ],
        );
        let b = DimensionalContext::new(
            Period::Instant(day),
            [
                DimensionMember::explicit(axis("Geography"), axis("Europe")),
                DimensionMember::explicit(axis("Segment"), axis("Retail")),
            ],
        );
        assert_eq!(a, b);
        assert_eq!(a.member(&axis("Segment")), Some(&Member::Explicit(axis("Retail"))));
        assert_eq!(a.member(&axis("Product")), None);
    }

    #[test]
    fn test_decimals_order_infinite_last() {
        assert!(Decimals::Finite(-3) < Decimals::Finite(2));
        assert!(Decimals::Finite(i32::MAX) < Decimals::Infinite);
        assert_eq!(Decimals::Infinite.to_string(), "INF");
    }

    #[test]
    fn test_validation_state_threshold() {
        assert!(!ValidationState::Invalid.is_valid());
        assert!(!ValidationState::Unvalidated.is_valid());
        assert!(ValidationState::Valid.is_valid());
        assert!(ValidationState::ValidNoContent.is_valid());
    }

    #[test]
    fn test_fact_set_index_keeps_insertion_order() {
        let facts: FactSet = [("Assets", "1"), ("Liabilities", "2"), ("Assets", "3")]
            .into_iter()
            .map(|(name, v)| Fact::new(ConceptId::new("us-gaap", name), FactValue::Text(v.into())))
            .collect();
        let values: Vec<&FactValue> = facts.by_local_name("Assets").map(|f| &f.value).collect();
        assert_eq!(values, vec![&FactValue::Text("1".into()), &FactValue::Text("3".into())]);
        assert_eq!(facts.by_local_name("Equity").count(), 0);
        assert_eq!(ConceptId::new("ns", "A").to_string(), "{ns}A");
    }
}
