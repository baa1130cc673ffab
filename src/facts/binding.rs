//! Grouping of facts into bindings under an alignment policy.
//!
//! A binding is one equivalence class of facts: those whose period,
//! dimensions and unit agree on the projection the policy selects. Within a
//! binding each concept local name holds a single representative (or, when
//! the policy covers the period or some axes, one representative per covered
//! value). The representative is the most precise non-nil fact; on equal
//! precision the fact seen first keeps its place.
use super::error::PolicyError;
use super::precision::least_decimals;
use super::types::{ConceptId, Decimals, DimensionMember, DimensionalContext, Fact, FactSet, Member, Period, Unit};
use crate::taxonomy::graph::{is_descendant, RelationshipOracle};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

pub type FactFilter<'a> = Box<dyn Fn(&Fact) -> bool + Send + Sync + 'a>;

/// Requires every dimension member of a fact to descend from `root`.
pub struct Containment<'a> {
    pub oracle: &'a (dyn RelationshipOracle + Sync),
    pub root: ConceptId,
    /// Link role of the first step; later steps follow consecutive roles.
    pub link_role: Option<String>,
}

/// What a caller asks of one `bind` call.
///
/// `align_dimensions`, `cover_period` and `cover_dimensions` (by qname or by
/// local name) select the alignment mode; `cover_unit` composes with any.
#[derive(Default)]
pub struct BindingPolicy<'a> {
    pub include_nils: bool,
    pub fact_filter: Option<FactFilter<'a>>,
    /// Reject facts with any axis outside `cover_dimensions`.
    pub no_additional_dimensions: bool,
    pub cover_period: bool,
    pub cover_dimensions: HashSet<ConceptId>,
    pub cover_dimension_names: HashSet<String>,
    pub absent_dimension_names: HashSet<String>,
    pub align_dimensions: Option<HashSet<ConceptId>>,
    pub cover_unit: bool,
    pub containment: Option<Containment<'a>>,
}

impl<'a> BindingPolicy<'a> {
    pub fn new() -> Self { Self::default() }

    pub fn include_nils(mut self, include: bool) -> Self {
        self.include_nils = include;
        self
    }

    pub fn filter(mut self, filter: impl Fn(&Fact) -> bool + Send + Sync + 'a) -> Self {
        self.fact_filter = Some(Box::new(filter));
        self
    }

    pub fn no_additional_dimensions(mut self) -> Self {
        self.no_additional_dimensions = true;
        self
    }

    pub fn cover_period(mut self) -> Self {
        self.cover_period = true;
        self
    }

    pub fn cover_dimensions(mut self, axes: impl IntoIterator<Item = ConceptId>) -> Self {
        self.cover_dimensions.extend(axes);
        self
    }

    pub fn cover_dimension_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.cover_dimension_names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn absent_dimension_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.absent_dimension_names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn align_dimensions(mut self, axes: impl IntoIterator<Item = ConceptId>) -> Self {
        self.align_dimensions = Some(axes.into_iter().collect());
        self
    }

    pub fn cover_unit(mut self) -> Self {
        self.cover_unit = true;
        self
    }

    pub fn within(mut self, containment: Containment<'a>) -> Self {
        self.containment = Some(containment);
        self
    }

    fn covers_dimensions(&self) -> bool {
        !self.cover_dimensions.is_empty() || !self.cover_dimension_names.is_empty()
    }

    fn alignment(&self) -> Result<Alignment<'_>, PolicyError> {
        if let Some(axes) = &self.align_dimensions {
            if axes.is_empty() {
                return Err(PolicyError::EmptyAlignment);
            }
            if self.covers_dimensions() {
                return Err(PolicyError::ConflictingAlignment {
                    first: "align-dimensions",
                    second: "cover-dimensions",
                });
            }
            return Ok(Alignment::Align { axes, cover_period: self.cover_period });
        }
        match (self.cover_period, self.covers_dimensions()) {
            (true, true) => Err(PolicyError::ConflictingAlignment { first: "cover-period", second: "cover-dimensions" }),
            (true, false) => Ok(Alignment::CoverPeriod),
            (false, true) => Ok(Alignment::CoverDimensions),
            (false, false) => Ok(Alignment::Full),
        }
    }

    /// The fact's context if the fact takes part in binding at all.
    fn admit<'f>(&self, fact: &'f Fact) -> Option<&'f DimensionalContext> {
        if !fact.validation_state.is_valid() || (!self.include_nils && fact.is_nil()) {
            return None;
        }
        if let Some(filter) = &self.fact_filter {
            if !filter(fact) {
                return None;
            }
        }
        let context = fact.context.as_deref()?;
        let dims = context.dims();
        if self.no_additional_dimensions && dims.iter().any(|d| !self.cover_dimensions.contains(&d.axis)) {
            return None;
        }
        if dims.iter().any(|d| self.absent_dimension_names.contains(&d.axis.local_name)) {
            return None;
        }
        if let Some(c) = &self.containment {
            let contained = dims.iter().all(|d| match &d.member {
                Member::Explicit(member) => is_descendant(c.oracle, &c.root, member, c.link_role.as_deref()),
                Member::Typed(_) => false,
            });
            if !contained {
                return None;
            }
        }
        Some(context)
    }
}

/// The validated alignment mode of a policy.
enum Alignment<'p> {
    Full,
    CoverPeriod,
    CoverDimensions,
    Align { axes: &'p HashSet<ConceptId>, cover_period: bool },
}

impl Alignment<'_> {
    fn keys(&self, fact: &Fact, context: &DimensionalContext, policy: &BindingPolicy<'_>) -> (BindingKey, Option<SubKey>) {
        let period = context.period();
        let dims = context.dims();
        let (group, sub) = match self {
            Alignment::Full => (GroupKey { period: Some(period), dimensions: dims.to_vec() }, None),
            Alignment::CoverPeriod => (GroupKey { period: None, dimensions: dims.to_vec() }, Some(SubKey::Period(period))),
            Alignment::CoverDimensions => {
                let (covered, kept): (Vec<DimensionMember>, Vec<DimensionMember>) =
                    dims.iter().cloned().partition(|d| policy.cover_dimensions.contains(&d.axis));
                let kept = kept
                    .into_iter()
                    .filter(|d| !policy.cover_dimension_names.contains(&d.axis.local_name))
                    .collect();
                (GroupKey { period: Some(period), dimensions: kept }, Some(SubKey::Dimensions(covered)))
            }
            Alignment::Align { axes, cover_period } => {
                let aligned = dims.iter().filter(|d| axes.contains(&d.axis)).cloned().collect();
                let period = if *cover_period { None } else { Some(period) };
                (GroupKey { period, dimensions: aligned }, None)
            }
        };
        let unit = if policy.cover_unit { None } else { fact.unit.clone() };
        (BindingKey { group, unit }, sub)
    }
}

/// The aligned projection of a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    /// `None` when the period is covered.
    pub period: Option<Period>,
    pub dimensions: Vec<DimensionMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub group: GroupKey,
    /// `None` for unitless facts and when the unit is covered.
    pub unit: Option<Unit>,
}

/// The covered value a representative is kept per.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubKey {
    Period(Period),
    /// The members on the covered axes (by qname only).
    Dimensions(Vec<DimensionMember>),
}

#[derive(Debug, Clone)]
pub enum Slot<'f> {
    Single(&'f Fact),
    Covered(HashMap<SubKey, &'f Fact>),
}

impl<'f> Slot<'f> {
    pub fn facts(&self) -> Vec<&'f Fact> {
        match self {
            Slot::Single(f) => vec![*f],
            Slot::Covered(by_sub) => by_sub.values().copied().collect(),
        }
    }
}

/// A nil never displaces a held fact; a value displaces a held nil; otherwise strictly more decimals wins.
fn supersedes(candidate: &Fact, held: &Fact) -> bool {
    match (candidate.is_nil(), held.is_nil()) {
        (true, _) => false,
        (false, true) => true,
        (false, false) => candidate.decimals > held.decimals,
    }
}

fn offer<'f>(held: &mut &'f Fact, candidate: &'f Fact) {
    if supersedes(candidate, held) {
        *held = candidate;
    }
}

#[derive(Debug, Clone)]
pub struct Binding<'f> {
    key: BindingKey,
    slots: HashMap<String, Slot<'f>>,
}

impl<'f> Binding<'f> {
    fn new(key: BindingKey) -> Self {
        Self { key, slots: HashMap::new() }
    }

    fn insert(&mut self, fact: &'f Fact, sub: Option<SubKey>) {
        let name = fact.local_name();
        match (self.slots.get_mut(name), sub) {
            (None, None) => {
                self.slots.insert(name.to_string(), Slot::Single(fact));
            }
            (None, Some(sub)) => {
                self.slots.insert(name.to_string(), Slot::Covered(HashMap::from([(sub, fact)])));
            }
            (Some(Slot::Single(held)), _) => offer(held, fact),
            (Some(Slot::Covered(by_sub)), Some(sub)) => match by_sub.get_mut(&sub) {
                Some(held) => offer(held, fact),
                None => {
                    by_sub.insert(sub, fact);
                }
            },
            // One policy per bind call, so a covered slot always gets a sub-key.
            (Some(Slot::Covered(_)), None) => {}
        }
    }

    pub fn key(&self) -> &BindingKey { &self.key }
    pub fn len(&self) -> usize { self.slots.len() }
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }
    pub fn get(&self, local_name: &str) -> Option<&Slot<'f>> { self.slots.get(local_name) }
    pub fn local_names(&self) -> impl Iterator<Item = &str> { self.slots.keys().map(String::as_str) }

    /// The representative of an uncovered slot.
    pub fn fact(&self, local_name: &str) -> Option<&'f Fact> {
        match self.slots.get(local_name)? {
            Slot::Single(f) => Some(*f),
            Slot::Covered(_) => None,
        }
    }

    pub fn covered(&self, local_name: &str) -> Option<&HashMap<SubKey, &'f Fact>> {
        match self.slots.get(local_name)? {
            Slot::Covered(by_sub) => Some(by_sub),
            Slot::Single(_) => None,
        }
    }

    /// Least decimals over the named slots; every slot when `local_names` is empty.
    pub fn least_decimals(&self, local_names: &[&str]) -> Decimals {
        let facts: Vec<&Fact> = if local_names.is_empty() {
            self.slots.values().flat_map(Slot::facts).collect()
        } else {
            local_names
                .iter()
                .filter_map(|ln| self.slots.get(*ln))
                .flat_map(Slot::facts)
                .collect()
        };
        least_decimals(facts)
    }
}

/// All bindings of one `bind` call, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct Bindings<'f> {
    bindings: Vec<Binding<'f>>,
    index: HashMap<BindingKey, usize>,
}

impl<'f> Bindings<'f> {
    fn offer(&mut self, key: BindingKey, sub: Option<SubKey>, fact: &'f Fact) {
        let i = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.bindings.push(Binding::new(key.clone()));
                self.index.insert(key, self.bindings.len() - 1);
                self.bindings.len() - 1
            }
        };
        self.bindings[i].insert(fact, sub);
    }

    pub fn len(&self) -> usize { self.bindings.len() }
    pub fn is_empty(&self) -> bool { self.bindings.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, Binding<'f>> { self.bindings.iter() }
    pub fn get(&self, key: &BindingKey) -> Option<&Binding<'f>> { self.index.get(key).map(|&i| &self.bindings[i]) }
}

impl<'b, 'f> IntoIterator for &'b Bindings<'f> {
    type Item = &'b Binding<'f>;
    type IntoIter = std::slice::Iter<'b, Binding<'f>>;
    fn into_iter(self) -> Self::IntoIter { self.bindings.iter() }
}

/// One independent `bind` call for [`FactBindingEngine::bind_all`].
pub struct BindingRequest<'a> {
    pub local_names: Vec<String>,
    pub policy: BindingPolicy<'a>,
}

impl<'a> BindingRequest<'a> {
    pub fn new<S: Into<String>>(local_names: impl IntoIterator<Item = S>, policy: BindingPolicy<'a>) -> Self {
        Self { local_names: local_names.into_iter().map(Into::into).collect(), policy }
    }
}

/// Binds facts of one shared, read-only fact set.
#[derive(Debug, Clone, Copy)]
pub struct FactBindingEngine<'f> {
    facts: &'f FactSet,
}

impl<'f> FactBindingEngine<'f> {
    pub fn new(facts: &'f FactSet) -> Self {
        Self { facts }
    }

    /// Binds the facts of `local_names`, walked in request order then fact-set order.
    pub fn bind<S: AsRef<str>>(&self, local_names: &[S], policy: &BindingPolicy<'_>) -> Result<Bindings<'f>, PolicyError> {
        let alignment = policy.alignment()?;
        let mut bindings = Bindings::default();
        let mut admitted = 0usize;
        for name in local_names {
            for fact in self.facts.by_local_name(name.as_ref()) {
                let Some(context) = policy.admit(fact) else {
                    continue;
                };
                admitted += 1;
                let (key, sub) = alignment.keys(fact, context, policy);
                bindings.offer(key, sub, fact);
            }
        }
        tracing::debug!(names = local_names.len(), admitted, bindings = bindings.len(), "bound facts");
        Ok(bindings)
    }

    /// Evaluates independent requests in parallel. Results keep request order.
    pub fn bind_all(&self, requests: &[BindingRequest<'_>]) -> Vec<Result<Bindings<'f>, PolicyError>> {
        requests
            .par_iter()
            .map(|request| self.bind(&request.local_names, &request.policy))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::types::{FactValue, ValidationState};
    use crate::taxonomy::graph::{Arcrole, ContainmentGraph, Relationship};
    use chrono::NaiveDate;
    use rstest::rstest;
    use std::sync::Arc;

    const GAAP: &str = "http://fasb.org/us-gaap/2024";

    fn gaap(name: &str) -> ConceptId { ConceptId::new(GAAP, name) }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

    fn fy(year: i32) -> Period { Period::Duration { start: day(year, 1, 1), end: day(year, 12, 31) } }

    fn ctx(period: Period, dims: &[(&str, &str)]) -> Arc<DimensionalContext> {
        Arc::new(DimensionalContext::new(
            period,
            dims.iter().map(|(a, m)| DimensionMember::explicit(gaap(a), gaap(m))),
        ))
    }

    fn fact(name: &str, context: &Arc<DimensionalContext>, decimals: i32, value: &str) -> Fact {
        Fact::new(gaap(name), FactValue::Text(value.into()))
            .with_context(Arc::clone(context))
            .with_unit("USD")
            .with_decimals(Decimals::Finite(decimals))
    }

    fn text(f: &Fact) -> &str {
        match &f.value {
            FactValue::Text(t) => t,
            _ => "",
        }
    }

    #[rstest]
    #[case::same_slot(fy(2024), &[], "USD", 1)]
    #[case::other_period(fy(2023), &[], "USD", 2)]
    #[case::other_dimensions(fy(2024), &[("SegmentsAxis", "RetailMember")], "USD", 2)]
    #[case::other_unit(fy(2024), &[], "EUR", 2)]
    fn test_full_identity(
        #[case] period: Period,
        #[case] dims: &[(&str, &str)],
        #[case] unit: &str,
        #[case] expected_bindings: usize,
    ) {
        let base = ctx(fy(2024), &[]);
        let other = ctx(period, dims);
        let facts: FactSet = [fact("Revenues", &base, 0, "a"), fact("Revenues", &other, 0, "b").with_unit(unit)]
            .into_iter()
            .collect();
        let bindings = FactBindingEngine::new(&facts).bind(&["Revenues"], &BindingPolicy::new()).unwrap();
        assert_eq!(bindings.len(), expected_bindings);
    }

    #[rstest]
    #[case(&[(2, "low"), (4, "high")], "high")]
    #[case(&[(4, "high"), (2, "low")], "high")]
    #[case(&[(3, "first"), (3, "second")], "first")]
    #[case(&[(-3, "thousands"), (-6, "millions"), (-3, "again")], "thousands")]
    fn test_precision_wins_ties_keep_first(#[case] reported: &[(i32, &str)], #[case] expected: &str) {
        let c = ctx(fy(2024), &[]);
        let facts: FactSet = reported.iter().map(|(d, v)| fact("Revenues", &c, *d, v)).collect();
        let bindings = FactBindingEngine::new(&facts).bind(&["Revenues"], &BindingPolicy::new()).unwrap();
        assert_eq!(bindings.len(), 1);
        let binding = bindings.iter().next().unwrap();
        assert_eq!(text(binding.fact("Revenues").unwrap()), expected);
    }

    #[test]
    fn test_nils_never_compete() {
        let c = ctx(fy(2024), &[]);
        let nil = Fact::new(gaap("Revenues"), FactValue::Nil).with_context(Arc::clone(&c)).with_unit("USD");
        let facts: FactSet = [nil.clone(), fact("Revenues", &c, -6, "value")].into_iter().collect();
        let engine = FactBindingEngine::new(&facts);

        let bindings = engine.bind(&["Revenues"], &BindingPolicy::new().include_nils(true)).unwrap();
        assert_eq!(text(bindings.iter().next().unwrap().fact("Revenues").unwrap()), "value");

        let only_nil: FactSet = [nil].into_iter().collect();
        let engine = FactBindingEngine::new(&only_nil);
        assert!(engine.bind(&["Revenues"], &BindingPolicy::new()).unwrap().is_empty());
        let bindings = engine.bind(&["Revenues"], &BindingPolicy::new().include_nils(true)).unwrap();
        assert!(bindings.iter().next().unwrap().fact("Revenues").unwrap().is_nil());
    }

    #[test]
    fn test_unusable_facts_are_dropped() {
        let c = ctx(fy(2024), &[]);
        let facts: FactSet = [
            fact("Revenues", &c, 0, "invalid").with_validation_state(ValidationState::Invalid),
            Fact::new(gaap("Revenues"), FactValue::Text("no context".into())),
            fact("Revenues", &c, -3, "filtered"),
            fact("Revenues", &c, -6, "kept"),
        ]
        .into_iter()
        .collect();
        let policy = BindingPolicy::new().filter(|f| text(f) != "filtered");
        let bindings = FactBindingEngine::new(&facts).bind(&["Revenues"], &policy).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(text(bindings.iter().next().unwrap().fact("Revenues").unwrap()), "kept");
    }

    #[test]
    fn test_cover_period_keeps_one_fact_per_period() {
        let facts: FactSet = [
            fact("Revenues", &ctx(fy(2023), &[]), 0, "2023"),
            fact("Revenues", &ctx(fy(2024), &[]), 0, "2024"),
            fact("Revenues", &ctx(fy(2024), &[]), 2, "2024 precise"),
        ]
        .into_iter()
        .collect();
        let bindings = FactBindingEngine::new(&facts).bind(&["Revenues"], &BindingPolicy::new().cover_period()).unwrap();
        assert_eq!(bindings.len(), 1);
        let binding = bindings.iter().next().unwrap();
        assert_eq!(binding.key().group.period, None);
        let by_period = binding.covered("Revenues").unwrap();
        assert_eq!(by_period.len(), 2);
        assert_eq!(text(by_period[&SubKey::Period(fy(2024))]), "2024 precise");
        assert!(binding.fact("Revenues").is_none());
    }

    #[test]
    fn test_cover_dimensions() {
        let total = ctx(fy(2024), &[]);
        let retail = ctx(fy(2024), &[("SegmentsAxis", "RetailMember")]);
        let online = ctx(fy(2024), &[("SegmentsAxis", "OnlineMember")]);
        let scenario = ctx(fy(2024), &[("ScenarioAxis", "ForecastMember")]);
        let facts: FactSet = [
            fact("Revenues", &total, 0, "total"),
            fact("Revenues", &retail, 0, "retail"),
            fact("Revenues", &online, 0, "online"),
            fact("Revenues", &scenario, 0, "forecast"),
        ]
        .into_iter()
        .collect();
        let engine = FactBindingEngine::new(&facts);

        let by_qname = engine.bind(&["Revenues"], &BindingPolicy::new().cover_dimensions([gaap("SegmentsAxis")])).unwrap();
        // The scenario fact keeps its own group.
        assert_eq!(by_qname.len(), 2);
        let segments = by_qname.iter().next().unwrap().covered("Revenues").unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(text(segments[&SubKey::Dimensions(vec![])]), "total");

        // Name-covered axes leave the group key but not the sub-key.
        let by_name = engine.bind(&["Revenues"], &BindingPolicy::new().cover_dimension_names(["ScenarioAxis"])).unwrap();
        let groups: Vec<usize> = by_name.iter().map(|b| b.covered("Revenues").unwrap().len()).collect();
        assert_eq!(groups, vec![1, 1, 1]);
        assert_eq!(text(by_name.iter().next().unwrap().covered("Revenues").unwrap()[&SubKey::Dimensions(vec![])]), "total");
    }

    #[test]
    fn test_align_dimensions_projects_context() {
        let a = ctx(fy(2024), &[("SegmentsAxis", "RetailMember"), ("ScenarioAxis", "ActualMember")]);
        let b = ctx(fy(2024), &[("SegmentsAxis", "RetailMember"), ("ScenarioAxis", "ForecastMember")]);
        let c = ctx(fy(2023), &[("SegmentsAxis", "RetailMember")]);
        let facts: FactSet = [fact("Revenues", &a, 0, "actual"), fact("Revenues", &b, 2, "forecast"), fact("Revenues", &c, 0, "prior")]
            .into_iter()
            .collect();
        let engine = FactBindingEngine::new(&facts);

        let aligned = engine.bind(&["Revenues"], &BindingPolicy::new().align_dimensions([gaap("SegmentsAxis")])).unwrap();
        assert_eq!(aligned.len(), 2);
        assert_eq!(text(aligned.iter().next().unwrap().fact("Revenues").unwrap()), "forecast");

        let policy = BindingPolicy::new().align_dimensions([gaap("SegmentsAxis")]).cover_period();
        assert_eq!(engine.bind(&["Revenues"], &policy).unwrap().len(), 1);
    }

    #[test]
    fn test_cover_unit() {
        let c = ctx(fy(2024), &[]);
        let facts: FactSet = [fact("Revenues", &c, 0, "usd"), fact("Revenues", &c, 1, "eur").with_unit("EUR")]
            .into_iter()
            .collect();
        let bindings = FactBindingEngine::new(&facts).bind(&["Revenues"], &BindingPolicy::new().cover_unit()).unwrap();
        assert_eq!(bindings.len(), 1);
        let binding = bindings.iter().next().unwrap();
        assert_eq!(binding.key().unit, None);
        assert_eq!(text(binding.fact("Revenues").unwrap()), "eur");
    }

    #[test]
    fn test_dimension_restrictions() {
        let plain = ctx(fy(2024), &[]);
        let segment = ctx(fy(2024), &[("SegmentsAxis", "RetailMember")]);
        let scenario = ctx(fy(2024), &[("ScenarioAxis", "ForecastMember")]);
        let facts: FactSet = [
            fact("Revenues", &plain, 0, "plain"),
            fact("Revenues", &segment, 0, "segment"),
            fact("Revenues", &scenario, 0, "scenario"),
        ]
        .into_iter()
        .collect();
        let engine = FactBindingEngine::new(&facts);

        let policy = BindingPolicy::new().cover_dimensions([gaap("SegmentsAxis")]).no_additional_dimensions();
        let bound = engine.bind(&["Revenues"], &policy).unwrap();
        let values: Vec<&str> = bound.iter().flat_map(|b| b.get("Revenues").unwrap().facts()).map(text).collect();
        assert_eq!(values.len(), 2);
        assert!(!values.contains(&"scenario"));

        let policy = BindingPolicy::new().absent_dimension_names(["ScenarioAxis"]);
        assert_eq!(engine.bind(&["Revenues"], &policy).unwrap().len(), 2);
    }

    #[test]
    fn test_containment_requires_descendant_members() {
        let role = "http://example.com/role/Segments";
        let graph: ContainmentGraph = [
            Relationship::new(gaap("SegmentsTable"), gaap("SegmentsAxis"), Arcrole::HypercubeDimension, role),
            Relationship::new(gaap("SegmentsAxis"), gaap("SegmentsDomain"), Arcrole::DimensionDomain, role),
            Relationship::new(gaap("SegmentsDomain"), gaap("RetailMember"), Arcrole::DomainMember, role),
        ]
        .into_iter()
        .collect();
        let facts: FactSet = [
            fact("Revenues", &ctx(fy(2024), &[("SegmentsAxis", "RetailMember")]), 0, "in cube"),
            fact("Revenues", &ctx(fy(2024), &[("SegmentsAxis", "OtherMember")]), 0, "outside"),
            fact("Revenues", &ctx(fy(2024), &[]), 0, "no dims"),
        ]
        .into_iter()
        .collect();
        let policy = BindingPolicy::new().within(Containment {
            oracle: &graph,
            root: gaap("SegmentsTable"),
            link_role: Some(role.to_string()),
        });
        let bound = FactBindingEngine::new(&facts).bind(&["Revenues"], &policy).unwrap();
        let values: Vec<&str> = bound.iter().filter_map(|b| b.fact("Revenues")).map(text).collect();
        assert_eq!(values, vec!["in cube", "no dims"]);
    }

    #[rstest]
    #[case::empty_alignment(BindingPolicy::new().align_dimensions(Vec::new()), PolicyError::EmptyAlignment)]
    #[case::align_and_cover(
        BindingPolicy::new().align_dimensions([gaap("A")]).cover_dimension_names(["B"]),
        PolicyError::ConflictingAlignment { first: "align-dimensions", second: "cover-dimensions" }
    )]
    #[case::period_and_dims(
        BindingPolicy::new().cover_period().cover_dimensions([gaap("A")]),
        PolicyError::ConflictingAlignment { first: "cover-period", second: "cover-dimensions" }
    )]
    fn test_contradictory_policies_fail_fast(#[case] policy: BindingPolicy<'static>, #[case] expected: PolicyError) {
        let facts = FactSet::new();
        let result = FactBindingEngine::new(&facts).bind(&["Revenues"], &policy);
        assert_eq!(result.unwrap_err(), expected);
    }

    #[test]
    fn test_least_decimals_of_binding() {
        let c = ctx(fy(2024), &[]);
        let facts: FactSet = [fact("Revenues", &c, -3, "r"), fact("CostOfRevenue", &c, -6, "c"), fact("GrossProfit", &c, 0, "g")]
            .into_iter()
            .collect();
        let bindings = FactBindingEngine::new(&facts)
            .bind(&["Revenues", "CostOfRevenue", "GrossProfit"], &BindingPolicy::new())
            .unwrap();
        let binding = bindings.iter().next().unwrap();
        assert_eq!(binding.len(), 3);
        assert_eq!(binding.least_decimals(&["Revenues", "GrossProfit"]), Decimals::Finite(-3));
        assert_eq!(binding.least_decimals(&[]), Decimals::Finite(-6));
    }

    #[test]
    fn test_bind_all_matches_sequential() {
        let facts: FactSet = (2020..2025)
            .flat_map(|y| {
                let c = ctx(fy(y), &[]);
                vec![fact("Revenues", &c, 0, "r"), fact("NetIncomeLoss", &c, 0, "n")]
            })
            .collect();
        let engine = FactBindingEngine::new(&facts);
        let requests = vec![
            BindingRequest::new(["Revenues"], BindingPolicy::new()),
            BindingRequest::new(["Revenues", "NetIncomeLoss"], BindingPolicy::new().cover_period()),
            BindingRequest::new(["NetIncomeLoss"], BindingPolicy::new().cover_period().cover_dimensions([gaap("A")])),
        ];
        let results = engine.bind_all(&requests);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().len(), 5);
        assert_eq!(results[1].as_ref().unwrap().len(), 1);
        assert!(results[2].is_err());
    }
}
