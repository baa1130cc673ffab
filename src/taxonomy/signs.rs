//! Concepts expected to be reported as non-negative, with member exclusions.
//!
//! The catalog document keys every section by abbreviated namespace. For each
//! namespace in the filing the release-specific key (`us-gaap/2019`) is tried
//! first; the generic key (`us-gaap/*`) only applies when the release key
//! names nothing.
use super::error::{CacheError, CatalogError};
use super::cache::read_json_cache;
use super::namespace::{abbreviated_namespace, Abbreviation};
use crate::facts::{ConceptId, DimensionalContext, Member};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const SIGN_WARNINGS_FILE: &str = "signwarnings.json";

const CONCEPT_NAMES: &str = "conceptNames";
const EXCLUDED_MEMBER_NAMES: &str = "excludedMemberNames";
const EXCLUDED_MEMBER_STRINGS: &str = "excludedMemberStrings";
const EXCLUDED_AXES_MEMBERS: &str = "excludedAxesMembers";
const ANY_MEMBER: &str = "*";

/// A member excluded on one axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExcludedMember {
    /// Every member of the axis.
    Any,
    Member(ConceptId),
}

#[derive(Debug, Clone, Default)]
pub struct SignWarnings {
    concepts: HashSet<ConceptId>,
    excluded_members: HashSet<ConceptId>,
    excluded_axes_members: HashMap<ConceptId, HashSet<ExcludedMember>>,
    /// Case-insensitive alternation of the excluded member name fragments.
    excluded_member_names: Option<Regex>,
}

fn section<'d>(doc: &'d Map<String, Value>, name: &str) -> Result<Option<&'d Map<String, Value>>, CatalogError> {
    match doc.get(name) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(CatalogError::Shape { key: name.to_string(), expected: "an object keyed by namespace" }),
    }
}

fn names<'v>(key: &str, value: &'v Value) -> Result<Vec<&'v str>, CatalogError> {
    value
        .as_array()
        .and_then(|items| items.iter().map(Value::as_str).collect::<Option<Vec<_>>>())
        .ok_or_else(|| CatalogError::Shape { key: key.to_string(), expected: "a list of names" })
}

impl SignWarnings {
    /// Builds the catalog for the standard namespaces a filing uses.
    pub fn from_value<'n>(doc: &Value, namespaces: impl IntoIterator<Item = &'n str>) -> Result<Self, CatalogError> {
        let doc = doc
            .as_object()
            .ok_or(CatalogError::Shape { key: "sign warnings".into(), expected: "an object" })?;
        let concept_names = section(doc, CONCEPT_NAMES)?;
        let member_names = section(doc, EXCLUDED_MEMBER_NAMES)?;
        let member_strings = section(doc, EXCLUDED_MEMBER_STRINGS)?;
        let axes_members = section(doc, EXCLUDED_AXES_MEMBERS)?;

        let mut catalog = Self::default();
        let mut fragments: Vec<&str> = Vec::new();
        for namespace in namespaces {
            for form in [Abbreviation::WithYear, Abbreviation::Wild] {
                let Some(key) = abbreviated_namespace(namespace, form) else {
                    break;
                };
                let mut matched = false;

                if let Some(listed) = concept_names.and_then(|s| s.get(&key)) {
                    for name in names(&key, listed)? {
                        catalog.concepts.insert(ConceptId::new(namespace, name));
                        matched = true;
                    }
                }
                if let Some(listed) = member_names.and_then(|s| s.get(&key)) {
                    for name in names(&key, listed)? {
                        catalog.excluded_members.insert(ConceptId::new(namespace, name));
                        matched = true;
                    }
                }
                if let Some(listed) = member_strings.and_then(|s| s.get(&key)) {
                    for fragment in names(&key, listed)? {
                        if !fragments.contains(&fragment) {
                            fragments.push(fragment);
                        }
                        matched = true;
                    }
                }
                if let Some(axes) = axes_members.and_then(|s| s.get(&key)) {
                    let axes = axes
                        .as_object()
                        .ok_or_else(|| CatalogError::Shape { key: key.clone(), expected: "an object of axis members" })?;
                    for (axis, members) in axes {
                        let excluded = catalog.excluded_axes_members.entry(ConceptId::new(namespace, axis.as_str())).or_default();
                        for member in names(axis, members)? {
                            excluded.insert(if member == ANY_MEMBER {
                                ExcludedMember::Any
                            } else {
                                ExcludedMember::Member(ConceptId::new(namespace, member))
                            });
                            matched = true;
                        }
                    }
                }

                if matched {
                    break;
                }
            }
        }

        if !fragments.is_empty() {
            let joined = fragments.join("|");
            catalog.excluded_member_names = Some(
                RegexBuilder::new(&joined)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CatalogError::Pattern { key: EXCLUDED_MEMBER_STRINGS.into(), reason: e.to_string() })?,
            );
        }
        tracing::debug!(
            concepts = catalog.concepts.len(),
            excluded_members = catalog.excluded_members.len(),
            excluded_axes = catalog.excluded_axes_members.len(),
            "loaded sign warnings"
        );
        Ok(catalog)
    }

    /// Loads `signwarnings.json` from the resources directory; a missing file is `Ok(None)`.
    pub fn load<'n>(resources_dir: &Path, namespaces: impl IntoIterator<Item = &'n str>) -> Result<Option<Self>, CacheError> {
        match read_json_cache(&resources_dir.join(SIGN_WARNINGS_FILE))? {
            Some(doc) => Ok(Some(Self::from_value(&doc, namespaces)?)),
            None => Ok(None),
        }
    }

    pub fn is_non_negative(&self, concept: &ConceptId) -> bool { self.concepts.contains(concept) }

    /// A member excluded by name, or whose local name contains an excluded fragment.
    pub fn excludes_member(&self, member: &ConceptId) -> bool {
        self.excluded_members.contains(member)
            || self.excluded_member_names.as_ref().map_or(false, |re| re.is_match(&member.local_name))
    }

    pub fn excludes_axis_member(&self, axis: &ConceptId, member: &Member) -> bool {
        let Some(excluded) = self.excluded_axes_members.get(axis) else {
            return false;
        };
        excluded.contains(&ExcludedMember::Any)
            || member.concept().map_or(false, |m| excluded.contains(&ExcludedMember::Member(m.clone())))
    }

    /// True if any dimension of the context lifts the sign expectation.
    pub fn exempts(&self, context: &DimensionalContext) -> bool {
        context.dims().iter().any(|dim| {
            self.excludes_axis_member(&dim.axis, &dim.member)
                || dim.member.concept().map_or(false, |m| self.excludes_member(m))
        })
    }

    pub fn len(&self) -> usize { self.concepts.len() }
    pub fn is_empty(&self) -> bool { self.concepts.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{DimensionMember, Period};
    use chrono::NaiveDate;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;

    const GAAP_2019: &str = "http://fasb.org/us-gaap/2019";
    const GAAP_2018: &str = "http://fasb.org/us-gaap/2018";

    fn doc() -> Value {
        json!({
            "conceptNames": {
                "us-gaap/2019": ["Revenues"],
                "us-gaap/*": ["Assets", "Liabilities"]
            },
            "excludedMemberNames": { "us-gaap/*": ["EliminationsMember"] },
            "excludedMemberStrings": { "us-gaap/*": ["adjustment", "Reclass"] },
            "excludedAxesMembers": {
                "us-gaap/*": {
                    "StatementScenarioAxis": ["*"],
                    "ConsolidationItemsAxis": ["IntersegmentEliminationMember"]
                }
            }
        })
    }

    fn context(dims: Vec<DimensionMember>) -> DimensionalContext {
        let day = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
        DimensionalContext::new(Period::Instant(day), dims)
    }

    #[test]
    fn test_release_key_shadows_generic_key() {
        let signs = SignWarnings::from_value(&doc(), [GAAP_2019]).unwrap();
        assert!(signs.is_non_negative(&ConceptId::new(GAAP_2019, "Revenues")));
        assert!(!signs.is_non_negative(&ConceptId::new(GAAP_2019, "Assets")));
        // No release-specific exclusions, so none were loaded either.
        assert!(!signs.excludes_member(&ConceptId::new(GAAP_2019, "EliminationsMember")));
    }

    #[test]
    fn test_generic_key_applies_without_release_entries() {
        let signs = SignWarnings::from_value(&doc(), [GAAP_2018, "http://example.com/custom"]).unwrap();
        assert_eq!(signs.len(), 2);
        assert!(signs.is_non_negative(&ConceptId::new(GAAP_2018, "Assets")));
        assert!(signs.excludes_member(&ConceptId::new(GAAP_2018, "EliminationsMember")));
    }

    #[rstest]
    #[case("PriorPeriodAdjustmentMember", true)]
    #[case("RECLASSIFICATIONMember", true)]
    #[case("ParentCompanyMember", false)]
    fn test_member_fragments_ignore_case(#[case] member: &str, #[case] excluded: bool) {
        let signs = SignWarnings::from_value(&doc(), [GAAP_2018]).unwrap();
        assert_eq!(signs.excludes_member(&ConceptId::new("http://example.com/custom", member)), excluded);
    }

    #[test]
    fn test_axis_exclusions() {
        let signs = SignWarnings::from_value(&doc(), [GAAP_2018]).unwrap();
        let axis = |name: &str| ConceptId::new(GAAP_2018, name);

        let scenario = context(vec![DimensionMember::explicit(axis("StatementScenarioAxis"), axis("ScenarioForecastMember"))]);
        assert!(signs.exempts(&scenario));

        let elimination =
            context(vec![DimensionMember::explicit(axis("ConsolidationItemsAxis"), axis("IntersegmentEliminationMember"))]);
        assert!(signs.exempts(&elimination));

        let operating = context(vec![DimensionMember::explicit(axis("ConsolidationItemsAxis"), axis("OperatingSegmentsMember"))]);
        assert!(!signs.exempts(&operating));
        assert!(!signs.exempts(&context(Vec::new())));
    }

    #[test]
    fn test_malformed_sections() {
        assert!(matches!(
            SignWarnings::from_value(&json!({ "conceptNames": ["Revenues"] }), [GAAP_2018]),
            Err(CatalogError::Shape { .. })
        ));
        assert!(matches!(
            SignWarnings::from_value(&json!({ "excludedMemberStrings": { "us-gaap/*": ["("] } }), [GAAP_2018]),
            Err(CatalogError::Pattern { .. })
        ));
    }

    #[test]
    fn test_load_from_resources() {
        let dir = TempDir::new().unwrap();
        assert!(SignWarnings::load(dir.path(), [GAAP_2018]).unwrap().is_none());

        std::fs::write(dir.path().join(SIGN_WARNINGS_FILE), doc().to_string()).unwrap();
        let signs = SignWarnings::load(dir.path(), [GAAP_2018]).unwrap().unwrap();
        assert!(signs.is_non_negative(&ConceptId::new(GAAP_2018, "Liabilities")));
    }
}
