//! The compiled, immutable form of rule entries and the rule set holding them.
use super::groups::{OrderedTokens, TokenSet};
use super::raw::{RawSpec, SUB_TYPES};
use super::value_pattern::ValuePattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Which kind of filing document an entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    Inline,
    NonInline,
    #[default]
    Both,
}

impl SourceMode {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "inline" => Some(SourceMode::Inline),
            "non-inline" => Some(SourceMode::NonInline),
            "both" => Some(SourceMode::Both),
            _ => None,
        }
    }

    /// Whether an entry restricted to `self` is compiled for a caller in `mode`.
    pub fn applies_to(self, mode: SourceMode) -> bool {
        self == SourceMode::Both || mode == SourceMode::Both || self == mode
    }
}

/// How a standard entry cites the rule it enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Citation {
    /// A message-reference code.
    Efm(String),
    /// A `<document>:<n>(.<n>)*` section reference.
    Section(String),
}

/// The closed set of entry shapes, inferred once from the raw fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Stores a value for later use; validation is optional.
    Storage { store_db_name: String, validation: Option<String> },
    /// An entry of an exhibit-type-specific rule file.
    ExhibitSpecific { validation: String },
    Standard { validation: String, citation: Citation },
}

impl RuleKind {
    pub fn validation(&self) -> Option<&str> {
        match self {
            RuleKind::Storage { validation, .. } => validation.as_deref(),
            RuleKind::ExhibitSpecific { validation } | RuleKind::Standard { validation, .. } => Some(validation),
        }
    }
}

/// A list field that may have been replaced by a group expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Tokens(Arc<OrderedTokens>),
    Raw(Value),
}

/// The condition referenced concepts must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceCondition {
    /// Default when an entry names references without a `reference-value`.
    MustBeAbsent,
    Values(FieldValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct References {
    pub names: Vec<String>,
    pub condition: ReferenceCondition,
}

/// A `...where` field: positional clauses keyed by condition.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub field: String,
    pub conditions: Vec<(String, Vec<Value>)>,
}

impl WhereClause {
    pub fn condition(&self, name: &str) -> Option<&[Value]> {
        self.conditions.iter().find(|(c, _)| c == name).map(|(_, v)| v.as_slice())
    }
}

/// One fully resolved rule entry. Never mutated after compilation.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Index of the entry in `sub-type-element-validations`.
    pub position: usize,
    pub kind: RuleKind,
    pub source: SourceMode,
    /// Concept names known to the filing's model (or wildcard/header names).
    pub names: Vec<String>,
    pub sub_types: TokenSet,
    pub form_types: TokenSet,
    pub value: Option<ValuePattern>,
    pub axis: Option<String>,
    pub message: Option<String>,
    pub severity: Option<String>,
    pub lang_pattern: Option<Regex>,
    pub references: Option<References>,
    pub store_db_valid_values: Option<FieldValue>,
    /// Compiled `<field>-pattern` entries keyed by `<field>`.
    pub patterns: Vec<(String, Regex)>,
    pub where_clauses: Vec<WhereClause>,
    pub value_maps: Vec<(String, Map<String, Value>)>,
    /// The raw entry, for message arguments and fields the engine does not interpret.
    pub attributes: Map<String, Value>,
}

impl CompiledRule {
    pub fn validation(&self) -> Option<&str> { self.kind.validation() }

    pub fn pattern(&self, field: &str) -> Option<&Regex> {
        self.patterns.iter().find(|(f, _)| f == field).map(|(_, re)| re)
    }

    pub fn where_clause(&self, field: &str) -> Option<&WhereClause> {
        self.where_clauses.iter().find(|w| w.field == field)
    }

    pub fn value_map(&self, field: &str) -> Option<&Map<String, Value>> {
        self.value_maps.iter().find(|(f, _)| f == field).map(|(_, m)| m)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> { self.attributes.get(key) }

    /// Whether the entry applies to a submission of `sub_type` with an optional form type.
    pub fn applies_to(&self, sub_type: &str, form_type: Option<&str>) -> bool {
        let sub_type_ok = self.sub_types.matches(sub_type)
            || self.pattern(SUB_TYPES).map_or(false, |re| re.is_match(sub_type));
        let form_ok = self.form_types.is_empty()
            || form_type.map_or(false, |form| self.form_types.matches(form));
        sub_type_ok && form_ok
    }

    /// Whether a concept name listed by the entry matches `name`, honouring `prefix:*`.
    pub fn names_concept(&self, name: &str) -> bool {
        self.names.iter().any(|n| match n.strip_suffix('*') {
            Some(prefix) if prefix.ends_with(':') => name.starts_with(prefix),
            _ => n == name,
        })
    }
}

/// The compiled rules of one validation run plus the global tables they reference.
///
/// Immutable once built; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    sub_type_classes: Map<String, Value>,
    validations: Map<String, Value>,
    axis_validations: Map<String, Value>,
    messages: Map<String, Value>,
}

impl RuleSet {
    pub(crate) fn new(rules: Vec<CompiledRule>, spec: RawSpec) -> Self {
        Self {
            rules,
            sub_type_classes: spec.sub_type_classes,
            validations: spec.validations,
            axis_validations: spec.axis_validations,
            messages: spec.messages,
        }
    }

    pub fn len(&self) -> usize { self.rules.len() }
    pub fn is_empty(&self) -> bool { self.rules.is_empty() }
    pub fn rules(&self) -> &[CompiledRule] { &self.rules }
    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRule> { self.rules.iter() }

    /// Rules applicable to a submission type and optional form type, in document order.
    pub fn rules_for<'s>(
        &'s self,
        sub_type: &'s str,
        form_type: Option<&'s str>,
    ) -> impl Iterator<Item = &'s CompiledRule> + 's {
        self.rules.iter().filter(move |r| r.applies_to(sub_type, form_type))
    }

    pub fn message(&self, key: &str) -> Option<&Value> { self.messages.get(key) }
    pub fn validation(&self, code: &str) -> Option<&Value> { self.validations.get(code) }
    pub fn axis_validation(&self, code: &str) -> Option<&Value> { self.axis_validations.get(code) }
    pub fn sub_type_class(&self, name: &str) -> Option<&Value> { self.sub_type_classes.get(name) }
}

impl<'s> IntoIterator for &'s RuleSet {
    type Item = &'s CompiledRule;
    type IntoIter = std::slice::Iter<'s, CompiledRule>;
    fn into_iter(self) -> Self::IntoIter { self.rules.iter() }
}
