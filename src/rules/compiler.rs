//! The rule compiler: validates every raw entry and resolves it into a [`CompiledRule`].
//!
//! Like a linter, the compiler checks every entry and collects every problem
//! before returning, so a rule author sees the complete error list at once.
//! Entries with errors are still compiled when enough of them is usable; an
//! entry is only left out when its kind cannot be determined or when its
//! source restriction does not match the caller's mode.
use super::entry::{
    Citation, CompiledRule, FieldValue, ReferenceCondition, References, RuleKind, RuleSet, SourceMode, WhereClause,
};
use super::error::{EntryLocation, ReferenceKind, RuleError};
use super::groups::{flatten_tokens, group_reference, has_group_reference, GroupResolver, OrderedTokens, TokenSet};
use super::raw::*;
use super::value_pattern::{compile_regex, ValuePattern, VALUE, VALUE_PATTERN};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Validation codes that compare against other concepts and so need `references`.
const REFERENCE_CODES: &[&str] = &["f2", "og", "ol1", "ol2", "oph", "ar", "sr", "oth", "t", "tb", "t1", "te"];
/// Fatal-dependency codes (`fdep...`) also need `references`.
const FATAL_DEPENDENCY_PREFIX: &str = "fdep";
/// Codes whose `value` is a set of allowed options.
const UNION_CODES: &[&str] = &["ru", "ou"];

const WILDCARD_NAME_SUFFIX: &str = ":*";
const HEADER_NAME_PREFIX: &str = "header:";

static SECTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*:\d+(\.\d+)*").expect("section reference pattern compiles"));

/// Whether `references` names at least one concept once nested lists are flattened.
/// A malformed value counts as present; it is reported as a type mismatch.
fn has_references(entry: &Map<String, Value>) -> bool {
    let Some(raw) = entry.get(REFERENCES) else {
        return false;
    };
    let mut names = Vec::new();
    flatten_tokens(raw, &mut names).is_err() || !names.is_empty()
}

/// The active model's concept vocabulary, used to drop names that do not
/// exist in the filing's taxonomy version.
pub trait ConceptModel {
    fn contains_concept(&self, name: &str) -> bool;
}

impl ConceptModel for HashSet<String> {
    fn contains_concept(&self, name: &str) -> bool { self.contains(name) }
}

/// Caller-supplied parameters of one compilation.
pub struct CompileContext<'a> {
    pub mode: SourceMode,
    /// Compiling an exhibit-type-specific rule file.
    pub exhibit_specific: bool,
    pub concepts: &'a dyn ConceptModel,
}

impl<'a> CompileContext<'a> {
    pub fn new(mode: SourceMode, concepts: &'a dyn ConceptModel) -> Self {
        Self { mode, exhibit_specific: false, concepts }
    }

    pub fn exhibit_specific(mut self, exhibit_specific: bool) -> Self {
        self.exhibit_specific = exhibit_specific;
        self
    }
}

/// A best-effort rule set plus every error found while building it.
#[derive(Debug)]
pub struct CompileOutcome {
    pub rule_set: RuleSet,
    pub errors: Vec<RuleError>,
}

impl CompileOutcome {
    pub fn is_clean(&self) -> bool { self.errors.is_empty() }

    /// All-or-nothing view for hosts that refuse a partially valid specification.
    pub fn into_result(self) -> Result<RuleSet, Vec<RuleError>> {
        if self.errors.is_empty() {
            Ok(self.rule_set)
        } else {
            Err(self.errors)
        }
    }
}

/// Compiles a raw specification for one validation run.
pub fn compile(spec: RawSpec, ctx: &CompileContext<'_>) -> CompileOutcome {
    let (rules, errors) = {
        let mut compiler = RuleCompiler::new(&spec, ctx);
        compiler.compile_entries();
        compiler.check_table_messages();
        (compiler.rules, compiler.errors)
    };

    for error in &errors {
        tracing::warn!(%error, "rule specification error");
    }
    tracing::debug!(
        entries = spec.sub_type_element_validations.len(),
        compiled = rules.len(),
        errors = errors.len(),
        mode = ?ctx.mode,
        "compiled rule specification"
    );

    CompileOutcome { rule_set: RuleSet::new(rules, spec), errors }
}

struct RuleCompiler<'a, 'c> {
    spec: &'a RawSpec,
    ctx: &'c CompileContext<'c>,
    groups: GroupResolver<'a>,
    rules: Vec<CompiledRule>,
    errors: Vec<RuleError>,
}

impl<'a, 'c> RuleCompiler<'a, 'c> {
    fn new(spec: &'a RawSpec, ctx: &'c CompileContext<'c>) -> Self {
        Self {
            spec,
            ctx,
            groups: GroupResolver::new(&spec.sub_type_classes),
            rules: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn compile_entries(&mut self) {
        let spec = self.spec;
        for (position, raw) in spec.sub_type_element_validations.iter().enumerate() {
            if let Some(rule) = self.compile_entry(position, raw) {
                self.rules.push(rule);
            }
        }
    }

    fn compile_entry(&mut self, position: usize, raw: &Value) -> Option<CompiledRule> {
        let location = EntryLocation::entry(position, raw);
        let Some(entry) = raw.as_object() else {
            self.errors.push(RuleError::TypeMismatch {
                location,
                field: "sub-type-element-validations".into(),
                expected: "an object",
            });
            return None;
        };
        if entry.keys().all(|k| is_comment_key(k)) {
            return None;
        }

        let exhibit = self.ctx.exhibit_specific;
        let storage = entry.contains_key(STORE_DB_NAME);

        // --- Required fields by kind ---
        let citation_field = if entry.contains_key(MSG_SECTION) { MSG_SECTION } else { EFM };
        let mut required = vec![NAMES];
        if !storage {
            required.push(VALIDATION);
            if !exhibit {
                required.extend([citation_field, SOURCE]);
            }
        }
        for field in required {
            if !entry.contains_key(field) {
                self.missing(&location, field);
            }
        }
        let citation = self.citation(&location, entry);

        if entry.contains_key(SEVERITY) && !exhibit && !entry.keys().any(|k| k.starts_with(MESSAGE)) {
            self.missing(&location, "message*");
        }

        let validation = self.string_field(&location, entry, VALIDATION);
        if let Some(code) = validation.as_deref() {
            let needs_references = REFERENCE_CODES.contains(&code) || code.starts_with(FATAL_DEPENDENCY_PREFIX);
            if needs_references && !has_references(entry) {
                self.missing(&location, REFERENCES);
            }
        }

        let value = self.compile_value(&location, entry, validation.as_deref());
        let lang_pattern = entry.get(LANG).and_then(|lang| self.regex_field(&location, LANG, lang));

        // --- Cross references into the global tables ---
        if let Some(code) = validation.as_deref() {
            if !self.spec.validations.contains_key(code) {
                self.unknown(&location, ReferenceKind::Validation, code);
            }
        }
        let axis = self.string_field(&location, entry, AXIS);
        if let Some(code) = axis.as_deref() {
            if !self.spec.axis_validations.contains_key(code) {
                self.unknown(&location, ReferenceKind::Axis, code);
            }
        }
        let message = self.string_field(&location, entry, MESSAGE);
        if let Some(key) = message.as_deref() {
            if !self.spec.messages.contains_key(key) {
                self.unknown(&location, ReferenceKind::Message, key);
            }
        }

        let source = self.source(&location, entry, storage && validation.is_none());

        // --- Resolution ---
        let names = self.filter_names(&location, entry.get(NAMES));
        let references = self.references(&location, entry);
        let sub_types = self.resolve_tokens(&location, SUB_TYPES, entry.get(SUB_TYPES).or_else(|| entry.get(SUB_TYPE)));
        let form_types =
            self.resolve_tokens(&location, FORM_TYPES, entry.get(FORM_TYPES).or_else(|| entry.get(FORM_TYPE)));
        let patterns = self.patterns(&location, entry);
        let store_db_valid_values = entry
            .get(STORE_DB_VALID_VALUES)
            .map(|raw| self.field_value(&location, STORE_DB_VALID_VALUES, raw));
        let where_clauses = self.where_clauses(&location, entry);
        let value_maps = self.value_maps(&location, entry);

        let kind = self.kind(&location, entry, validation, citation)?;
        let source = source?;
        if !source.applies_to(self.ctx.mode) {
            return None;
        }

        Some(CompiledRule {
            position,
            kind,
            source,
            names,
            sub_types,
            form_types,
            value,
            axis,
            message,
            severity: entry.get(SEVERITY).map(scalar_text),
            lang_pattern,
            references,
            store_db_valid_values,
            patterns,
            where_clauses,
            value_maps,
            attributes: entry.clone(),
        })
    }

    /// After all entries: messages named by the axis and validation tables must exist.
    fn check_table_messages(&mut self) {
        let spec = self.spec;
        for (key, axis_validation) in &spec.axis_validations {
            if let Some(message) = axis_validation.get(MESSAGE).and_then(Value::as_str) {
                if !spec.messages.contains_key(message) {
                    let location = EntryLocation::AxisValidation { key: key.clone() };
                    self.unknown(&location, ReferenceKind::Message, message);
                }
            }
        }
        for (key, validation) in &spec.validations {
            if let Some(message) = validation.get(MESSAGE).and_then(Value::as_str) {
                if !spec.messages.contains_key(message) {
                    let location = EntryLocation::Validation { key: key.clone() };
                    self.unknown(&location, ReferenceKind::Message, message);
                }
            }
        }
    }

    // --- Field helpers ---

    fn missing(&mut self, location: &EntryLocation, field: &str) {
        self.errors.push(RuleError::MissingField { location: location.clone(), field: field.to_string() });
    }

    fn unknown(&mut self, location: &EntryLocation, kind: ReferenceKind, key: &str) {
        self.errors.push(RuleError::UnknownReference { location: location.clone(), kind, key: key.to_string() });
    }

    fn mismatch(&mut self, location: &EntryLocation, field: &str, expected: &'static str) {
        self.errors.push(RuleError::TypeMismatch { location: location.clone(), field: field.to_string(), expected });
    }

    fn string_field(&mut self, location: &EntryLocation, entry: &Map<String, Value>, field: &str) -> Option<String> {
        match entry.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            _ => {
                self.mismatch(location, field, "a string");
                None
            }
        }
    }

    fn citation(&mut self, location: &EntryLocation, entry: &Map<String, Value>) -> Option<Citation> {
        if let Some(section) = entry.get(MSG_SECTION) {
            let Some(section) = section.as_str() else {
                self.mismatch(location, MSG_SECTION, "a string");
                return None;
            };
            if !SECTION_PATTERN.is_match(section) {
                self.errors.push(RuleError::InvalidFormat {
                    location: location.clone(),
                    field: MSG_SECTION.into(),
                    detail: format!("value \"{}\" does not match \"{}\"", section, SECTION_PATTERN.as_str()),
                });
                return None;
            }
            return Some(Citation::Section(section.to_string()));
        }
        entry.get(EFM).map(|efm| Citation::Efm(scalar_text(efm)))
    }

    fn source(&mut self, location: &EntryLocation, entry: &Map<String, Value>, storage_only: bool) -> Option<SourceMode> {
        match entry.get(SOURCE) {
            None if self.ctx.exhibit_specific || storage_only => Some(SourceMode::Both),
            None => {
                // Standard entries already reported the missing field.
                if entry.contains_key(STORE_DB_NAME) {
                    self.missing(location, SOURCE);
                }
                None
            }
            Some(Value::String(s)) => {
                let mode = SourceMode::parse(s);
                if mode.is_none() {
                    self.errors.push(RuleError::InvalidFormat {
                        location: location.clone(),
                        field: SOURCE.into(),
                        detail: format!("\"{}\" is not one of inline, non-inline, both", s),
                    });
                }
                mode
            }
            Some(_) => {
                self.mismatch(location, SOURCE, "a string");
                None
            }
        }
    }

    fn kind(
        &mut self,
        location: &EntryLocation,
        entry: &Map<String, Value>,
        validation: Option<String>,
        citation: Option<Citation>,
    ) -> Option<RuleKind> {
        if let Some(name) = entry.get(STORE_DB_NAME) {
            let Some(name) = name.as_str() else {
                self.mismatch(location, STORE_DB_NAME, "a string");
                return None;
            };
            return Some(RuleKind::Storage { store_db_name: name.to_string(), validation });
        }
        let validation = validation?;
        if self.ctx.exhibit_specific {
            return Some(RuleKind::ExhibitSpecific { validation });
        }
        citation.map(|citation| RuleKind::Standard { validation, citation })
    }

    fn regex_field(&mut self, location: &EntryLocation, field: &str, raw: &Value) -> Option<Regex> {
        let Some(pattern) = raw.as_str() else {
            self.mismatch(location, field, "a regular expression string");
            return None;
        };
        match compile_regex(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                self.errors.push(RuleError::InvalidFormat {
                    location: location.clone(),
                    field: field.to_string(),
                    detail: e.to_string(),
                });
                None
            }
        }
    }

    fn compile_value(
        &mut self,
        location: &EntryLocation,
        entry: &Map<String, Value>,
        validation: Option<&str>,
    ) -> Option<ValuePattern> {
        let union = validation.map_or(false, |code| UNION_CODES.contains(&code));
        if union && !entry.get(VALUE).map_or(false, Value::is_array) {
            self.mismatch(location, VALUE, "a list");
        }

        let (field, raw) = ValuePattern::select(entry)?;
        if field == VALUE {
            if raw.is_array() && (union || has_group_reference(raw)) {
                return Some(ValuePattern::OneOf(self.expand_tokens(location, VALUE, raw)));
            }
            return Some(ValuePattern::Literal(raw.clone()));
        }
        match ValuePattern::compile(field, raw) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                self.errors.push(RuleError::InvalidFormat {
                    location: location.clone(),
                    field: field.to_string(),
                    detail: e.to_string(),
                });
                None
            }
        }
    }

    /// Keeps names the model knows, `prefix:*` wildcards and synthetic headers.
    fn filter_names(&mut self, location: &EntryLocation, raw: Option<&Value>) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(raw) = raw {
            if flatten_tokens(raw, &mut names).is_err() {
                self.mismatch(location, NAMES, "a list of concept names");
                return Vec::new();
            }
        }
        let concepts = self.ctx.concepts;
        names.retain(|name| {
            concepts.contains_concept(name) || name.ends_with(WILDCARD_NAME_SUFFIX) || name.starts_with(HEADER_NAME_PREFIX)
        });
        names
    }

    fn references(&mut self, location: &EntryLocation, entry: &Map<String, Value>) -> Option<References> {
        let raw = entry.get(REFERENCES)?;
        let mut names = Vec::new();
        if flatten_tokens(raw, &mut names).is_err() {
            self.mismatch(location, REFERENCES, "a list of concept names");
        }
        let condition = match entry.get(REFERENCE_VALUE) {
            Some(value) => ReferenceCondition::Values(self.field_value(location, REFERENCE_VALUE, value)),
            None => ReferenceCondition::MustBeAbsent,
        };
        Some(References { names, condition })
    }

    fn resolve_tokens(&mut self, location: &EntryLocation, field: &str, raw: Option<&Value>) -> TokenSet {
        let Some(raw) = raw else {
            return TokenSet::default();
        };
        self.groups.resolve(raw).unwrap_or_else(|e| {
            self.errors.push(RuleError::from_group(location.clone(), field, e));
            TokenSet::default()
        })
    }

    /// Group expansion for list-valued fields. `*` stays a literal token here;
    /// only sub-type and form-type sets collapse to `all`.
    fn expand_tokens(&mut self, location: &EntryLocation, field: &str, raw: &Value) -> Arc<OrderedTokens> {
        self.groups.expand_list(raw).unwrap_or_else(|e| {
            self.errors.push(RuleError::from_group(location.clone(), field, e));
            Arc::default()
        })
    }

    /// A list containing any group reference is replaced by its expansion.
    fn field_value(&mut self, location: &EntryLocation, field: &str, raw: &Value) -> FieldValue {
        if has_group_reference(raw) {
            FieldValue::Tokens(self.expand_tokens(location, field, raw))
        } else {
            FieldValue::Raw(raw.clone())
        }
    }

    fn patterns(&mut self, location: &EntryLocation, entry: &Map<String, Value>) -> Vec<(String, Regex)> {
        let mut patterns = Vec::new();
        for (key, raw) in entry {
            // `value-pattern` compiles into the value constraint.
            if key == VALUE_PATTERN {
                continue;
            }
            if let Some(base) = key.strip_suffix(PATTERN_SUFFIX) {
                if let Some(re) = self.regex_field(location, key, raw) {
                    patterns.push((base.to_string(), re));
                }
            }
        }
        patterns
    }

    fn where_clauses(&mut self, location: &EntryLocation, entry: &Map<String, Value>) -> Vec<WhereClause> {
        let mut clauses = Vec::new();
        for (key, raw) in entry {
            if !key.ends_with(WHERE_SUFFIX) {
                continue;
            }
            let Some(conditions) = raw.as_object() else {
                self.mismatch(location, key, "a mapping of conditions");
                continue;
            };
            let mut resolved = Vec::with_capacity(conditions.len());
            for (condition, clause) in conditions {
                let Some(items) = clause.as_array() else {
                    self.mismatch(location, &format!("{} {}", key, condition), "a list");
                    continue;
                };
                let items = if has_group_reference(clause) {
                    self.expand_tokens(location, key, clause).iter().map(|t| Value::String(t.to_string())).collect()
                } else {
                    items.clone()
                };
                resolved.push((condition.clone(), items));
            }
            clauses.push(WhereClause { field: key.clone(), conditions: resolved });
        }
        clauses
    }

    fn value_maps(&mut self, location: &EntryLocation, entry: &Map<String, Value>) -> Vec<(String, Map<String, Value>)> {
        let mut maps = Vec::new();
        for (key, raw) in entry {
            if !key.ends_with(VALUE_MAP_SUFFIX) {
                continue;
            }
            match raw {
                Value::Object(map) => maps.push((key.clone(), map.clone())),
                Value::String(reference) => {
                    let Some(name) = group_reference(reference) else {
                        self.errors.push(RuleError::InvalidFormat {
                            location: location.clone(),
                            field: key.clone(),
                            detail: format!("\"{}\" must be a mapping or a reference to one", reference),
                        });
                        continue;
                    };
                    match self.spec.sub_type_classes.get(name) {
                        Some(Value::Object(map)) => maps.push((key.clone(), map.clone())),
                        Some(_) => self.mismatch(location, key, "a reference to a mapping"),
                        None => self.unknown(location, ReferenceKind::Group, name),
                    }
                }
                _ => self.mismatch(location, key, "a mapping or a reference to one"),
            }
        }
        maps
    }
}

fn scalar_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
