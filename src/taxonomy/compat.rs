//! Which taxonomy releases may be combined in one filing.
//!
//! The compatibility document has two tables: `taxonomy-classes` names
//! reusable lists of abbreviated namespaces, and `compatible-classes` maps a
//! release to the releases it may be combined with, using `@class`
//! references into the first table.
use super::error::CatalogError;
use crate::rules::groups::{GroupResolver, TokenSet};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const TAXONOMY_CLASSES: &str = "taxonomy-classes";
const COMPATIBLE_CLASSES: &str = "compatible-classes";

#[derive(Debug, Clone, Default)]
pub struct TaxonomyCompatibility {
    /// Resolved `compatible-classes`, in document order.
    compatible: Vec<(String, TokenSet)>,
    checked: BTreeSet<String>,
}

impl TaxonomyCompatibility {
    pub fn from_value(doc: &Value) -> Result<Self, CatalogError> {
        let empty = Map::new();
        let classes = match doc.get(TAXONOMY_CLASSES) {
            None => &empty,
            Some(Value::Object(classes)) => classes,
            Some(_) => return Err(CatalogError::Shape { key: TAXONOMY_CLASSES.into(), expected: "an object" }),
        };
        let compatible_classes = doc
            .get(COMPATIBLE_CLASSES)
            .and_then(Value::as_object)
            .ok_or(CatalogError::Shape { key: COMPATIBLE_CLASSES.into(), expected: "an object" })?;

        let mut resolver = GroupResolver::new(classes);
        let mut compatible = Vec::with_capacity(compatible_classes.len());
        let mut checked = BTreeSet::new();
        for (release, raw) in compatible_classes {
            // Anything but a list means "compatible with nothing".
            let set = if raw.is_array() { resolver.resolve(raw)? } else { TokenSet::default() };
            checked.insert(release.clone());
            if let Some(tokens) = set.tokens() {
                checked.extend(tokens.iter().map(str::to_string));
            }
            compatible.push((release.clone(), set));
        }
        tracing::debug!(releases = compatible.len(), checked = checked.len(), "loaded taxonomy compatibility");
        Ok(Self { compatible, checked })
    }

    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let doc: Value = serde_json::from_str(text).map_err(|e| CatalogError::Json(e.to_string()))?;
        Self::from_value(&doc)
    }

    pub fn compatible_with(&self, release: &str) -> Option<&TokenSet> {
        self.compatible.iter().find(|(r, _)| r == release).map(|(_, set)| set)
    }

    pub fn is_compatible(&self, release: &str, other: &str) -> bool {
        self.compatible_with(release).map_or(false, |set| set.matches(other))
    }

    /// Every release named anywhere in `compatible-classes`.
    pub fn checked_taxonomies(&self) -> &BTreeSet<String> { &self.checked }

    pub fn is_checked(&self, release: &str) -> bool { self.checked.contains(release) }
}
