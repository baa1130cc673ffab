//! Detection of custom axes that impersonate standard ones.
use super::error::CatalogError;
use regex::Regex;
use serde_json::Value;

/// Keys of the catalog document that carry no pattern.
const SKIPPED_KEYS: &[&str] = &["#", "copyright", "description"];

/// Standard axes with the custom-name patterns that imitate them.
///
/// All patterns compile into one alternation whose named groups map 1:1 to
/// the standard axes, so classifying a name is a single regex pass.
#[derive(Debug, Clone, Default)]
pub struct AxisReplacementCatalog {
    /// (capture group name, standard axis) in document order.
    standard_axes: Vec<(String, String)>,
    custom_names: Option<Regex>,
}

impl AxisReplacementCatalog {
    /// Builds the catalog from an object of `standard axis -> custom-name pattern`.
    pub fn from_value(doc: &Value) -> Result<Self, CatalogError> {
        let entries = doc
            .as_object()
            .ok_or(CatalogError::Shape { key: "axis replacements".into(), expected: "an object" })?;

        let mut standard_axes = Vec::new();
        let mut alternatives = Vec::new();
        for (axis, pattern) in entries {
            if SKIPPED_KEYS.contains(&axis.as_str()) {
                continue;
            }
            let pattern = pattern
                .as_str()
                .ok_or_else(|| CatalogError::Shape { key: axis.clone(), expected: "a pattern string" })?;
            // Each alternative must compile on its own so errors name the axis.
            Regex::new(pattern).map_err(|e| CatalogError::Pattern { key: axis.clone(), reason: e.to_string() })?;

            let group = format!("_{}", standard_axes.len());
            alternatives.push(format!("(?P<{}>^(?:{})$)", group, pattern));
            standard_axes.push((group, axis.clone()));
        }

        let custom_names = if alternatives.is_empty() {
            None
        } else {
            let joined = alternatives.join("|");
            Some(Regex::new(&joined).map_err(|e| CatalogError::Pattern { key: "axis replacements".into(), reason: e.to_string() })?)
        };
        Ok(Self { standard_axes, custom_names })
    }

    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let doc: Value = serde_json::from_str(text).map_err(|e| CatalogError::Json(e.to_string()))?;
        Self::from_value(&doc)
    }

    pub fn len(&self) -> usize { self.standard_axes.len() }
    pub fn is_empty(&self) -> bool { self.standard_axes.is_empty() }

    /// The standard axis a custom axis local name imitates, if any.
    pub fn classify(&self, custom_axis: &str) -> Option<&str> {
        let caps = self.custom_names.as_ref()?.captures(custom_axis)?;
        self.standard_axes
            .iter()
            .find(|(group, _)| caps.name(group).is_some())
            .map(|(_, axis)| axis.as_str())
    }
}
