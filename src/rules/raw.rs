//! Typed view of the raw rule specification document.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Entry field names ---
pub const NAMES: &str = "xbrl-names";
pub const VALIDATION: &str = "validation";
pub const STORE_DB_NAME: &str = "store-db-name";
pub const STORE_DB_VALID_VALUES: &str = "store-db-valid-values";
pub const EFM: &str = "efm";
pub const MSG_SECTION: &str = "msgSection";
pub const SOURCE: &str = "source";
pub const SEVERITY: &str = "severity";
pub const MESSAGE: &str = "message";
pub const REFERENCES: &str = "references";
pub const REFERENCE_VALUE: &str = "reference-value";
pub const SUB_TYPES: &str = "sub-types";
pub const SUB_TYPE: &str = "sub-type";
pub const FORM_TYPES: &str = "form-types";
pub const FORM_TYPE: &str = "form-type";
pub const AXIS: &str = "axis";
pub const LANG: &str = "lang";

pub const PATTERN_SUFFIX: &str = "-pattern";
pub const WHERE_SUFFIX: &str = "where";
pub const VALUE_MAP_SUFFIX: &str = "value-map";

/// Keys that carry no rule content.
pub fn is_comment_key(key: &str) -> bool {
    key.starts_with("comment") || key.starts_with('#')
}

/// The top-level tables of a rule specification.
///
/// Maps keep document order; missing tables are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawSpec {
    #[serde(default)]
    pub sub_type_classes: Map<String, Value>,
    #[serde(default)]
    pub sub_type_element_validations: Vec<Value>,
    #[serde(default)]
    pub validations: Map<String, Value>,
    #[serde(default)]
    pub axis_validations: Map<String, Value>,
    #[serde(default)]
    pub messages: Map<String, Value>,
    /// Any other top-level keys (copyright, description, ...).
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl RawSpec {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tables_keep_document_order() {
        let spec = RawSpec::from_json_str(
            r#"{"copyright": "x", "messages": {"z": "1", "a": "2", "m": "3"}, "sub-type-element-validations": [{"comment": "c"}]}"#,
        )
        .unwrap();
        let keys: Vec<&str> = spec.messages.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(spec.sub_type_element_validations.len(), 1);
        assert!(spec.validations.is_empty());
        assert_eq!(spec.other.get("copyright"), Some(&json!("x")));
    }

    #[test]
    fn test_comment_keys() {
        assert!(is_comment_key("comment"));
        assert!(is_comment_key("comment-2"));
        assert!(is_comment_key("#"));
        assert!(!is_comment_key("xbrl-names"));
    }
}
