//! Derived cache files and the lookups built on them.
//!
//! Cache files are compact JSON with keys sorted at every level, so the same
//! data always produces the same bytes. They are written once through a
//! temporary file in the target directory and renamed into place.
use super::error::CacheError;
use super::namespace::{abbreviated_namespace, Abbreviation};
use crate::facts::ConceptId;
use crate::rules::value_pattern::parse_date;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DEPRECATED_CONCEPTS_SUFFIX: &str = "-deprecated-concepts.json";

/// Returns `value` with every object's keys in sorted order.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

pub fn write_sorted_json(path: &Path, value: &Value) -> Result<(), CacheError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, &sort_keys(value.clone()))?;
        writer.flush()?;
    }
    tmp.persist(path)?;
    tracing::debug!(path = %path.display(), "wrote cache file");
    Ok(())
}

/// Reads a cache file; a missing file is `Ok(None)`.
pub fn read_json_cache(path: &Path) -> Result<Option<Value>, CacheError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Deprecation dates of standard concepts, from per-family cache files.
#[derive(Debug, Clone, Default)]
pub struct DeprecationCatalog {
    dates: HashMap<ConceptId, NaiveDate>,
}

impl DeprecationCatalog {
    /// Name of the cache file for an abbreviated namespace (`us-gaap/2024` or `us-gaap/*`).
    pub fn file_name(abbreviated: &str) -> String {
        let family = abbreviated.split('/').next().unwrap_or(abbreviated);
        format!("{}{}", family, DEPRECATED_CONCEPTS_SUFFIX)
    }

    /// Loads the cache file of each standard namespace in `namespaces`.
    ///
    /// Files that are missing or unreadable are skipped with a warning, as are
    /// entries whose date does not parse.
    pub fn load<'n>(resources_dir: &Path, namespaces: impl IntoIterator<Item = &'n str>) -> Self {
        let mut catalog = Self::default();
        let mut files: HashMap<PathBuf, Option<Map<String, Value>>> = HashMap::new();
        for namespace in namespaces {
            let Some(abbreviated) = abbreviated_namespace(namespace, Abbreviation::Wild) else {
                continue;
            };
            let path = resources_dir.join(Self::file_name(&abbreviated));
            let entries = files.entry(path).or_insert_with_key(|path| match read_json_cache(path) {
                Ok(Some(Value::Object(entries))) => Some(entries),
                Ok(Some(_)) => {
                    tracing::warn!(path = %path.display(), "deprecated concepts file is not an object");
                    None
                }
                Ok(None) => None,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "could not load deprecated concepts");
                    None
                }
            });
            for (local_name, date) in entries.iter().flatten() {
                match date.as_str().map(parse_date) {
                    Some(Ok(date)) => {
                        catalog.dates.insert(ConceptId::new(namespace, local_name.as_str()), date);
                    }
                    _ => tracing::warn!(%local_name, %date, "unreadable deprecation date"),
                }
            }
        }
        tracing::debug!(concepts = catalog.dates.len(), "loaded deprecation dates");
        catalog
    }

    pub fn insert(&mut self, concept: ConceptId, date: NaiveDate) {
        self.dates.insert(concept, date);
    }

    pub fn deprecation_date(&self, concept: &ConceptId) -> Option<NaiveDate> {
        self.dates.get(concept).copied()
    }

    pub fn len(&self) -> usize { self.dates.len() }
    pub fn is_empty(&self) -> bool { self.dates.is_empty() }
}
