//! Run configuration for one validation pass.
use crate::rules::{CompileContext, ConceptModel, SourceMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Which filing documents the run validates.
    pub source_mode: SourceMode,
    /// Compile an exhibit-type-specific rule file.
    pub exhibit_specific: bool,
    /// Where derived cache files live.
    pub resources_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&text)
    }

    /// Path of a resource file, if a resources directory is configured.
    pub fn resource_path(&self, name: &str) -> Option<PathBuf> {
        self.resources_dir.as_ref().map(|dir| dir.join(name))
    }

    pub fn compile_context<'a>(&self, concepts: &'a dyn ConceptModel) -> CompileContext<'a> {
        CompileContext::new(self.source_mode, concepts).exhibit_specific(self.exhibit_specific)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.source_mode, SourceMode::Both);
        assert_eq!(config.resource_path("axiswarnings.json"), None);
    }

    #[test]
    fn test_kebab_case_keys() {
        let config = EngineConfig::from_json_str(
            r#"{"source-mode": "non-inline", "exhibit-specific": true, "resources-dir": "/srv/resources"}"#,
        )
        .unwrap();
        assert_eq!(config.source_mode, SourceMode::NonInline);
        assert_eq!(config.resource_path("a.json"), Some(PathBuf::from("/srv/resources/a.json")));

        let concepts: HashSet<String> = HashSet::new();
        let ctx = config.compile_context(&concepts);
        assert_eq!(ctx.mode, SourceMode::NonInline);
        assert!(ctx.exhibit_specific);
    }

    #[test]
    fn test_rejects_unknown_keys_and_modes() {
        assert!(matches!(EngineConfig::from_json_str(r#"{"sourceMode": "inline"}"#), Err(ConfigError::Json(_))));
        assert!(EngineConfig::from_json_str(r#"{"source-mode": "paper"}"#).is_err());
    }

    #[test]
    fn test_from_path() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"source-mode": "inline"}"#).unwrap();
        assert_eq!(EngineConfig::from_path(file.path()).unwrap().source_mode, SourceMode::Inline);
        assert!(matches!(
            EngineConfig::from_path(Path::new("/nonexistent/engine.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
