//! Selection of the newest release of a taxonomy family.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Release year used when no registry is available.
const FALLBACK_YEAR: &str = "2024";

/// One release of a taxonomy family as listed by a disclosure system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyDescriptor {
    pub family: String,
    pub namespace: String,
    pub href: String,
    #[serde(default)]
    pub version: String,
}

impl FamilyDescriptor {
    /// The family segment of the namespace, e.g. `dei` for `http://xbrl.sec.gov/dei/2024`.
    pub fn short_name(&self) -> Option<&str> {
        self.namespace.trim_end_matches('/').rsplit('/').nth(1)
    }

    fn fallback(name: &str) -> Self {
        let family = name.to_lowercase();
        Self {
            namespace: format!("http://xbrl.sec.gov/{}/{}", family, FALLBACK_YEAR),
            href: format!("https://xbrl.sec.gov/{0}/{1}/{0}-{1}.xsd", family, FALLBACK_YEAR),
            version: FALLBACK_YEAR.to_string(),
            family,
        }
    }
}

/// Compares versions segment by segment as numbers (`2023-01-31` < `2024`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    fn segments(v: &str) -> Vec<u64> {
        v.split(|c: char| !c.is_ascii_digit())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect()
    }
    segments(a).cmp(&segments(b)).then_with(|| a.cmp(b))
}

/// Releases per family name, as the disclosure system lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyRegistry {
    families: HashMap<String, Vec<FamilyDescriptor>>,
}

impl FamilyRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn add(&mut self, name: impl Into<String>, descriptor: FamilyDescriptor) {
        self.families.entry(name.into()).or_default().push(descriptor);
    }

    pub fn releases(&self, name: &str) -> &[FamilyDescriptor] {
        self.families.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// The newest release of `name`.
///
/// Only releases whose namespace short name equals the lower-cased family
/// name qualify; of equal versions the first listed wins. Without a registry
/// a descriptor for the fallback release is synthesized.
pub fn latest_family(name: &str, registry: Option<&FamilyRegistry>) -> Option<FamilyDescriptor> {
    let Some(registry) = registry else {
        return Some(FamilyDescriptor::fallback(name));
    };
    let wanted = name.to_lowercase();
    let mut latest: Option<&FamilyDescriptor> = None;
    for release in registry.releases(name) {
        if release.short_name() != Some(wanted.as_str()) {
            continue;
        }
        match latest {
            Some(held) if compare_versions(&release.version, &held.version) != Ordering::Greater => {}
            _ => latest = Some(release),
        }
    }
    latest.cloned()
}
