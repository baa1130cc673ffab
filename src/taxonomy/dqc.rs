//! Selection of the DQC rule set for us-gaap filings.
use super::cache::read_json_cache;
use super::error::CacheError;
use super::namespace::family_year;
use crate::facts::FactSet;
use serde_json::{Map, Value};
use std::path::Path;

pub const DQC_RULES_FILE: &str = "dqc-us-rules.json";
/// Key added to the loaded rules naming the constants file for the release.
pub const CONSTANTS_FILE_KEY: &str = "XULE-constants-file";
const CONSTANTS_DIR: &str = "xule";
/// First us-gaap release the DQC rules cover.
pub const FIRST_DQC_YEAR: u16 = 2020;
/// Constants files start with this release; earlier releases share it.
const FIRST_CONSTANTS_YEAR: u16 = 2023;

/// Fact counts per competing base taxonomy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxonomyUsage {
    pub us_gaap_facts: usize,
    pub ifrs_facts: usize,
}

impl TaxonomyUsage {
    pub fn count(facts: &FactSet) -> Self {
        facts.iter().fold(Self::default(), |mut usage, fact| {
            let namespace = fact.concept.namespace.as_str();
            if namespace.contains("us-gaap") {
                usage.us_gaap_facts += 1;
            }
            if namespace.contains("ifrs") {
                usage.ifrs_facts += 1;
            }
            usage
        })
    }

    /// A filing is treated as us-gaap when most of its facts are, or when it
    /// uses neither taxonomy.
    pub fn is_us_gaap(&self) -> bool {
        (self.us_gaap_facts == 0 && self.ifrs_facts == 0) || self.us_gaap_facts > self.ifrs_facts
    }
}

/// Release year of the first us-gaap namespace among `namespaces`.
pub fn us_gaap_year<'n>(namespaces: impl IntoIterator<Item = &'n str>) -> Option<u16> {
    namespaces.into_iter().find_map(|namespace| match family_year(namespace)? {
        ("us-gaap", year) => year.parse().ok(),
        _ => None,
    })
}

pub fn applies_dqc_rules(us_gaap_year: u16, usage: &TaxonomyUsage) -> bool {
    us_gaap_year >= FIRST_DQC_YEAR && usage.is_us_gaap()
}

pub fn constants_file_name(us_gaap_year: u16) -> String {
    format!("dqcrt-us-{}-constants.json", us_gaap_year.max(FIRST_CONSTANTS_YEAR))
}

/// Loads the DQC rules when they apply to the filing.
///
/// Returns `Ok(None)` for filings outside DQC coverage and when the rules file
/// is absent. Rule order follows the file.
pub fn load_dqc_rules<'n>(
    resources_dir: &Path,
    namespaces: impl IntoIterator<Item = &'n str>,
    facts: &FactSet,
) -> Result<Option<Map<String, Value>>, CacheError> {
    let Some(year) = us_gaap_year(namespaces) else {
        return Ok(None);
    };
    let usage = TaxonomyUsage::count(facts);
    if !applies_dqc_rules(year, &usage) {
        tracing::debug!(year, ?usage, "DQC rules do not apply");
        return Ok(None);
    }

    let path = resources_dir.join(DQC_RULES_FILE);
    match read_json_cache(&path)? {
        Some(Value::Object(mut rules)) => {
            let constants = resources_dir.join(CONSTANTS_DIR).join(constants_file_name(year));
            rules.insert(CONSTANTS_FILE_KEY.to_string(), Value::String(constants.to_string_lossy().into_owned()));
            Ok(Some(rules))
        }
        Some(_) => Err(CacheError::NotAnObject { path }),
        None => {
            tracing::warn!(path = %path.display(), "DQC rules file is missing");
            Ok(None)
        }
    }
}
