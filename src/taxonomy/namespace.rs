//! Short keys for standard taxonomy namespaces.
//!
//! Derived caches and compatibility tables are keyed by an abbreviated
//! namespace such as `us-gaap/2024` or `dei/*` rather than the full URI.
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static STANDARD_NAMESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^http://(?:xbrl\.us|fasb\.org|xbrl\.sec\.gov)/",
        r"(?P<family>dei|us-gaap|srt|us-types|us-roles|rr|country|currency|exch|invest|naics|sic|stpr|rxp|spac|cyd|ecd|fnd|oef|vip|sro|snj|cef|sbs|ffd)",
        r"/(?P<year>[0-9]{4})(?:-[0-9]{2}-[0-9]{2})?$",
        r"|^https?://xbrl\.ifrs\.org/taxonomy/(?P<ifrs_year>[0-9]{4})-[0-9]{2}-[0-9]{2}/(?P<ifrs_family>ifrs[\w-]*)$",
    ))
    .expect("standard namespace pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abbreviation {
    /// `<family>/<year>`
    WithYear,
    /// `<family>/*`
    Wild,
    /// `<family>`
    NoYear,
}

/// The family and year of a standard taxonomy namespace.
pub fn family_year(namespace: &str) -> Option<(&str, &str)> {
    let caps = STANDARD_NAMESPACE.captures(namespace)?;
    let family = caps.name("family").or_else(|| caps.name("ifrs_family"))?;
    let year = caps.name("year").or_else(|| caps.name("ifrs_year"))?;
    Some((family.as_str(), year.as_str()))
}

pub fn abbreviated_namespace(namespace: &str, form: Abbreviation) -> Option<String> {
    let (family, year) = family_year(namespace)?;
    Some(match form {
        Abbreviation::WithYear => format!("{}/{}", family, year),
        Abbreviation::Wild => format!("{}/*", family),
        Abbreviation::NoYear => family.to_string(),
    })
}

/// Namespaces in one conflict class must not be mixed in a filing.
///
/// Every IFRS family (`ifrs-full`, `ifrs-smes`, ...) shares the class `ifrs`.
pub fn conflict_class(namespace: &str) -> Option<String> {
    let (family, year) = family_year(namespace)?;
    let class = if family.starts_with("ifrs") { "ifrs" } else { family };
    Some(format!("{}/{}", class, year))
}

/// The last two labels of a URL's host, or the namespace identifier of a URN.
pub fn effective_authority(uri: &str) -> Option<String> {
    if uri.get(..4).map_or(false, |scheme| scheme.eq_ignore_ascii_case("urn:")) {
        return uri.split(':').nth(1).map(str::to_string);
    }
    let url = Url::parse(uri).ok()?;
    let host = url.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    let start = labels.len().saturating_sub(2);
    Some(labels[start..].join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://fasb.org/us-gaap/2024", Abbreviation::WithYear, Some("us-gaap/2024"))]
    #[case("http://fasb.org/us-gaap/2024", Abbreviation::Wild, Some("us-gaap/*"))]
    #[case("http://xbrl.sec.gov/dei/2023", Abbreviation::NoYear, Some("dei"))]
    #[case("http://xbrl.sec.gov/ecd/2023-01-31", Abbreviation::WithYear, Some("ecd/2023"))]
    #[case("https://xbrl.ifrs.org/taxonomy/2024-03-27/ifrs-full", Abbreviation::WithYear, Some("ifrs-full/2024"))]
    #[case("http://www.example.com/20241231", Abbreviation::WithYear, None)]
    #[case("http://fasb.org/us-gaap/2024/extra", Abbreviation::Wild, None)]
    fn test_abbreviated_namespace(#[case] ns: &str, #[case] form: Abbreviation, #[case] expected: Option<&str>) {
        assert_eq!(abbreviated_namespace(ns, form).as_deref(), expected);
    }

    #[rstest]
    #[case("https://xbrl.ifrs.org/taxonomy/2023-03-23/ifrs-smes", Some("ifrs/2023"))]
    #[case("http://fasb.org/srt/2022", Some("srt/2022"))]
    #[case("http://example.com/x", None)]
    fn test_conflict_class(#[case] ns: &str, #[case] expected: Option<&str>) {
        assert_eq!(conflict_class(ns).as_deref(), expected);
    }

    #[rstest]
    #[case("http://www.sec.gov/Archives/edgar", Some("sec.gov"))]
    #[case("https://xbrl.fasb.org/us-gaap/2024/elts", Some("fasb.org"))]
    #[case("http://localhost:8080/x", Some("localhost"))]
    #[case("urn:isbn:0451450523", Some("isbn"))]
    #[case("URN:lei:abc", Some("lei"))]
    #[case("not a uri", None)]
    fn test_effective_authority(#[case] uri: &str, #[case] expected: Option<&str>) {
        assert_eq!(effective_authority(uri).as_deref(), expected);
    }
}
