//! Test-case identifier extraction.
//!
//! A raw test name such as `"#ABC-T1 does X"` or `"covers ABC-T4,ABC-T5"` is
//! scanned for tokens starting with the configured project prefix. A test
//! naming several identifiers becomes one composite [`CaseKey`] whose evidence
//! is fanned out into one report row per identifier at flush time.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::config::CollectorConfig;
use crate::errors::{CollectorError, Result};

/// Joins sub-identifiers into the primary key of a composite case.
pub const SEPARATOR: char = ',';

// =============================================================================
// EXTRACTOR
// =============================================================================

#[derive(Debug, Clone)]
pub struct IdentifierExtractor {
    pattern: Option<Regex>,
}

impl IdentifierExtractor {
    /// Builds an extractor. Without a (non-empty) project prefix the extractor
    /// never matches anything. `override_pattern` replaces `<project>\S+`.
    pub fn new(project: Option<&str>, override_pattern: Option<&str>) -> Result<Self> {
        let Some(project) = project.filter(|p| !p.is_empty()) else {
            return Ok(Self { pattern: None });
        };
        let source = match override_pattern {
            Some(p) => p.to_string(),
            None => format!(r"{}\S+", regex::escape(project)),
        };
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| CollectorError::InvalidPattern {
                pattern: source.clone(),
                source: e,
            })?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn from_config(config: &CollectorConfig) -> Result<Self> {
        Self::new(config.project.as_deref(), config.regex.as_deref())
    }

    /// Returns every identifier named in `raw`, in order of appearance.
    ///
    /// `None` means "no identifiers": no prefix configured, no name, or no match.
    /// Matched tokens containing commas are split and empty pieces dropped.
    pub fn extract(&self, raw: Option<&str>) -> Option<Vec<String>> {
        let pattern = self.pattern.as_ref()?;
        let raw = raw.filter(|r| !r.is_empty())?;
        let ids: Vec<String> = pattern
            .find_iter(raw)
            .flat_map(|m| m.as_str().split(SEPARATOR))
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            None
        } else {
            Some(ids)
        }
    }
}

// =============================================================================
// CASE KEY
// =============================================================================

/// The identity of a tracked test case: an ordered, duplicate-free set of
/// sub-identifiers plus the comma-joined primary key used for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseKey {
    primary: String,
    ids: Vec<String>,
}

impl CaseKey {
    /// Returns `None` when no non-empty identifier remains.
    pub fn new<I, S>(ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into();
            if !id.is_empty() && !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return None;
        }
        let primary = unique.join(SEPARATOR.to_string().as_str());
        Some(Self {
            primary,
            ids: unique,
        })
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_composite(&self) -> bool {
        self.ids.len() > 1
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(project: &str) -> IdentifierExtractor {
        IdentifierExtractor::new(Some(project), None).unwrap()
    }

    #[test]
    fn test_extracts_all_matches() {
        let ids = extractor("P").extract(Some("P-1 and P-2 ran"));
        assert_eq!(ids, Some(vec!["P-1".to_string(), "P-2".to_string()]));
    }

    #[test]
    fn test_hash_prefixed_name() {
        let ids = extractor("ABC").extract(Some("#ABC-T1 does X"));
        assert_eq!(ids, Some(vec!["ABC-T1".to_string()]));
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(extractor("ABC").extract(Some("TestCase1")), None);
    }

    #[test]
    fn test_missing_name_is_none() {
        assert_eq!(extractor("ABC").extract(None), None);
        assert_eq!(extractor("ABC").extract(Some("")), None);
    }

    #[test]
    fn test_missing_project_is_none() {
        let ex = IdentifierExtractor::new(None, None).unwrap();
        assert_eq!(ex.extract(Some("ABC-T1")), None);
        let ex = IdentifierExtractor::new(Some(""), None).unwrap();
        assert_eq!(ex.extract(Some("ABC-T1")), None);
    }

    #[test]
    fn test_comma_joined_token_is_split() {
        let ids = extractor("ABC").extract(Some("can add ABC-T488,ABC-T188 together"));
        assert_eq!(
            ids,
            Some(vec!["ABC-T488".to_string(), "ABC-T188".to_string()])
        );
    }

    #[test]
    fn test_trailing_comma_is_dropped() {
        let ids = extractor("ABC").extract(Some("tests ABC-T147, ABC-T148"));
        assert_eq!(
            ids,
            Some(vec!["ABC-T147".to_string(), "ABC-T148".to_string()])
        );
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let ids = extractor("ABC").extract(Some("covers abc-t9"));
        assert_eq!(ids, Some(vec!["abc-t9".to_string()]));
    }

    #[test]
    fn test_override_pattern() {
        let ex = IdentifierExtractor::new(Some("ABC"), Some(r"ABC-\d+")).unwrap();
        assert_eq!(
            ex.extract(Some("ABC-12: checks ABC-7x")),
            Some(vec!["ABC-12".to_string(), "ABC-7".to_string()])
        );
    }

    #[test]
    fn test_case_key_dedupes_and_joins() {
        let key = CaseKey::new(["P-1", "P-2", "P-1", ""]).unwrap();
        assert_eq!(key.primary(), "P-1,P-2");
        assert_eq!(key.ids(), &["P-1".to_string(), "P-2".to_string()]);
        assert!(key.is_composite());
        assert!(key.contains("P-2"));
        assert!(!key.contains("P-3"));
    }

    #[test]
    fn test_case_key_single_and_empty() {
        let key = CaseKey::new(["P-1"]).unwrap();
        assert!(!key.is_composite());
        assert_eq!(key.to_string(), "P-1");
        assert!(CaseKey::new(Vec::<String>::new()).is_none());
    }
}
