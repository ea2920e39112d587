//! Versioned lookup tables for the recommendation pipeline.
//!
//! The default tables in `rules/default.toml` are baked into the binary at
//! compile time via [`include_str!`]. A file with the same schema can be
//! loaded at runtime with [`Rules::from_path`] to retune the heuristics
//! without a rebuild.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use serde::Deserialize;

const DEFAULT_RULES_TOML: &str = include_str!("../rules/default.toml");

static EMBEDDED: LazyLock<Rules> = LazyLock::new(|| {
    Rules::parse(DEFAULT_RULES_TOML).unwrap_or_else(|e| panic!("Failed to parse default.toml: {e}"))
});

/// Errors loading a rules file.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or does not match the schema.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// All rule tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rules {
    /// Table version, bumped on every change.
    pub version: u32,
    /// Candidate filter tables.
    pub filter: FilterRules,
    /// Preference mappings.
    #[serde(default)]
    pub preferences: Vec<PreferenceRule>,
}

/// Tables used by the candidate filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterRules {
    /// Categories that disqualify a place outright.
    pub excluded_categories: BTreeSet<String>,
    /// Library privacy heuristic.
    pub library: LibraryRules,
}

/// Keyword lists for telling public libraries from restricted ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LibraryRules {
    /// Category that triggers the heuristic.
    pub category: String,
    /// Lower-case name fragments suggesting restricted access.
    pub private_keywords: Vec<String>,
    /// Lower-case name fragments suggesting a public library.
    pub public_keywords: Vec<String>,
}

/// How a user preference maps onto a vendor search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreferenceRule {
    /// Preference name as sent by clients.
    pub name: String,
    /// Vendor category to search.
    pub category: String,
    /// Optional disambiguating keyword.
    #[serde(default)]
    pub keyword: Option<String>,
}

impl Rules {
    /// The tables compiled into the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `default.toml` is malformed. The file is
    /// checked by this crate's tests.
    #[must_use]
    pub fn embedded() -> &'static Self {
        &EMBEDDED
    }

    /// Parses rule tables from a TOML string.
    ///
    /// Keywords are lower-cased so they can be matched against lower-cased
    /// place names.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Toml`] if the string does not match the schema.
    pub fn parse(toml_str: &str) -> Result<Self, RulesError> {
        let mut rules: Self = toml::de::from_str(toml_str)?;
        for keyword in rules
            .filter
            .library
            .private_keywords
            .iter_mut()
            .chain(rules.filter.library.public_keywords.iter_mut())
        {
            *keyword = keyword.to_lowercase();
        }
        Ok(rules)
    }

    /// Loads rule tables from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError`] if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&contents)
    }

    /// Resolves a preference name to its search mapping.
    ///
    /// Unknown preferences search the category of the same name with no
    /// keyword.
    #[must_use]
    pub fn preference(&self, name: &str) -> PreferenceRule {
        self.preferences
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .unwrap_or_else(|| PreferenceRule {
                name: name.to_string(),
                category: name.to_string(),
                keyword: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_rules_parse() {
        let rules = Rules::embedded();
        assert!(rules.version >= 1);
        assert_eq!(rules.filter.excluded_categories.len(), 18);
        assert!(rules.filter.excluded_categories.contains("supermarket"));
        assert_eq!(rules.filter.library.category, "library");
        assert!(rules.filter.library.private_keywords.contains(&"center for".to_string()));
        assert_eq!(rules.filter.library.public_keywords.len(), 3);
    }

    #[test]
    fn resolves_known_preferences() {
        let rules = Rules::embedded();

        let cafe = rules.preference("cafe");
        assert_eq!(cafe.category, "cafe");
        assert_eq!(cafe.keyword.as_deref(), Some("coffee shop"));

        let pops = rules.preference("pops");
        assert_eq!(pops.category, "park");
        assert_eq!(pops.keyword.as_deref(), Some("public plaza"));
    }

    #[test]
    fn unknown_preference_searches_its_own_name() {
        let museum = Rules::embedded().preference("museum");
        assert_eq!(museum.category, "museum");
        assert_eq!(museum.name, "museum");
        assert!(museum.keyword.is_none());
    }

    #[test]
    fn lowercases_keywords_from_overrides() {
        let rules = Rules::parse(
            r#"
            version = 7

            [filter]
            excluded_categories = ["bar"]

            [filter.library]
            category = "library"
            private_keywords = ["Seminary"]
            public_keywords = ["Free Library"]
            "#,
        )
        .unwrap();

        assert_eq!(rules.version, 7);
        assert!(rules.preferences.is_empty());
        assert_eq!(rules.filter.library.private_keywords, vec!["seminary"]);
        assert_eq!(rules.filter.library.public_keywords, vec!["free library"]);
    }

    #[test]
    fn rejects_rules_missing_tables() {
        assert!(matches!(Rules::parse("version = 1"), Err(RulesError::Toml(_))));
    }
}
