//! Candidate filter.
//!
//! Two stages, both driven by [`FilterRules`]:
//!
//! 1. A place tagged with any excluded category is rejected, whatever else
//!    it is tagged with.
//! 2. A library whose lower-cased name contains a private keyword and no
//!    public keyword is rejected. A public keyword always wins.

use crate::rules::FilterRules;

/// Outcome of filtering one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    /// The candidate may be recommended.
    Keep,
    /// Rejected for carrying an excluded category.
    ExcludedCategory(String),
    /// Rejected as a likely restricted library.
    PrivateLibrary {
        /// The private keyword that matched.
        keyword: String,
    },
}

impl FilterVerdict {
    /// Whether the candidate survives.
    #[must_use]
    pub const fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// Evaluates a candidate with display `name` and vendor `categories`.
#[must_use]
pub fn evaluate(rules: &FilterRules, name: &str, categories: &[String]) -> FilterVerdict {
    if let Some(excluded) = categories
        .iter()
        .find(|c| rules.excluded_categories.contains(c.as_str()))
    {
        return FilterVerdict::ExcludedCategory(excluded.clone());
    }

    let library = &rules.library;
    if !categories.iter().any(|c| *c == library.category) {
        return FilterVerdict::Keep;
    }

    let name = name.to_lowercase();
    let Some(private) = library
        .private_keywords
        .iter()
        .find(|k| name.contains(k.as_str()))
    else {
        return FilterVerdict::Keep;
    };

    if library
        .public_keywords
        .iter()
        .any(|k| name.contains(k.as_str()))
    {
        return FilterVerdict::Keep;
    }

    FilterVerdict::PrivateLibrary {
        keyword: private.clone(),
    }
}

/// Whether a candidate survives the filter.
#[must_use]
pub fn passes(rules: &FilterRules, name: &str, categories: &[String]) -> bool {
    evaluate(rules, name, categories).is_keep()
}
