//! Category catalog for trend scanning
//!
//! The catalog maps categories to ordered search terms and to the stock
//! symbols used to annotate alerts. It is a validated data document loaded
//! from TOML, never a source literal; the shipped default lives in
//! `catalog.toml` at the crate root and is embedded at compile time.
//!
//! Term order inside a category is scan order. Symbols are annotation only
//! and play no part in detection.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CatalogError;

/// A stock symbol related to a category, used to annotate alerts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedSymbol {
    /// Ticker symbol (e.g. "IONQ")
    pub ticker: String,

    /// Human-readable description of the company's angle on the category
    pub description: String,
}

/// One scannable category: a name, ordered search terms, related symbols
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Display name, unique within the catalog
    pub name: String,

    /// Search terms in scan order
    pub terms: Vec<String>,

    /// Symbols attached to alerts for this category
    #[serde(default)]
    pub symbols: Vec<RelatedSymbol>,
}

impl Category {
    /// Number of search terms in this category
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

/// The full scan catalog, categories in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Categories in scan order
    pub categories: Vec<Category>,
}

/// The catalog shipped with the binary
const BUILTIN_CATALOG: &str = include_str!("../../catalog.toml");

impl Catalog {
    /// Parse and validate a catalog from TOML text
    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let catalog: Self = toml::from_str(text)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load and validate a catalog from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// The catalog embedded in the binary
    pub fn builtin() -> Self {
        // The shipped catalog is validated by tests; a broken one is a
        // packaging defect, not a runtime condition.
        Self::from_toml(BUILTIN_CATALOG).expect("builtin catalog must be valid")
    }

    /// Validate structural invariants
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.categories.is_empty() {
            return Err(CatalogError::Invalid("catalog has no categories".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(CatalogError::Invalid("category with empty name".into()));
            }

            if !seen.insert(category.name.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate category name: {}",
                    category.name
                )));
            }

            if category.terms.is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "category '{}' has no search terms",
                    category.name
                )));
            }

            if category.terms.iter().any(|t| t.trim().is_empty()) {
                return Err(CatalogError::Invalid(format!(
                    "category '{}' has an empty search term",
                    category.name
                )));
            }

            if category.symbols.iter().any(|s| s.ticker.trim().is_empty()) {
                return Err(CatalogError::Invalid(format!(
                    "category '{}' has a symbol with an empty ticker",
                    category.name
                )));
            }
        }

        Ok(())
    }

    /// Look up a category by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total number of search terms across all categories
    pub fn total_terms(&self) -> usize {
        self.categories.iter().map(Category::term_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[categories]]
name = "Quantum Computing"
terms = ["quantum computing", "quantum processor"]

[[categories.symbols]]
ticker = "IONQ"
description = "Trapped Ion Technology"

[[categories]]
name = "Edge Computing"
terms = ["edge computing"]
"#;

    #[test]
    fn test_parse_sample() {
        let catalog = Catalog::from_toml(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.total_terms(), 3);

        let quantum = &catalog.categories[0];
        assert_eq!(quantum.name, "Quantum Computing");
        assert_eq!(quantum.terms[0], "quantum computing");
        assert_eq!(quantum.symbols[0].ticker, "IONQ");

        // Symbols are optional
        assert!(catalog.categories[1].symbols.is_empty());
    }

    #[test]
    fn test_term_order_preserved() {
        let catalog = Catalog::from_toml(SAMPLE).unwrap();
        let terms = &catalog.categories[0].terms;
        assert_eq!(terms, &["quantum computing", "quantum processor"]);
    }

    #[test]
    fn test_find_case_insensitive() {
        let catalog = Catalog::from_toml(SAMPLE).unwrap();
        assert!(catalog.find("quantum computing").is_some());
        assert!(catalog.find("Unknown").is_none());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let err = Catalog::from_toml("categories = []").unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let toml = r#"
[[categories]]
name = "Web3"
terms = ["web3"]

[[categories]]
name = "Web3"
terms = ["blockchain"]
"#;
        let err = Catalog::from_toml(toml).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }

    #[test]
    fn test_category_without_terms_rejected() {
        let toml = r#"
[[categories]]
name = "Empty"
terms = []
"#;
        assert!(Catalog::from_toml(toml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let catalog = Catalog::from_file(&path).unwrap();
        assert_eq!(catalog.len(), 2);

        let missing = Catalog::from_file(dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(CatalogError::Io(_))));
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        assert!(!catalog.is_empty());
        assert!(catalog.validate().is_ok());
        assert!(catalog.total_terms() >= catalog.len());
    }
}
