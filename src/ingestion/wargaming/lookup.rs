//! Lookup Context
//!
//! Name → catalogue ID maps for special rules, wargear and categories. The
//! context is constructed by the caller and passed into the pipeline, so
//! tests can run against different fixture systems side by side.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ingestion::error::Result;

/// Minimum normalised Levenshtein similarity for a fuzzy match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.9;

/// Catalogue name → ID tables used to resolve extracted names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupContext {
    pub rules: IndexMap<String, String>,
    pub wargear: IndexMap<String, String>,
    pub categories: IndexMap<String, String>,
}

impl LookupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.rules.insert(name.into(), id.into());
        self
    }

    pub fn with_wargear(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.wargear.insert(name.into(), id.into());
        self
    }

    pub fn with_category(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.categories.insert(name.into(), id.into());
        self
    }

    /// Load a context from a JSON file with `rules`, `wargear` and
    /// `categories` objects.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Whether the context has no entries at all. An empty context
    /// resolves nothing and reports nothing.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.wargear.is_empty() && self.categories.is_empty()
    }

    pub fn resolve_rule(&self, name: &str) -> Option<&str> {
        resolve(&self.rules, name)
    }

    pub fn resolve_wargear(&self, name: &str) -> Option<&str> {
        resolve(&self.wargear, name)
    }

    pub fn resolve_category(&self, name: &str) -> Option<&str> {
        resolve(&self.categories, name)
    }
}

/// Exact match, then case-insensitive, then the closest name above the
/// fuzzy threshold.
fn resolve<'a>(table: &'a IndexMap<String, String>, name: &str) -> Option<&'a str> {
    let name = name.trim();
    if let Some(id) = table.get(name) {
        return Some(id.as_str());
    }

    let lowered = name.to_lowercase();
    if let Some((_, id)) = table.iter().find(|(k, _)| k.to_lowercase() == lowered) {
        return Some(id.as_str());
    }

    table
        .iter()
        .map(|(k, id)| (strsim::normalized_levenshtein(&k.to_lowercase(), &lowered), id))
        .filter(|(score, _)| *score >= FUZZY_MATCH_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, id)| id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> LookupContext {
        LookupContext::new()
            .with_rule("Legiones Astartes", "rule-1")
            .with_rule("Relentless", "rule-2")
            .with_wargear("Bolter", "wg-1")
            .with_category("Infantry", "cat-1")
    }

    #[test]
    fn test_resolve_exact_and_case_insensitive() {
        let ctx = context();
        assert_eq!(ctx.resolve_rule("Relentless"), Some("rule-2"));
        assert_eq!(ctx.resolve_rule("relentless"), Some("rule-2"));
        assert_eq!(ctx.resolve_category("INFANTRY"), Some("cat-1"));
    }

    #[test]
    fn test_resolve_fuzzy() {
        let ctx = context();
        // Stray punctuation and a dropped letter
        assert_eq!(ctx.resolve_rule("Legiones Astartes."), Some("rule-1"));
        assert_eq!(ctx.resolve_rule("Legions Astartes"), Some("rule-1"));
        assert_eq!(ctx.resolve_wargear("Plasma gun"), None);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"rules": {"Fear": "r-9"}, "wargear": {}}"#;
        let ctx = LookupContext::from_json_str(json).unwrap();
        assert_eq!(ctx.resolve_rule("Fear"), Some("r-9"));
        assert!(ctx.categories.is_empty());
        assert!(!ctx.is_empty());
        assert!(LookupContext::new().is_empty());
    }
}
