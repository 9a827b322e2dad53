//! Edition Capability Records
//!
//! Each rulebook edition prints its tables with different headers and
//! follows different layout conventions. Everything the extractors need to
//! know about an edition lives in one [`EditionProfile`], so a new edition
//! is a new record (or a TOML file), not new control flow.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ingestion::error::{ExtractionError, Result};

// ============================================================================
// Known Editions
// ============================================================================

/// Editions with built-in profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameEdition {
    /// Horus Heresy, first edition (WS/BS profile line)
    HorusHeresy1e,
    /// Horus Heresy, second edition (M profile line, traits column)
    HorusHeresy2e,
}

impl GameEdition {
    /// Machine-readable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HorusHeresy1e => "hh1",
            Self::HorusHeresy2e => "hh2",
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::HorusHeresy1e => "Horus Heresy (1st Edition)",
            Self::HorusHeresy2e => "Horus Heresy (2nd Edition)",
        }
    }

    /// Parse an edition from its identifier or a common alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hh1" | "hh1e" | "horus_heresy_1e" | "heresy1" => Some(Self::HorusHeresy1e),
            "hh2" | "hh2e" | "horus_heresy_2e" | "heresy2" => Some(Self::HorusHeresy2e),
            _ => None,
        }
    }

    /// The built-in capability record for this edition.
    pub fn profile(&self) -> EditionProfile {
        match self {
            Self::HorusHeresy1e => EditionProfile::horus_heresy_1e(),
            Self::HorusHeresy2e => EditionProfile::horus_heresy_2e(),
        }
    }
}

// ============================================================================
// Capability Record
// ============================================================================

/// Header lists, markers and heuristic switches for one edition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditionProfile {
    /// Display name of the edition
    pub name: String,
    /// Marker whose presence means a unit datasheet is on the page
    pub unit_profile_locator: String,
    /// Candidate characteristic header rows for unit profiles, tried in order
    pub profile_header_sets: Vec<Vec<String>>,
    /// Fixed-width weapon characteristic headers
    pub weapon_stat_headers: Vec<String>,
    /// Free-text weapon columns; the first must be present on the header row
    pub weapon_text_headers: Vec<String>,
    /// Subheadings laid out in the datasheet's two-column block
    pub datasheet_headers: Vec<String>,
    /// Page header of special rules pages
    pub special_rules_header: String,
    /// Page header of weapon profile pages
    pub armoury_header: String,
    /// Page header of wargear pages
    pub wargear_header: String,
    /// Page header of unit type pages
    pub unit_types_header: String,
    /// Special rules open with a narrative paragraph that is not rule text
    pub first_paragraph_is_flavor: bool,
    /// Table headers may be split across two lines by page art
    pub could_have_staggered_headers: bool,
    /// Weapon rows may carry combined artillery parentheticals in stat cells
    pub combined_artillery: bool,
    /// Lines shorter than this without terminal punctuation start a new rule
    pub rule_name_max_length: usize,
    /// Number of non-blank lines from the top searched for page headers
    pub header_search_lines: usize,
}

impl Default for EditionProfile {
    fn default() -> Self {
        Self::horus_heresy_2e()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl EditionProfile {
    /// First edition: WS/BS infantry line, armour-facing vehicle line,
    /// R/S/AP weapons with a single special rules column.
    pub fn horus_heresy_1e() -> Self {
        Self {
            name: GameEdition::HorusHeresy1e.display_name().to_string(),
            unit_profile_locator: "Unit Composition".to_string(),
            profile_header_sets: vec![
                strings(&["WS", "BS", "S", "T", "W", "I", "A", "Ld", "Sv"]),
                strings(&["BS", "Front", "Side", "Rear", "HP"]),
            ],
            weapon_stat_headers: strings(&["R", "S", "AP"]),
            weapon_text_headers: strings(&["Special Rules"]),
            datasheet_headers: strings(&[
                "Unit Composition",
                "Unit Type",
                "Wargear",
                "Special Rules",
                "Dedicated Transport",
            ]),
            special_rules_header: "Special Rules".to_string(),
            armoury_header: "Armoury".to_string(),
            wargear_header: "Wargear".to_string(),
            unit_types_header: "Unit Types".to_string(),
            first_paragraph_is_flavor: true,
            could_have_staggered_headers: true,
            combined_artillery: false,
            rule_name_max_length: 50,
            header_search_lines: 5,
        }
    }

    /// Second edition: movement-led infantry line with willpower stats,
    /// five weapon characteristics plus special rules and traits columns.
    pub fn horus_heresy_2e() -> Self {
        Self {
            name: GameEdition::HorusHeresy2e.display_name().to_string(),
            unit_profile_locator: "Unit Composition".to_string(),
            profile_header_sets: vec![
                strings(&[
                    "M", "WS", "BS", "S", "T", "W", "I", "A", "LD", "CL", "WP", "IN", "SAV",
                    "INV",
                ]),
                strings(&["M", "BS", "FRONT", "SIDE", "REAR", "HP", "TC"]),
            ],
            weapon_stat_headers: strings(&["R", "FP", "RS", "AP", "D"]),
            weapon_text_headers: strings(&["Special Rules", "Traits"]),
            datasheet_headers: strings(&[
                "Unit Composition",
                "Unit Type",
                "Wargear",
                "Special Rules",
                "Dedicated Transport",
            ]),
            special_rules_header: "Special Rules".to_string(),
            armoury_header: "Armoury".to_string(),
            wargear_header: "Wargear".to_string(),
            unit_types_header: "Unit Types".to_string(),
            first_paragraph_is_flavor: false,
            could_have_staggered_headers: false,
            combined_artillery: true,
            rule_name_max_length: 50,
            header_search_lines: 5,
        }
    }

    /// Load an edition record from a TOML file. Missing fields take the
    /// second edition defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse an edition record from TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let profile: EditionProfile = toml::from_str(contents)?;
        if profile.weapon_stat_headers.is_empty() || profile.profile_header_sets.is_empty() {
            return Err(ExtractionError::UnknownEdition(format!(
                "{}: edition record must name weapon and profile headers",
                profile.name
            )));
        }
        Ok(profile)
    }

    /// Resolve an edition by identifier.
    pub fn for_id(id: &str) -> Result<Self> {
        GameEdition::parse(id)
            .map(|e| e.profile())
            .ok_or_else(|| ExtractionError::UnknownEdition(id.to_string()))
    }

    /// Datasheet headers as string slices.
    pub fn datasheet_header_refs(&self) -> Vec<&str> {
        self.datasheet_headers.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edition_parse() {
        assert_eq!(GameEdition::parse("HH1"), Some(GameEdition::HorusHeresy1e));
        assert_eq!(GameEdition::parse("horus_heresy_2e"), Some(GameEdition::HorusHeresy2e));
        assert_eq!(GameEdition::parse("40k"), None);
    }

    #[test]
    fn test_profiles_differ_in_conventions() {
        let first = EditionProfile::horus_heresy_1e();
        let second = EditionProfile::horus_heresy_2e();

        assert!(first.first_paragraph_is_flavor);
        assert!(!second.first_paragraph_is_flavor);
        assert!(second.combined_artillery);
        assert_eq!(first.weapon_stat_headers, vec!["R", "S", "AP"]);
        assert_eq!(second.weapon_text_headers.len(), 2);
    }

    #[test]
    fn test_for_id_unknown() {
        assert!(matches!(
            EditionProfile::for_id("necromunda"),
            Err(ExtractionError::UnknownEdition(_))
        ));
    }

    #[test]
    fn test_from_toml_overrides_defaults() {
        let toml = r#"
            name = "House Rules"
            weapon_stat_headers = ["Range", "Str", "AP"]
            weapon_text_headers = ["Type"]
            first_paragraph_is_flavor = true
        "#;
        let profile = EditionProfile::from_toml_str(toml).unwrap();
        assert_eq!(profile.name, "House Rules");
        assert_eq!(profile.weapon_stat_headers, vec!["Range", "Str", "AP"]);
        assert!(profile.first_paragraph_is_flavor);
        assert_eq!(profile.unit_profile_locator, "Unit Composition");
    }

    #[test]
    fn test_from_toml_rejects_empty_headers() {
        let toml = "weapon_stat_headers = []";
        assert!(EditionProfile::from_toml_str(toml).is_err());
    }
}
