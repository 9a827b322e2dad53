//! Structured records emitted by the extractors.
//!
//! These are the shapes handed to the catalogue consumer: units with their
//! model profiles and options, weapon profiles, and FAQ entries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ingestion::error::{ExtractionError, Result};

/// Ordered characteristic name → value map.
pub type Characteristics = IndexMap<String, String>;

// ============================================================================
// Profiles
// ============================================================================

/// A named profile whose characteristic keys match the header list used to parse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProfile {
    pub name: String,
    pub characteristics: Characteristics,
}

impl RawProfile {
    /// Pair `headers` with `values`.
    ///
    /// # Errors
    /// [`ExtractionError::ProfileMismatch`] when the counts differ; a short
    /// or long row is never truncated to fit.
    pub fn from_cells(name: impl Into<String>, headers: &[String], values: &[String]) -> Result<Self> {
        let name = name.into();
        if headers.len() != values.len() {
            return Err(ExtractionError::ProfileMismatch {
                name,
                expected: headers.len(),
                found: values.len(),
            });
        }
        let characteristics = headers
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect();
        Ok(Self {
            name,
            characteristics,
        })
    }
}

/// A model line of a unit: its profile plus selection bounds and gear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawModel {
    #[serde(flatten)]
    pub profile: RawProfile,
    pub min: u32,
    pub max: u32,
    pub unit_type: Option<String>,
    pub default_wargear: Vec<String>,
    pub option_groups: Vec<OptionGroup>,
    /// Points per model beyond the base composition
    pub additional_model_cost: Option<u32>,
}

impl RawModel {
    pub fn new(profile: RawProfile) -> Self {
        Self {
            profile,
            min: 1,
            max: 1,
            unit_type: None,
            default_wargear: Vec::new(),
            option_groups: Vec::new(),
            additional_model_cost: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }
}

// ============================================================================
// Options
// ============================================================================

/// One selectable choice and its point cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOption {
    pub name: String,
    pub points: u32,
}

/// A set of options sharing selection bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub description: String,
    pub min: u32,
    pub max: u32,
    pub options: Vec<UnitOption>,
}

// ============================================================================
// Units
// ============================================================================

/// A unit datasheet after extraction.
///
/// `subheadings` starts with every labelled section of the datasheet;
/// processing removes the ones it understands, so whatever remains is
/// residual text for a human to look at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUnit {
    pub name: String,
    pub points: u32,
    pub max_selections: Option<u32>,
    pub models: Vec<RawModel>,
    pub special_rules: Vec<String>,
    pub option_groups: Vec<OptionGroup>,
    pub subheadings: IndexMap<String, String>,
    pub errors: Vec<String>,
}

impl RawUnit {
    pub fn new(name: impl Into<String>, points: u32) -> Self {
        Self {
            name: name.into(),
            points,
            ..Default::default()
        }
    }

    /// Index of the model best matching `name`: singular/plural folded
    /// equality first, then containment, then Jaro-Winkler similarity.
    pub fn find_model(&self, name: &str) -> Option<usize> {
        let wanted = singular_key(name);
        if wanted.is_empty() {
            return None;
        }

        if let Some(idx) = self
            .models
            .iter()
            .position(|m| singular_key(m.name()) == wanted)
        {
            return Some(idx);
        }

        if let Some(idx) = self.models.iter().position(|m| {
            let key = singular_key(m.name());
            wanted.contains(&key) || key.contains(&wanted)
        }) {
            return Some(idx);
        }

        self.models
            .iter()
            .enumerate()
            .map(|(idx, m)| (strsim::jaro_winkler(&singular_key(m.name()), &wanted), idx))
            .filter(|(score, _)| *score >= 0.9)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, idx)| idx)
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(unit = %self.name, %message, "unit error");
        self.errors.push(message);
    }
}

/// Lowercase each word and fold simple English plurals.
pub(crate) fn singular_key(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let word = word.to_lowercase();
            if let Some(stem) = word.strip_suffix("ies") {
                format!("{stem}y")
            } else if word.ends_with("ss") || word.len() <= 3 {
                word
            } else if let Some(stem) = word.strip_suffix('s') {
                stem.to_string()
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Weapons and FAQ
// ============================================================================

/// A weapon or wargear profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub name: String,
    pub characteristics: Characteristics,
    pub special_rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One FAQ entry, keyed the way the catalogue consumer expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Page")]
    pub page: String,
    #[serde(rename = "Text")]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn model(name: &str) -> RawModel {
        RawModel::new(RawProfile {
            name: name.to_string(),
            characteristics: Characteristics::new(),
        })
    }

    #[test]
    fn test_profile_from_cells_preserves_order() {
        let profile = RawProfile::from_cells(
            "Legionary",
            &headers(&["WS", "BS", "S"]),
            &headers(&["4", "4", "4"]),
        )
        .unwrap();
        let keys: Vec<&String> = profile.characteristics.keys().collect();
        assert_eq!(keys, vec!["WS", "BS", "S"]);
    }

    #[test]
    fn test_profile_from_cells_rejects_mismatch() {
        let err = RawProfile::from_cells("Legionary", &headers(&["WS", "BS"]), &headers(&["4"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::ProfileMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_singular_key() {
        assert_eq!(singular_key("Legionaries"), "legionary");
        assert_eq!(singular_key("Legion Sergeants"), "legion sergeant");
        assert_eq!(singular_key("Servo-automata"), "servo-automata");
        assert_eq!(singular_key("Chaplain Boss"), "chaplain boss");
    }

    #[test]
    fn test_find_model() {
        let mut unit = RawUnit::new("Legion Tactical Squad", 100);
        unit.models.push(model("Legionary"));
        unit.models.push(model("Legion Sergeant"));

        assert_eq!(unit.find_model("Legionaries"), Some(0));
        assert_eq!(unit.find_model("Legion Sergeant"), Some(1));
        assert_eq!(unit.find_model("Veteran Legion Sergeant"), Some(1));
        assert_eq!(unit.find_model("Rhino"), None);
        assert_eq!(unit.find_model(""), None);
    }

    #[test]
    fn test_faq_entry_serializes_with_catalogue_keys() {
        let entry = FaqEntry {
            title: "Q: Can a Rhino embark? (Page 12)".to_string(),
            page: "12".to_string(),
            text: "A: No.".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["Page"], "12");
        assert!(json.get("title").is_none());
    }
}
