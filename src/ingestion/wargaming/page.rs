//! Pages and their input formats.
//!
//! PDF pages arrive as converter text with the original column layout
//! flattened into spaces; EPUB pages arrive as paragraphs already pulled out
//! of the HTML tree. Both end up as line-oriented raw text, but only PDF
//! text needs its columns reconstructed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::records::{FaqEntry, RawUnit, WeaponProfile};
use crate::ingestion::text_utils::{char_len, normalize_page_text};

// ============================================================================
// Page Type
// ============================================================================

/// What a page holds. Assigned once by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    UnitProfiles,
    SpecialRules,
    WeaponProfiles,
    Wargear,
    TypesAndSubtypes,
    Faq,
    BlankOrIgnored,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnitProfiles => "unit_profiles",
            Self::SpecialRules => "special_rules",
            Self::WeaponProfiles => "weapon_profiles",
            Self::Wargear => "wargear",
            Self::TypesAndSubtypes => "types_and_subtypes",
            Self::Faq => "faq",
            Self::BlankOrIgnored => "blank_or_ignored",
        }
    }

    /// Types that continue onto the next page without repeating a header.
    pub fn carries_over(&self) -> bool {
        matches!(
            self,
            Self::SpecialRules | Self::WeaponProfiles | Self::Wargear | Self::TypesAndSubtypes
        )
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Sources
// ============================================================================

/// One paragraph handed over by the EPUB HTML-tree collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpubParagraph {
    pub text: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub style: Option<String>,
}

impl EpubParagraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            classes: Vec::new(),
            style: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn is_heading(&self) -> bool {
        self.classes.iter().any(|c| {
            let c = c.to_lowercase();
            c.contains("heading")
                || c.contains("title")
                || (c.len() == 2 && c.starts_with('h') && c[1..].chars().all(|d| d.is_ascii_digit()))
        })
    }

    pub fn is_table(&self) -> bool {
        self.classes
            .iter()
            .any(|c| c.to_lowercase().contains("table"))
    }

    pub fn is_hidden(&self) -> bool {
        self.style
            .as_deref()
            .is_some_and(|s| s.replace(' ', "").contains("display:none"))
    }
}

/// Input format of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum PageSource {
    Pdf { text: String },
    Epub { paragraphs: Vec<EpubParagraph> },
}

impl PageSource {
    /// Line-oriented text of the page.
    ///
    /// EPUB headings get a line of their own after a blank line. Runs of
    /// table paragraphs are laid out as fixed-width columns so the table
    /// extractors can rely on header alignment as they do for PDF text.
    pub fn raw_text(&self) -> String {
        match self {
            Self::Pdf { text } => normalize_page_text(text),
            Self::Epub { paragraphs } => {
                let visible: Vec<&EpubParagraph> =
                    paragraphs.iter().filter(|p| !p.is_hidden()).collect();
                let mut lines: Vec<String> = Vec::new();

                let mut idx = 0;
                while idx < visible.len() {
                    let paragraph = visible[idx];
                    if paragraph.is_table() {
                        let run = visible[idx..]
                            .iter()
                            .take_while(|p| p.is_table())
                            .count();
                        lines.extend(align_table_rows(&visible[idx..idx + run]));
                        idx += run;
                        continue;
                    }
                    if paragraph.is_heading() && !lines.is_empty() {
                        lines.push(String::new());
                    }
                    lines.push(paragraph.text.replace('\t', " ").trim_end().to_string());
                    idx += 1;
                }
                normalize_page_text(&lines.join("\n"))
            }
        }
    }

    /// Whether the text carries a flattened multi-column layout.
    pub fn has_columns(&self) -> bool {
        matches!(self, Self::Pdf { .. })
    }
}

/// Pad tab-separated cells so each column starts at the same offset, with
/// at least two spaces between columns.
fn align_table_rows(rows: &[&EpubParagraph]) -> Vec<String> {
    let cells: Vec<Vec<&str>> = rows
        .iter()
        .map(|p| p.text.split('\t').map(str::trim).collect())
        .collect();

    let mut widths: Vec<usize> = Vec::new();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            let width = char_len(cell);
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(width),
                None => widths.push(width),
            }
        }
    }

    cells
        .iter()
        .map(|row| {
            let mut line = String::new();
            for (cell, width) in row.iter().zip(&widths) {
                line.push_str(&format!("{:<w$}", cell, w = width + 2));
            }
            line.trim_end().to_string()
        })
        .collect()
}

// ============================================================================
// Page
// ============================================================================

/// One page and everything extracted from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: u32,
    pub page_type: Option<PageType>,
    #[serde(skip)]
    pub source: PageSource,
    #[serde(skip)]
    pub raw_text: String,
    /// Text in reading order after column reconstruction
    #[serde(skip)]
    pub column_text: String,
    /// Prose left for rule segmentation after tables were extracted
    #[serde(skip)]
    pub special_rules_text: String,
    pub units: Vec<RawUnit>,
    pub weapons: Vec<WeaponProfile>,
    pub special_rules: IndexMap<String, String>,
    pub wargear: IndexMap<String, String>,
    pub unit_types: IndexMap<String, String>,
    pub faq: Vec<FaqEntry>,
    pub dropped_rules: Vec<String>,
    pub errors: Vec<String>,
}

impl Page {
    pub fn new(number: u32, source: PageSource) -> Self {
        let raw_text = source.raw_text();
        Self {
            number,
            page_type: None,
            source,
            raw_text,
            column_text: String::new(),
            special_rules_text: String::new(),
            units: Vec::new(),
            weapons: Vec::new(),
            special_rules: IndexMap::new(),
            wargear: IndexMap::new(),
            unit_types: IndexMap::new(),
            faq: Vec::new(),
            dropped_rules: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn pdf(number: u32, text: impl Into<String>) -> Self {
        Self::new(number, PageSource::Pdf { text: text.into() })
    }

    pub fn epub(number: u32, paragraphs: Vec<EpubParagraph>) -> Self {
        Self::new(number, PageSource::Epub { paragraphs })
    }

    /// Pre-assign a type (FAQ pages are never detected).
    pub fn with_type(mut self, page_type: PageType) -> Self {
        self.page_type = Some(page_type);
        self
    }

    /// Number of structured records the page produced.
    pub fn record_count(&self) -> usize {
        self.units.len()
            + self.weapons.len()
            + self.special_rules.len()
            + self.wargear.len()
            + self.unit_types.len()
            + self.faq.len()
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(page = self.number, %message, "page error");
        self.errors.push(message);
    }
}
