//! Page Classification
//!
//! Decides what a page holds and runs the matching extractor. Checks run in
//! a fixed order and the first one that applies wins:
//!
//! 1. fewer than three lines of raw text: blank or ignored
//! 2. the unit-profile locator appears and datasheets extract: unit profiles
//! 3. special rules, then weapon profiles, then wargear, then unit types:
//!    each applies when its header is near the top or the previous page
//!    had that type
//! 4. otherwise blank or ignored
//!
//! FAQ pages are never detected; they arrive pre-assigned. After extraction
//! every page except weapon profile pages gets a residual pass: stray weapon
//! tables are scanned out of the leftover prose and the rest is segmented
//! into rules.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use super::datasheet::DatasheetExtractor;
use super::edition::EditionProfile;
use super::faq::{parse_faq, PAGE_MARKER};
use super::lookup::LookupContext;
use super::page::{Page, PageType};
use super::rule_segmenter::RuleSegmenter;
use super::weapon_table::WeaponTableExtractor;
use crate::ingestion::error::{ExtractionError, Result};
use crate::ingestion::layout::{reading_order_text, ColumnDividerFinder};
use crate::ingestion::text_utils::{char_len, is_blank};

/// Pages with fewer raw text lines carry nothing worth extracting.
pub const MIN_PAGE_LINES: usize = 3;

const ADDITIONAL: &str = "additional";

/// Header checks in priority order. Each type applies when its header is
/// present or the previous page had that type.
const HEADER_ORDER: [PageType; 4] = [
    PageType::SpecialRules,
    PageType::WeaponProfiles,
    PageType::Wargear,
    PageType::TypesAndSubtypes,
];

/// A page header found near the top of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplicitHeader {
    pub page_type: PageType,
    pub line: usize,
}

pub struct PageClassifier<'a> {
    edition: &'a EditionProfile,
    lookup: &'a LookupContext,
    finder: ColumnDividerFinder,
    segmenter: RuleSegmenter,
}

impl<'a> PageClassifier<'a> {
    pub fn new(edition: &'a EditionProfile, lookup: &'a LookupContext) -> Self {
        Self {
            edition,
            lookup,
            finder: ColumnDividerFinder::new(),
            segmenter: RuleSegmenter::from_edition(edition),
        }
    }

    /// Classify `page` and extract its records.
    ///
    /// Recoverable failures are recorded on the page. A required table whose
    /// headers cannot be found is returned as an error.
    pub fn process(&self, page: &mut Page, previous: Option<PageType>) -> Result<PageType> {
        let page_type = self.classify_and_extract(page, previous)?;
        page.page_type = Some(page_type);

        if !matches!(page_type, PageType::WeaponProfiles | PageType::BlankOrIgnored) {
            self.residual_pass(page);
        }

        debug!(
            page = page.number,
            page_type = page_type.as_str(),
            records = page.record_count(),
            errors = page.errors.len(),
            "page processed"
        );
        Ok(page_type)
    }

    fn classify_and_extract(&self, page: &mut Page, previous: Option<PageType>) -> Result<PageType> {
        if page.page_type == Some(PageType::Faq) {
            self.extract_faq(page);
            return Ok(PageType::Faq);
        }

        if page.raw_text.lines().count() < MIN_PAGE_LINES {
            return Ok(PageType::BlankOrIgnored);
        }

        if page.raw_text.contains(&self.edition.unit_profile_locator) && self.extract_units(page)? {
            return Ok(PageType::UnitProfiles);
        }

        let top = self.header_candidates(&page.raw_text);
        let carried = previous.filter(PageType::carries_over);
        let found = HEADER_ORDER.iter().find_map(|&page_type| {
            let line = self.header_line(&top, page_type);
            (line.is_some() || carried == Some(page_type)).then_some((page_type, line))
        });
        let Some((page_type, header_line)) = found else {
            return Ok(PageType::BlankOrIgnored);
        };
        if header_line.is_none() {
            debug!(page = page.number, page_type = page_type.as_str(), "type carried over");
        }

        match page_type {
            PageType::SpecialRules => {
                page.column_text = self.column_text(page, header_line);
                page.special_rules_text = page.column_text.clone();
            }
            PageType::WeaponProfiles => self.extract_weapons(page, header_line.is_some())?,
            PageType::Wargear | PageType::TypesAndSubtypes => {
                self.extract_glossary(page, page_type, header_line)
            }
            _ => {}
        }
        Ok(page_type)
    }

    /// The page type announced by a header among the first few lines.
    pub fn explicit_header(&self, raw: &str) -> Option<ExplicitHeader> {
        let top = self.header_candidates(raw);
        HEADER_ORDER.iter().find_map(|&page_type| {
            self.header_line(&top, page_type)
                .map(|line| ExplicitHeader { page_type, line })
        })
    }

    /// Short lines near the top of the page, lowercased, with their line index.
    fn header_candidates(&self, raw: &str) -> Vec<(usize, String)> {
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !is_blank(line))
            .take(self.edition.header_search_lines)
            .map(|(idx, line)| (idx, line.trim().to_lowercase()))
            .filter(|(_, line)| char_len(line) < self.edition.rule_name_max_length)
            .collect()
    }

    /// Index of the line announcing `page_type`, if any.
    fn header_line(&self, top: &[(usize, String)], page_type: PageType) -> Option<usize> {
        let edition = self.edition;
        let matches = |line: &str| match page_type {
            PageType::SpecialRules => {
                line.starts_with(&edition.special_rules_header.to_lowercase())
            }
            PageType::WeaponProfiles => line.contains(&edition.armoury_header.to_lowercase()),
            PageType::Wargear => {
                line.contains(&edition.wargear_header.to_lowercase()) && !line.starts_with(ADDITIONAL)
            }
            PageType::TypesAndSubtypes => {
                line.starts_with(&edition.unit_types_header.to_lowercase())
            }
            _ => false,
        };
        top.iter()
            .find(|(_, line)| matches(line.as_str()))
            .map(|(idx, _)| *idx)
    }

    // ========================================================================
    // Extraction per type
    // ========================================================================

    /// Returns `false` when the page turned out not to hold datasheets.
    fn extract_units(&self, page: &mut Page) -> Result<bool> {
        let extractor = DatasheetExtractor::new(self.edition, self.lookup)
            .with_column_reconstruction(page.source.has_columns());

        let sheet = match extractor.extract(&page.raw_text, page.number) {
            Ok(sheet) => sheet,
            Err(e) if e.is_recoverable() => {
                page.push_error(e.to_string());
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        page.units = sheet.units;

        // Weapon tables printed below the datasheets belong to the page
        let datasheet_text = page
            .raw_text
            .lines()
            .skip(sheet.first_unit_line)
            .collect::<Vec<_>>()
            .join("\n");
        self.scan_weapons(page, &datasheet_text);

        page.special_rules_text = self.reading_order(page, &sheet.leading_text);
        Ok(true)
    }

    fn extract_weapons(&self, page: &mut Page, explicit_header: bool) -> Result<()> {
        let extractor = WeaponTableExtractor::new(self.edition);
        let scan = if explicit_header {
            extractor.extract_required(&page.raw_text, page.number)?
        } else {
            let scan = extractor.extract(&page.raw_text);
            if scan.header_found {
                scan
            } else {
                debug!(page = page.number, "no weapon header row, scanning for stat runs");
                extractor.extract_headerless(&page.raw_text)
            }
        };

        for error in scan.errors {
            page.push_error(error);
        }
        page.weapons.extend(scan.weapons);
        Ok(())
    }

    /// Wargear and unit type pages: name/description entries, possibly with
    /// profile tables among them.
    fn extract_glossary(&self, page: &mut Page, page_type: PageType, header_line: Option<usize>) {
        page.column_text = self.column_text(page, header_line);
        let text = page.column_text.clone();
        let remaining = self.scan_weapons(page, &text);
        let segmentation = self.segmenter.segment(&remaining);

        let target = match page_type {
            PageType::Wargear => &mut page.wargear,
            _ => &mut page.unit_types,
        };
        merge_entries(target, segmentation.rules);
        page.dropped_rules.extend(segmentation.dropped);
    }

    fn extract_faq(&self, page: &mut Page) {
        page.column_text = self.column_text(page, None);
        page.faq = parse_faq(&page.column_text);
        if page.faq.is_empty() {
            page.push_error(ExtractionError::structural(page.number, PAGE_MARKER).to_string());
        }
    }

    /// Weapon tables and rules left beside the page's main content.
    fn residual_pass(&self, page: &mut Page) {
        if page.special_rules_text.trim().is_empty() {
            return;
        }
        let text = std::mem::take(&mut page.special_rules_text);
        let remaining = self.scan_weapons(page, &text);
        let segmentation = self.segmenter.segment(&remaining);

        merge_entries(&mut page.special_rules, segmentation.rules);
        page.dropped_rules.extend(segmentation.dropped);
        page.special_rules_text = remaining;
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Scan `text` for weapon tables; returns the text without the table lines.
    fn scan_weapons(&self, page: &mut Page, text: &str) -> String {
        let scan = WeaponTableExtractor::new(self.edition).extract(text);
        if !scan.header_found {
            return text.to_string();
        }

        for error in scan.errors {
            page.push_error(error);
        }
        page.weapons.extend(scan.weapons);

        let consumed: HashSet<usize> = scan.consumed_lines.into_iter().collect();
        text.lines()
            .enumerate()
            .filter(|(idx, _)| !consumed.contains(idx))
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn column_text(&self, page: &Page, header_line: Option<usize>) -> String {
        let body = page
            .raw_text
            .lines()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != header_line)
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n");
        self.reading_order(page, &body)
    }

    fn reading_order(&self, page: &Page, text: &str) -> String {
        if page.source.has_columns() {
            reading_order_text(text, &self.finder)
        } else {
            text.to_string()
        }
    }
}

fn merge_entries(target: &mut IndexMap<String, String>, entries: IndexMap<String, String>) {
    for (name, body) in entries {
        match target.get_mut(&name) {
            Some(existing) => existing.push_str(&body),
            None => {
                target.insert(name, body);
            }
        }
    }
}
