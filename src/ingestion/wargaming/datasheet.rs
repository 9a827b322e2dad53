//! Unit Datasheets
//!
//! A datasheet runs from its "<name> ... N Points" line to the next one. Its
//! characteristic table becomes the unit's models; the two-column block
//! below the table (composition, type, wargear, special rules) is split
//! into columns and cut into subheadings, followed by free-form labelled
//! sections such as "Options:". Subheadings that are understood are
//! consumed into the unit; the rest stay as residual text.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::edition::EditionProfile;
use super::lookup::LookupContext;
use super::options::apply_options;
use super::records::{RawModel, RawUnit};
use super::table_extractor::{ProfileTable, TableExtractor, TableSpec};
use crate::ingestion::error::{ExtractionError, Result};
use crate::ingestion::layout::{
    first_non_list_or_header_line, split_at_header, split_columns, ColumnDividerFinder,
};
use crate::ingestion::text_utils::{is_blank, leading_spaces, starts_with_bullet, strip_bullet};

/// "0-1 Legion Praetor ........ 125 Points". The name starts with a capital
/// and the cost carries no `+`, so option lines ("- Power sword ... +10
/// points") never open a unit.
static POINTS_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:0-(\d+)\s+)?([A-Z][^+●•]*?)\s*(?:\.{2,}\s*)?(\d+)\s+(?:[Pp]oints?|POINTS)\s*$")
        .expect("Invalid points line regex")
});

/// "Access Points: one per side hull"
static FREEFORM_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][A-Za-z' -]{2,40}):\s*(.*)$").expect("Invalid label regex")
});

static COMPOSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(.+)$").expect("Invalid composition regex"));

/// Subheading holding lines that appeared before any label.
pub const UNLABELLED: &str = "Unlabelled";

const COMPOSITION: &str = "Unit Composition";
const UNIT_TYPE: &str = "Unit Type";
const WARGEAR: &str = "Wargear";
const SPECIAL_RULES: &str = "Special Rules";
const OPTIONS: &str = "Options";

// ============================================================================
// Types
// ============================================================================

/// Units of one page and the text that preceded the first datasheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasheetPage {
    pub units: Vec<RawUnit>,
    pub leading_text: String,
    /// Line index of the first unit header
    pub first_unit_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UnitHeader {
    line: usize,
    name: String,
    points: u32,
    max_selections: Option<u32>,
}

fn parse_unit_header(idx: usize, line: &str) -> Option<UnitHeader> {
    let caps = POINTS_LINE_RE.captures(line)?;
    Some(UnitHeader {
        line: idx,
        name: caps[2].trim().to_string(),
        points: caps[3].parse().ok()?,
        max_selections: caps.get(1).and_then(|m| m.as_str().parse().ok()),
    })
}

/// Bulleted items of a subheading; unbulleted lines continue the item above.
pub(crate) fn list_items(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for line in text.lines().filter(|l| !is_blank(l)) {
        if starts_with_bullet(line) || items.is_empty() {
            items.push(strip_bullet(line).to_string());
        } else if let Some(last) = items.last_mut() {
            last.push(' ');
            last.push_str(line.trim());
        }
    }
    items
}

fn without_parenthetical(name: &str) -> &str {
    name.split_once('(').map_or(name, |(base, _)| base.trim_end())
}

// ============================================================================
// Extractor
// ============================================================================

pub struct DatasheetExtractor<'a> {
    edition: &'a EditionProfile,
    lookup: &'a LookupContext,
    finder: ColumnDividerFinder,
    reconstruct_columns: bool,
}

impl<'a> DatasheetExtractor<'a> {
    pub fn new(edition: &'a EditionProfile, lookup: &'a LookupContext) -> Self {
        Self {
            edition,
            lookup,
            finder: ColumnDividerFinder::new(),
            reconstruct_columns: true,
        }
    }

    /// EPUB text has no gutters to recover; its subheadings are already
    /// on their own lines.
    pub fn with_column_reconstruction(mut self, enabled: bool) -> Self {
        self.reconstruct_columns = enabled;
        self
    }

    /// Extract every datasheet on a page.
    ///
    /// # Errors
    /// - [`ExtractionError::StructuralAssumption`] when the page has no
    ///   "N Points" unit line
    /// - [`ExtractionError::HeadersNotFound`] when a datasheet has no
    ///   characteristic table for any of the edition's header sets
    pub fn extract(&self, text: &str, page: u32) -> Result<DatasheetPage> {
        let lines: Vec<&str> = text.lines().collect();
        let headers: Vec<UnitHeader> = lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| parse_unit_header(idx, line))
            .collect();

        let Some(first) = headers.first() else {
            return Err(ExtractionError::structural(page, "<unit name> N Points"));
        };
        let leading_text = lines[..first.line].join("\n");

        let mut units = Vec::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let end = headers.get(i + 1).map_or(lines.len(), |next| next.line);
            let block = lines[header.line + 1..end].join("\n");
            units.push(self.extract_unit(header, &block, page)?);
        }

        tracing::debug!(page, units = units.len(), "datasheets extracted");
        Ok(DatasheetPage {
            units,
            leading_text,
            first_unit_line: first.line,
        })
    }

    fn extract_unit(&self, header: &UnitHeader, block: &str, page: u32) -> Result<RawUnit> {
        let mut unit = RawUnit::new(header.name.clone(), header.points);
        unit.max_selections = header.max_selections;

        let table = self.profile_table(block, page)?;
        for profile in table.profiles() {
            match profile {
                Ok(profile) => unit.models.push(RawModel::new(profile)),
                Err(err) => unit.push_error(err.to_string()),
            }
        }

        let split = split_at_header(&self.edition.unit_profile_locator, block, false);
        if !split.found {
            unit.push_error(
                ExtractionError::structural(page, &self.edition.unit_profile_locator).to_string(),
            );
            return Ok(unit);
        }

        self.collect_subheadings(&mut unit, split.rest);
        self.process_subheadings(&mut unit);
        self.resolve_names(&mut unit);
        Ok(unit)
    }

    /// The first header set whose table appears in the block.
    fn profile_table(&self, block: &str, page: u32) -> Result<ProfileTable> {
        self.edition
            .profile_header_sets
            .iter()
            .find_map(|headers| {
                let spec = TableSpec::new(headers.clone())
                    .with_staggered(self.edition.could_have_staggered_headers);
                TableExtractor::new(&spec)
                    .extract(block)
                    .filter(|table| !table.rows.is_empty())
            })
            .ok_or_else(|| {
                let all: Vec<String> = self.edition.profile_header_sets.concat();
                ExtractionError::headers_not_found(page, &all)
            })
    }

    /// Cut the text from the locator onward into subheadings.
    fn collect_subheadings(&self, unit: &mut RawUnit, text: &str) {
        let lines: Vec<&str> = text.lines().collect();
        let header_refs = self.edition.datasheet_header_refs();
        let block_end = first_non_list_or_header_line(text, &header_refs);

        let block = lines[..block_end].join("\n");
        for column in self.columns(&block) {
            self.labelled_sections(unit, &column, &header_refs);
        }
        self.freeform_sections(unit, &lines[block_end..]);
    }

    fn columns(&self, block: &str) -> Vec<String> {
        if !self.reconstruct_columns || is_blank(block) {
            return vec![block.to_string()];
        }
        let Ok(divider) = self.finder.find(block) else {
            return vec![block.to_string()];
        };

        let mut columns = Vec::new();
        for section in split_columns(block, divider) {
            columns.push(section.non_column_text);
            columns.push(section.column_1);
            columns.push(section.column_2);
        }
        columns.retain(|c| !is_blank(c));
        columns
    }

    /// Split one column at lines that open with a datasheet header.
    fn labelled_sections(&self, unit: &mut RawUnit, column: &str, headers: &[&str]) {
        let mut current: Option<String> = None;
        let mut body: Vec<String> = Vec::new();

        for line in column.lines() {
            let trimmed = line.trim();
            let opened = headers
                .iter()
                .filter(|h| trimmed.starts_with(**h))
                .max_by_key(|h| h.len());
            match opened {
                Some(header) => {
                    push_subheading(unit, current.take(), &mut body);
                    current = Some(header.to_string());
                    let inline = trimmed[header.len()..].trim_start_matches(':').trim();
                    if !inline.is_empty() {
                        body.push(inline.to_string());
                    }
                }
                None => body.push(line.trim_end().to_string()),
            }
        }
        push_subheading(unit, current, &mut body);
    }

    /// Labels at the block margin ("Options:", "Access Points:") open
    /// sections that run to the next label.
    fn freeform_sections(&self, unit: &mut RawUnit, lines: &[&str]) {
        let base_indent = lines
            .iter()
            .filter(|l| !is_blank(l))
            .map(|l| leading_spaces(l))
            .min()
            .unwrap_or(0);

        let mut current: Option<String> = None;
        let mut body: Vec<String> = Vec::new();
        for line in lines {
            let label = (leading_spaces(line) <= base_indent)
                .then(|| FREEFORM_LABEL_RE.captures(line.trim()))
                .flatten();
            match label {
                Some(caps) => {
                    push_subheading(unit, current.take(), &mut body);
                    current = Some(caps[1].trim().to_string());
                    let inline = caps[2].trim();
                    if !inline.is_empty() {
                        body.push(inline.to_string());
                    }
                }
                None => body.push(line.trim_end().to_string()),
            }
        }
        push_subheading(unit, current, &mut body);
    }

    /// Consume the subheadings this crate understands.
    fn process_subheadings(&self, unit: &mut RawUnit) {
        if let Some(text) = unit.subheadings.shift_remove(COMPOSITION) {
            apply_composition(unit, &text);
        }
        if let Some(text) = unit.subheadings.shift_remove(UNIT_TYPE) {
            apply_unit_types(unit, &text);
        }
        if let Some(text) = unit.subheadings.shift_remove(WARGEAR) {
            let wargear = list_items(&text);
            for model in &mut unit.models {
                model.default_wargear = wargear.clone();
            }
        }
        if let Some(text) = unit.subheadings.shift_remove(SPECIAL_RULES) {
            unit.special_rules = list_items(&text);
        }
        if let Some(text) = unit.subheadings.shift_remove(OPTIONS) {
            apply_options(unit, &text);
        }
    }

    /// Report names the catalogue does not know. A table is only consulted
    /// when it has entries.
    fn resolve_names(&self, unit: &mut RawUnit) {
        let lookup = self.lookup;

        let mut unknown = Vec::new();
        if !lookup.rules.is_empty() {
            for rule in &unit.special_rules {
                if !resolves(rule, |n| lookup.resolve_rule(n).is_some()) {
                    unknown.push(format!("unknown special rule '{}'", rule));
                }
            }
        }

        if !lookup.wargear.is_empty() {
            let mut seen = HashSet::new();
            for item in unit.models.iter().flat_map(|m| m.default_wargear.iter()) {
                let known = resolves(item, |n| lookup.resolve_wargear(n).is_some());
                if seen.insert(item.as_str()) && !known {
                    unknown.push(format!("unknown wargear '{}'", item));
                }
            }
        }

        if !lookup.categories.is_empty() {
            let mut seen = HashSet::new();
            for unit_type in unit.models.iter().filter_map(|m| m.unit_type.as_deref()) {
                let known = resolves(unit_type, |n| lookup.resolve_category(n).is_some());
                if seen.insert(unit_type) && !known {
                    unknown.push(format!("unknown unit type '{}'", unit_type));
                }
            }
        }

        for message in unknown {
            unit.push_error(message);
        }
    }
}

/// Whether `name` is known as written or without its parenthetical.
fn resolves(name: &str, resolve: impl Fn(&str) -> bool) -> bool {
    resolve(name) || resolve(without_parenthetical(name))
}

fn push_subheading(unit: &mut RawUnit, name: Option<String>, body: &mut Vec<String>) {
    let text = std::mem::take(body).join("\n");
    let text = text.trim_matches('\n');
    let name = match name {
        Some(name) => name,
        None if is_blank(text) => return,
        None => UNLABELLED.to_string(),
    };

    let entry = unit.subheadings.entry(name).or_default();
    if !entry.is_empty() && !text.is_empty() {
        entry.push('\n');
    }
    entry.push_str(text);
}

fn apply_composition(unit: &mut RawUnit, text: &str) {
    for item in list_items(text) {
        let Some(caps) = COMPOSITION_RE.captures(&item) else {
            unit.push_error(format!("unparsed composition '{}'", item));
            continue;
        };
        let Ok(count) = caps[1].parse::<u32>() else {
            unit.push_error(format!("unparsed composition count '{}'", item));
            continue;
        };
        match unit.find_model(&caps[2]) {
            Some(idx) => {
                let model = &mut unit.models[idx];
                model.min = count;
                model.max = count;
            }
            None => unit.push_error(format!("composition names unknown model '{}'", &caps[2])),
        }
    }
}

fn apply_unit_types(unit: &mut RawUnit, text: &str) {
    for item in list_items(text) {
        match item.split_once(':') {
            Some((model, unit_type)) => match unit.find_model(model) {
                Some(idx) => unit.models[idx].unit_type = Some(unit_type.trim().to_string()),
                None => unit.push_error(format!("unit type names unknown model '{}'", model)),
            },
            None => {
                for model in unit.models.iter_mut().filter(|m| m.unit_type.is_none()) {
                    model.unit_type = Some(item.clone());
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
