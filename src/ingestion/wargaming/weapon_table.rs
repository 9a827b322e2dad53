//! Weapon Profile Tables
//!
//! Weapon tables end in free-text columns ("Special Rules", "Traits") that
//! cannot be whitespace-tokenised, so their start columns are learned from
//! the header row and each data row is cut at that alignment. Pages that
//! continue a table without repeating its header are read by looking for a
//! run of stat-like tokens instead.

use regex::Regex;
use std::sync::LazyLock;

use super::edition::EditionProfile;
use super::records::{RawProfile, WeaponProfile};
use super::table_extractor::{append_note, locate_header, note_text};
use crate::ingestion::error::{ExtractionError, Result};
use crate::ingestion::text_utils::{
    ends_paragraph, is_blank, leading_spaces, looks_like_sentence, normalize_ws, split_cells,
    split_top_level_commas, Cell,
};

/// Tokens that can fill a fixed weapon characteristic.
static STAT_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:[-–—*]|[+x]?\d+(?:\+|")?|\d+"?-\d+"?|D|User|Melee|Template)$"#)
        .expect("Invalid stat token regex")
});

/// "Volkite culverin - 1": the base name of a multi-range profile.
static RANGE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*[-–]\s*\d+$").expect("Invalid range suffix regex"));

fn is_stat_token(token: &str) -> bool {
    STAT_TOKEN_RE.is_match(token)
}

fn join_cells(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Types
// ============================================================================

/// Weapons found in a text plus the lines they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeaponScan {
    pub weapons: Vec<WeaponProfile>,
    pub consumed_lines: Vec<usize>,
    pub header_found: bool,
    /// Row-alignment ambiguities resolved by a fallback
    pub errors: Vec<String>,
}

/// Column positions learned from a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderLayout {
    stats_at: usize,
    rules_at: Option<usize>,
    traits_at: Option<usize>,
}

#[derive(Debug, Clone, Default)]
struct WeaponRow {
    name: String,
    stats: Vec<String>,
    special_rules: String,
    traits: String,
    note: Option<String>,
    drift_shifted: bool,
}

enum RowParse {
    Row(WeaponRow),
    RulesContinuation { text: String, is_traits: bool },
    NameFragment { text: String, start: usize },
}

/// Running state shared by the aligned and header-less scans.
#[derive(Default)]
struct ScanState {
    rows: Vec<WeaponRow>,
    consumed: Vec<usize>,
    errors: Vec<String>,
    in_table: bool,
    in_note: bool,
    rows_in_table: usize,
    name_column: Option<usize>,
    pending_name: Vec<String>,
    pending_prefix: Option<String>,
}

impl ScanState {
    /// Footnote handling; returns true when the line was consumed.
    fn handle_note(&mut self, idx: usize, line: &str) -> bool {
        let trimmed = line.trim();
        if let Some(note) = note_text(trimmed) {
            if let Some(row) = self.rows.last_mut() {
                append_note(&mut row.note, note);
                self.in_note = !ends_paragraph(line);
                self.consumed.push(idx);
                return true;
            }
        }
        if !self.in_note {
            return false;
        }

        let left_of_names = self.name_column.is_some_and(|c| leading_spaces(line) < c);
        if is_blank(line) || left_of_names {
            self.in_note = false;
            return false;
        }
        if let Some(row) = self.rows.last_mut() {
            append_note(&mut row.note, trimmed);
        }
        self.consumed.push(idx);
        if ends_paragraph(line) {
            self.in_note = false;
        }
        true
    }

    /// Blank lines, prose and text left of the names end the table.
    /// Returns true when the line closed (or was outside) the table.
    fn closes_table(&mut self, line: &str) -> bool {
        if is_blank(line) {
            if self.rows_in_table > 0 {
                self.in_table = false;
            }
            return true;
        }
        let left_of_names = self.name_column.is_some_and(|c| leading_spaces(line) < c);
        if left_of_names || looks_like_sentence(line) {
            self.in_table = false;
            return true;
        }
        false
    }

    fn push_row(&mut self, mut row: WeaponRow, first_cell: usize, idx: usize) {
        let column = *self.name_column.get_or_insert(first_cell);
        let indented = first_cell > column;

        if !self.pending_name.is_empty() {
            let prefix = std::mem::take(&mut self.pending_name).join(" ");
            row.name = format!("{} {}", prefix, row.name);
        }

        if let Some(prefix) = &self.pending_prefix {
            if row.name.starts_with(['-', '–']) {
                row.name = format!("{} {}", prefix, row.name);
            } else if indented {
                row.name = format!("{} - {}", prefix, row.name);
            } else {
                self.pending_prefix = None;
            }
        }
        if let Some(caps) = RANGE_SUFFIX_RE.captures(&row.name) {
            self.pending_prefix = Some(caps[1].trim().to_string());
        }

        self.rows.push(row);
        self.rows_in_table += 1;
        self.consumed.push(idx);
    }

    fn push_fragment(&mut self, fragment: String, start: usize, idx: usize) {
        self.name_column.get_or_insert(start);
        if let Some(base) = fragment.strip_suffix(['-', '–']) {
            self.pending_prefix = Some(base.trim().to_string());
        } else if self.rows_in_table > 0 && self.pending_prefix.is_none() {
            if let Some(row) = self.rows.last_mut() {
                row.name.push(' ');
                row.name.push_str(&fragment);
            }
        } else {
            self.pending_name.push(fragment);
        }
        self.consumed.push(idx);
    }

    fn push_continuation(&mut self, text: String, is_traits: bool, idx: usize) {
        let Some(row) = self.rows.last_mut() else {
            return;
        };
        let target = if is_traits {
            &mut row.traits
        } else {
            &mut row.special_rules
        };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(&text);
        self.consumed.push(idx);
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// Extracts weapon profiles according to an edition's weapon headers.
pub struct WeaponTableExtractor<'a> {
    edition: &'a EditionProfile,
    locator: String,
}

impl<'a> WeaponTableExtractor<'a> {
    pub fn new(edition: &'a EditionProfile) -> Self {
        Self {
            edition,
            locator: edition.weapon_stat_headers.join(" "),
        }
    }

    /// Scan every weapon table in `text`. Never fails; a text without a
    /// header row yields an empty scan.
    pub fn extract(&self, text: &str) -> WeaponScan {
        let lines: Vec<&str> = text.lines().collect();
        let mut state = ScanState::default();
        let mut layout: Option<HeaderLayout> = None;
        let mut header_found = false;

        let mut idx = 0;
        while idx < lines.len() {
            let line = lines[idx];

            if let Some(span) = self.header_span(&lines, idx) {
                header_found = true;
                layout = Some(self.learn_layout(&lines[idx..idx + span]));
                state.in_table = true;
                state.in_note = false;
                state.rows_in_table = 0;
                state.pending_name.clear();
                state.consumed.extend(idx..idx + span);
                idx += span;
                continue;
            }

            if state.handle_note(idx, line) || !state.in_table || state.closes_table(line) {
                idx += 1;
                continue;
            }

            if let Some(layout) = layout {
                self.apply_parse(&mut state, self.parse_aligned(line, layout), line, idx);
            }
            idx += 1;
        }

        self.finish(state, header_found)
    }

    /// Scan a page that must carry a weapon table header.
    ///
    /// # Errors
    /// [`ExtractionError::HeadersNotFound`] when no header row exists.
    pub fn extract_required(&self, text: &str, page: u32) -> Result<WeaponScan> {
        let scan = self.extract(text);
        if scan.header_found {
            Ok(scan)
        } else {
            Err(ExtractionError::headers_not_found(
                page,
                &self.edition.weapon_stat_headers,
            ))
        }
    }

    /// Scan a continuation page that repeats no header: a row is any line
    /// with a run of stat-like tokens after at least one name token.
    pub fn extract_headerless(&self, text: &str) -> WeaponScan {
        let mut state = ScanState {
            in_table: true,
            ..Default::default()
        };

        for (idx, line) in text.lines().enumerate() {
            if state.handle_note(idx, line) || is_blank(line) || looks_like_sentence(line) {
                continue;
            }

            let cells = split_cells(line);
            match self.stat_run_start(&cells) {
                Some(start) => {
                    let n = self.stat_count();
                    let row = WeaponRow {
                        name: join_cells(&cells[..start]),
                        stats: cells[start..start + n].iter().map(|c| c.text.clone()).collect(),
                        special_rules: join_cells(&cells[start + n..]),
                        ..Default::default()
                    };
                    state.push_row(row, cells[0].start, idx);
                }
                None => {
                    let indented = state
                        .name_column
                        .zip(cells.first())
                        .is_some_and(|(col, first)| first.start > col);
                    if indented {
                        state.push_continuation(join_cells(&cells), false, idx);
                    }
                }
            }
        }

        self.finish(state, false)
    }

    fn stat_count(&self) -> usize {
        self.edition.weapon_stat_headers.len()
    }

    fn stat_run_start(&self, cells: &[Cell]) -> Option<usize> {
        let n = self.stat_count();
        if cells.len() < n + 1 {
            return None;
        }
        (1..=cells.len() - n).find(|&start| cells[start..start + n].iter().all(|c| is_stat_token(&c.text)))
    }

    fn header_span(&self, lines: &[&str], idx: usize) -> Option<usize> {
        locate_header(
            lines,
            idx,
            &self.locator,
            self.edition.could_have_staggered_headers,
        )
    }

    fn learn_layout(&self, header_lines: &[&str]) -> HeaderLayout {
        let column_of = |needle: &str| {
            header_lines.iter().find_map(|line| {
                line.find(needle)
                    .map(|byte| line[..byte].chars().count())
            })
        };
        let text_column = |i: usize| {
            self.edition
                .weapon_text_headers
                .get(i)
                .and_then(|header| column_of(header.as_str()))
        };

        let first_stat = self
            .edition
            .weapon_stat_headers
            .first()
            .map(String::as_str)
            .unwrap_or_default();
        let stats_at = header_lines
            .iter()
            .find_map(|line| {
                split_cells(line)
                    .into_iter()
                    .find(|c| c.text == first_stat)
                    .map(|c| c.start)
            })
            .unwrap_or(0);

        HeaderLayout {
            stats_at,
            rules_at: text_column(0),
            traits_at: text_column(1),
        }
    }

    fn parse_aligned(&self, line: &str, layout: HeaderLayout) -> RowParse {
        let n = self.stat_count();
        let cells = split_cells(line);
        let rules_at = layout.rules_at.unwrap_or(usize::MAX);
        let (mut before, mut after): (Vec<Cell>, Vec<Cell>) =
            cells.into_iter().partition(|c| c.start < rules_at);

        let Some(first_start) = before.first().map(|c| c.start) else {
            let is_traits = layout
                .traits_at
                .zip(after.first())
                .is_some_and(|(col, c)| c.start >= col);
            return RowParse::RulesContinuation {
                text: join_cells(&after),
                is_traits,
            };
        };
        if first_start >= layout.stats_at && layout.stats_at > 0 {
            return RowParse::RulesContinuation {
                text: join_cells(&before) + &prefixed(&join_cells(&after)),
                is_traits: false,
            };
        }

        // Stat cells that overran the learned free-text column
        while before.len() < n + 1 && after.first().is_some_and(|c| is_stat_token(&c.text)) {
            before.push(after.remove(0));
        }
        if before.len() < n + 1 {
            return RowParse::NameFragment {
                text: join_cells(&before),
                start: first_start,
            };
        }

        let drift = after
            .first()
            .and_then(|c| c.text.chars().next())
            .is_some_and(char::is_lowercase);
        let mut drift_shifted = false;
        if drift && before.len() > n + 1 {
            if let Some(cell) = before.pop() {
                after.insert(0, cell);
                drift_shifted = true;
            }
        }

        let stats = self.take_stats(&mut before);
        let (rules, traits): (Vec<Cell>, Vec<Cell>) = match layout.traits_at {
            Some(col) => after.into_iter().partition(|c| c.start < col),
            None => (after, Vec::new()),
        };

        RowParse::Row(WeaponRow {
            name: join_cells(&before),
            stats,
            special_rules: join_cells(&rules),
            traits: join_cells(&traits),
            note: None,
            drift_shifted,
        })
    }

    /// Remove the stat cells from the end of `before`.
    ///
    /// Combined artillery rows print parentheticals inside stat cells
    /// ("60\" (x2)"); those take two extra tokens that merge back into the
    /// cell they belong to.
    fn take_stats(&self, before: &mut Vec<Cell>) -> Vec<String> {
        let n = self.stat_count();
        let tail_has_paren = before[before.len() - n..]
            .iter()
            .any(|c| c.text.contains('('));

        if self.edition.combined_artillery && tail_has_paren && before.len() >= n + 3 {
            let tail: Vec<String> = before[before.len() - (n + 2)..]
                .iter()
                .map(|c| c.text.clone())
                .collect();
            if let Some(merged) = merge_parentheticals(&tail, n) {
                before.truncate(before.len() - (n + 2));
                return merged;
            }
        }

        before
            .split_off(before.len() - n)
            .into_iter()
            .map(|c| c.text)
            .collect()
    }

    fn apply_parse(&self, state: &mut ScanState, parse: RowParse, line: &str, idx: usize) {
        match parse {
            RowParse::Row(row) => {
                if row.name.is_empty() {
                    state
                        .errors
                        .push(format!("weapon row without a name: {}", line.trim()));
                    return;
                }
                let first_cell = leading_spaces(line);
                state.push_row(row, first_cell, idx);
            }
            RowParse::NameFragment { text, start } => state.push_fragment(text, start, idx),
            RowParse::RulesContinuation { text, is_traits } => {
                state.push_continuation(text, is_traits, idx)
            }
        }
    }

    fn finish(&self, state: ScanState, header_found: bool) -> WeaponScan {
        let mut errors = state.errors;
        let mut weapons = Vec::with_capacity(state.rows.len());

        for row in state.rows {
            if row.drift_shifted {
                errors.push(format!(
                    "{}: special rules column drifted, shifted one token left",
                    row.name
                ));
            }
            if row.special_rules.chars().next().is_some_and(char::is_lowercase) {
                errors.push(format!(
                    "{}: special rules begin mid-phrase ('{}')",
                    row.name, row.special_rules
                ));
            }
            match RawProfile::from_cells(
                normalize_ws(&row.name),
                &self.edition.weapon_stat_headers,
                &row.stats,
            ) {
                Ok(profile) => weapons.push(WeaponProfile {
                    name: profile.name,
                    characteristics: profile.characteristics,
                    special_rules: split_top_level_commas(&row.special_rules)
                        .into_iter()
                        .filter(|rule| !is_stat_token(rule))
                        .collect(),
                    traits: split_top_level_commas(&row.traits),
                    note: row.note,
                }),
                Err(err) => errors.push(err.to_string()),
            }
        }

        tracing::debug!(weapons = weapons.len(), header_found, "weapon scan finished");
        WeaponScan {
            weapons,
            consumed_lines: state.consumed,
            header_found,
            errors,
        }
    }
}

fn prefixed(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!(" {}", text)
    }
}

/// Fold tokens that open with or sit inside parentheses into the token
/// before them. `None` unless exactly `n` cells remain.
fn merge_parentheticals(tokens: &[String], n: usize) -> Option<Vec<String>> {
    let mut cells: Vec<String> = Vec::new();
    let mut depth = 0usize;

    for token in tokens {
        let joins_previous = depth > 0 || token.starts_with('(');
        match cells.last_mut() {
            Some(last) if joins_previous => {
                last.push(' ');
                last.push_str(token);
            }
            _ => cells.push(token.clone()),
        }
        depth += token.matches('(').count();
        depth = depth.saturating_sub(token.matches(')').count());
    }

    (cells.len() == n).then_some(cells)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn first_edition() -> EditionProfile {
        EditionProfile::horus_heresy_1e()
    }

    #[test]
    fn test_bolter_row() {
        let edition = first_edition();
        let text = "Name  R  S  AP  Special Rules\nBolter  24\"  4  5  Rending";
        let scan = WeaponTableExtractor::new(&edition).extract(text);

        assert!(scan.header_found);
        assert_eq!(scan.weapons.len(), 1);
        let bolter = &scan.weapons[0];
        assert_eq!(bolter.name, "Bolter");
        assert_eq!(bolter.characteristics["R"], "24\"");
        assert_eq!(bolter.characteristics["S"], "4");
        assert_eq!(bolter.characteristics["AP"], "5");
        assert_eq!(bolter.special_rules, vec!["Rending"]);
    }

    #[test]
    fn test_special_rules_split_on_top_level_commas() {
        let edition = first_edition();
        let text = "\
Weapon             R     S   AP  Special Rules
Frag missile       48\"   4   6   Heavy 1, Blast (3\", 5\"),
                                 Pinning";
        let scan = WeaponTableExtractor::new(&edition).extract(text);

        assert_eq!(scan.weapons.len(), 1);
        assert_eq!(
            scan.weapons[0].special_rules,
            vec!["Heavy 1", "Blast (3\", 5\")", "Pinning"]
        );
    }

    #[test]
    fn test_multi_range_names_are_stitched() {
        let edition = first_edition();
        let text = "\
Weapon                 R     S   AP  Special Rules
Volkite culverin - 1   45\"   6   5   Heavy 2
- 2                    45\"   6   5   Heavy 4
Lascannon              48\"   9   2   Heavy 1";
        let scan = WeaponTableExtractor::new(&edition).extract(text);

        let names: Vec<&str> = scan.weapons.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Volkite culverin - 1", "Volkite culverin - 2", "Lascannon"]
        );
    }

    #[test]
    fn test_dash_fragment_prefixes_indented_rows() {
        let edition = first_edition();
        let text = "\
Weapon               R     S   AP  Special Rules
Missile launcher -
  Frag               48\"   4   6   Heavy 1
  Krak               48\"   8   3   Heavy 1";
        let scan = WeaponTableExtractor::new(&edition).extract(text);

        let names: Vec<&str> = scan.weapons.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Missile launcher - Frag", "Missile launcher - Krak"]
        );
    }

    #[test]
    fn test_lowercase_rules_shift_one_token() {
        let edition = first_edition();
        let text = "\
Weapon              R     S   AP  Special Rules
Storm lance         12\"   6   4  One use only, Lance";
        let scan = WeaponTableExtractor::new(&edition).extract(text);

        assert_eq!(scan.weapons.len(), 1);
        let lance = &scan.weapons[0];
        assert_eq!(lance.name, "Storm lance");
        assert_eq!(lance.characteristics["AP"], "4");
        assert_eq!(lance.special_rules, vec!["One use only", "Lance"]);
        assert_eq!(scan.errors.len(), 1);
    }

    #[test]
    fn test_aligned_rows_need_no_shift() {
        let edition = first_edition();
        let text = "\
Weapon           R     S   AP  Special Rules
Plasma gun       24\"   7   4   Rapid Fire, Gets Hot";
        let scan = WeaponTableExtractor::new(&edition).extract(text);
        assert_eq!(scan.weapons[0].special_rules, vec!["Rapid Fire", "Gets Hot"]);
        assert!(scan.errors.is_empty());
    }

    #[test]
    fn test_combined_artillery_merges_parentheticals() {
        let edition = EditionProfile {
            weapon_stat_headers: vec!["R".into(), "S".into(), "AP".into()],
            weapon_text_headers: vec!["Special Rules".into()],
            ..EditionProfile::horus_heresy_2e()
        };
        let text = "\
Weapon              R            S        AP   Special Rules
Quad launcher       60\" (x2)     5 (x3)   4    Barrage";
        let scan = WeaponTableExtractor::new(&edition).extract(text);

        assert_eq!(scan.weapons.len(), 1);
        let weapon = &scan.weapons[0];
        assert_eq!(weapon.name, "Quad launcher");
        assert_eq!(weapon.characteristics["R"], "60\" (x2)");
        assert_eq!(weapon.characteristics["S"], "5 (x3)");
        assert_eq!(weapon.characteristics["AP"], "4");
    }

    #[test]
    fn test_traits_column() {
        let edition = EditionProfile::horus_heresy_2e();
        let text = "\
Weapon       R     FP  RS  AP  D  Special Rules    Traits
Bolter       24\"   2   4   5   1  -                Bolt
Bolt pistol  12\"   1   4   5   1  Pistol           Bolt, Pistol";
        let scan = WeaponTableExtractor::new(&edition).extract(text);

        assert_eq!(scan.weapons.len(), 2);
        assert_eq!(scan.weapons[0].characteristics["D"], "1");
        assert_eq!(scan.weapons[0].traits, vec!["Bolt"]);
        assert_eq!(scan.weapons[1].special_rules, vec!["Pistol"]);
        assert_eq!(scan.weapons[1].traits, vec!["Bolt", "Pistol"]);
    }

    #[test]
    fn test_note_ends_at_full_stop() {
        let edition = first_edition();
        let text = "\
Weapon       R     S   AP  Special Rules
Meltagun     12\"   8   1   Assault 1, Melta
Note: Only one per squad.
Flamer       Template  4   5   Assault 1";
        let scan = WeaponTableExtractor::new(&edition).extract(text);

        assert_eq!(scan.weapons.len(), 2);
        assert_eq!(scan.weapons[0].note.as_deref(), Some("Only one per squad."));
        assert_eq!(scan.weapons[1].characteristics["R"], "Template");
    }

    #[test]
    fn test_headerless_continuation_page() {
        let edition = first_edition();
        let text = "\
Heavy bolter        36\"   5   4   Heavy 3
Autocannon          48\"   7   4   Heavy 2,
                                  Twin-linked";
        let scan = WeaponTableExtractor::new(&edition).extract_headerless(text);

        assert!(!scan.header_found);
        assert_eq!(scan.weapons.len(), 2);
        assert_eq!(scan.weapons[1].name, "Autocannon");
        assert_eq!(scan.weapons[1].special_rules, vec!["Heavy 2", "Twin-linked"]);
    }

    #[test]
    fn test_extract_required_without_header() {
        let edition = first_edition();
        let err = WeaponTableExtractor::new(&edition)
            .extract_required("Armoury\nNothing tabular here", 40)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::HeadersNotFound { page: 40, .. }));
    }

    #[test]
    fn test_merge_parentheticals() {
        let tokens: Vec<String> = ["60\"", "(x2)", "5", "(x3)", "4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            merge_parentheticals(&tokens, 3),
            Some(vec!["60\" (x2)".to_string(), "5 (x3)".to_string(), "4".to_string()])
        );
        assert_eq!(merge_parentheticals(&tokens, 4), None);
    }
}
