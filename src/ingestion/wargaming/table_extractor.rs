//! Profile Table Extraction
//!
//! A line-scanning state machine for characteristic tables. A table starts
//! at a line containing the locator (the header row), and each following
//! line is either a data row (name cells followed by one cell per header),
//! a continuation of the previous row's name, or a footnote.

use serde::{Deserialize, Serialize};

use super::records::RawProfile;
use crate::ingestion::error::{ExtractionError, Result};
use crate::ingestion::text_utils::{
    char_len, ends_paragraph, is_blank, leading_spaces, looks_like_sentence, normalize_ws,
    split_cells,
};

// ============================================================================
// Table Description
// ============================================================================

/// Which table to look for and how its footnotes end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Characteristic headers in column order
    pub headers: Vec<String>,
    /// Whitespace-normalised text marking the header row
    pub locator: String,
    /// Accept a header row broken over two consecutive lines
    pub allow_staggered: bool,
    /// A footnote line ending in a full stop closes the footnote
    pub note_ends_at_full_stop: bool,
}

impl TableSpec {
    /// A table whose header row reads the headers in order.
    pub fn new(headers: Vec<String>) -> Self {
        let locator = headers.join(" ");
        Self {
            headers,
            locator,
            allow_staggered: false,
            note_ends_at_full_stop: false,
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = normalize_ws(&locator.into());
        self
    }

    pub fn with_staggered(mut self, allow: bool) -> Self {
        self.allow_staggered = allow;
        self
    }

    pub fn with_note_ends_at_full_stop(mut self, enabled: bool) -> Self {
        self.note_ends_at_full_stop = enabled;
        self
    }
}

/// Number of lines making up the header row starting at `idx`, if any.
///
/// With `allow_staggered` a header row broken across two lines matches when
/// the joined text contains the locator and the match begins on the first line.
pub(crate) fn locate_header(
    lines: &[&str],
    idx: usize,
    locator: &str,
    allow_staggered: bool,
) -> Option<usize> {
    let line = normalize_ws(lines[idx]);
    if line.is_empty() || locator.is_empty() {
        return None;
    }
    if line.contains(locator) {
        return Some(1);
    }
    if !allow_staggered {
        return None;
    }

    let next = lines.get(idx + 1).filter(|next| !is_blank(next))?;
    let joined = format!("{} {}", line, normalize_ws(next));
    match joined.find(locator) {
        Some(pos) if pos < line.len() => Some(2),
        _ => None,
    }
}

/// Text of a footnote opener, without its label.
pub(crate) fn note_text(trimmed: &str) -> Option<&str> {
    trimmed
        .strip_prefix("Notes:")
        .or_else(|| trimmed.strip_prefix("Note:"))
        .map(str::trim)
}

pub(crate) fn append_note(note: &mut Option<String>, text: &str) {
    match note {
        Some(existing) if !existing.is_empty() => {
            existing.push(' ');
            existing.push_str(text);
        }
        _ => *note = Some(text.to_string()),
    }
}

// ============================================================================
// Extracted Table
// ============================================================================

/// One data row: its name tokens and one cell per header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub name_cells: Vec<String>,
    pub cells: Vec<String>,
    pub note: Option<String>,
}

impl TableRow {
    pub fn name(&self) -> String {
        self.name_cells.join(" ")
    }
}

/// Rows of every table instance matching one [`TableSpec`] in a text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    /// Char column of the first data row's name, learned once
    pub name_column: Option<usize>,
    /// Line indices that belonged to the table (headers, rows, notes)
    #[serde(skip)]
    pub consumed_lines: Vec<usize>,
}

impl ProfileTable {
    /// Convert every row to a profile. Rows whose cell count does not
    /// match the headers come back as [`ExtractionError::ProfileMismatch`].
    pub fn profiles(&self) -> Vec<Result<RawProfile>> {
        self.rows
            .iter()
            .map(|row| RawProfile::from_cells(row.name(), &self.headers, &row.cells))
            .collect()
    }

    /// Render the rows back into an aligned table.
    ///
    /// Footnotes are written on their own line after their row; the header
    /// row is repeated after a footnote so the rows that follow are read
    /// as table rows again.
    pub fn to_text(&self, spec: &TableSpec) -> String {
        let names: Vec<String> = self.rows.iter().map(TableRow::name).collect();
        let name_width = names.iter().map(|n| char_len(n)).max().unwrap_or(0) + 2;
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.cells.get(i))
                    .map(|cell| char_len(cell))
                    .chain(std::iter::once(char_len(header)))
                    .max()
                    .unwrap_or(0)
                    + 2
            })
            .collect();

        let pad = |text: &str, width: usize| format!("{:<width$}", text, width = width);
        let mut header_line = pad("", name_width);
        for (header, width) in self.headers.iter().zip(&widths) {
            header_line.push_str(&pad(header, *width));
        }
        let mut header_line = header_line.trim_end().to_string();
        if !normalize_ws(&header_line).contains(&spec.locator) {
            header_line = spec.locator.clone();
        }

        let mut out = vec![header_line.clone()];
        for (idx, (row, name)) in self.rows.iter().zip(&names).enumerate() {
            let mut line = pad(name, name_width);
            for (cell, width) in row.cells.iter().zip(&widths) {
                line.push_str(&pad(cell, *width));
            }
            out.push(line.trim_end().to_string());

            if let Some(note) = &row.note {
                out.push(format!("Note: {}", note));
                if idx + 1 < self.rows.len() {
                    out.push(header_line.clone());
                }
            }
        }
        out.join("\n")
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// Runs the table state machine for one [`TableSpec`].
pub struct TableExtractor<'a> {
    spec: &'a TableSpec,
}

impl<'a> TableExtractor<'a> {
    pub fn new(spec: &'a TableSpec) -> Self {
        Self { spec }
    }

    /// Extract every table instance in `text`. `None` when the header row
    /// never appears.
    pub fn extract(&self, text: &str) -> Option<ProfileTable> {
        let lines: Vec<&str> = text.lines().collect();
        let expected_cells = self.spec.headers.len() + 1;

        let mut table = ProfileTable {
            headers: self.spec.headers.clone(),
            ..Default::default()
        };
        let mut found = false;
        let mut in_table = false;
        let mut in_note = false;
        let mut profile_index: Option<usize> = None;
        let mut rows_in_table = 0usize;
        let mut pending_name: Vec<String> = Vec::new();

        let mut idx = 0;
        while idx < lines.len() {
            let line = lines[idx];

            if let Some(span) =
                locate_header(&lines, idx, &self.spec.locator, self.spec.allow_staggered)
            {
                found = true;
                in_table = true;
                in_note = false;
                rows_in_table = 0;
                pending_name.clear();
                table.consumed_lines.extend(idx..idx + span);
                idx += span;
                continue;
            }

            let trimmed = line.trim();
            if let (Some(note), Some(row)) = (note_text(trimmed), profile_index) {
                append_note(&mut table.rows[row].note, note);
                in_note = true;
                table.consumed_lines.push(idx);
                idx += 1;
                continue;
            }

            if in_note {
                let left_of_names = table
                    .name_column
                    .is_some_and(|col| leading_spaces(line) < col);
                if is_blank(line) || left_of_names {
                    in_note = false;
                } else if let Some(row) = profile_index {
                    append_note(&mut table.rows[row].note, trimmed);
                    table.consumed_lines.push(idx);
                    if self.spec.note_ends_at_full_stop && ends_paragraph(line) {
                        in_note = false;
                    }
                    idx += 1;
                    continue;
                }
            }

            if !in_table {
                idx += 1;
                continue;
            }

            if is_blank(line) {
                if rows_in_table > 0 {
                    in_table = false;
                }
                idx += 1;
                continue;
            }
            let left_of_names = table
                .name_column
                .is_some_and(|col| leading_spaces(line) < col);
            if left_of_names || looks_like_sentence(line) {
                in_table = false;
                idx += 1;
                continue;
            }

            let cells = split_cells(line);
            if cells.len() < expected_cells {
                let fragment = cells.into_iter().map(|c| c.text);
                match profile_index.filter(|_| rows_in_table > 0) {
                    Some(row) => table.rows[row].name_cells.extend(fragment),
                    None => pending_name.extend(fragment),
                }
                table.consumed_lines.push(idx);
                idx += 1;
                continue;
            }

            let split = cells.len() - self.spec.headers.len();
            if table.name_column.is_none() {
                table.name_column = Some(cells[0].start);
            }
            let mut name_cells = std::mem::take(&mut pending_name);
            name_cells.extend(cells[..split].iter().map(|c| c.text.clone()));
            table.rows.push(TableRow {
                name_cells,
                cells: cells[split..].iter().map(|c| c.text.clone()).collect(),
                note: None,
            });
            profile_index = Some(table.rows.len() - 1);
            rows_in_table += 1;
            table.consumed_lines.push(idx);
            idx += 1;
        }

        if found {
            tracing::trace!(rows = table.rows.len(), locator = %self.spec.locator, "table extracted");
            Some(table)
        } else {
            None
        }
    }

    /// Extract a table that must be present.
    ///
    /// # Errors
    /// [`ExtractionError::HeadersNotFound`] when the header row is absent.
    pub fn extract_required(&self, text: &str, page: u32) -> Result<ProfileTable> {
        self.extract(text)
            .ok_or_else(|| ExtractionError::headers_not_found(page, &self.spec.headers))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn infantry_spec() -> TableSpec {
        TableSpec::new(
            ["WS", "BS", "S", "T", "W", "I", "A", "Ld", "Sv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    const TACTICAL: &str = "\
                  WS  BS  S  T  W  I  A  Ld  Sv
Legionary         4   4   4  4  1  4  1  7   3+
Legion Sergeant   4   4   4  4  1  4  2  8   3+

Unit Composition";

    #[test]
    fn test_extracts_rows() {
        let spec = infantry_spec();
        let table = TableExtractor::new(&spec).extract(TACTICAL).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].name(), "Legionary");
        assert_eq!(table.rows[1].name(), "Legion Sergeant");
        assert_eq!(table.rows[1].cells[6], "2");
        assert_eq!(table.rows[1].cells[8], "3+");
        assert_eq!(table.name_column, Some(0));
        assert_eq!(table.consumed_lines, vec![0, 1, 2]);
    }

    #[test]
    fn test_profiles_match_headers() {
        let spec = infantry_spec();
        let table = TableExtractor::new(&spec).extract(TACTICAL).unwrap();
        let profile = table.profiles().remove(0).unwrap();
        assert_eq!(profile.characteristics.len(), 9);
        assert_eq!(profile.characteristics["Sv"], "3+");
    }

    #[test]
    fn test_continuation_extends_previous_name() {
        let text = "\
             WS  BS  S  T  W  I  A  Ld  Sv
Legion       4   4   4  4  1  4  1  7   3+
Centurion
Legionary    4   4   4  4  1  4  1  7   3+";
        let spec = infantry_spec();
        let table = TableExtractor::new(&spec).extract(text).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].name(), "Legion Centurion");
        assert_eq!(table.rows[1].name(), "Legionary");
    }

    #[test]
    fn test_continuation_before_first_row_prefixes_name() {
        let text = "\
              WS  BS  S  T  W  I  A  Ld  Sv
Legion
Chaplain      5   5   4  4  2  5  2  9   2+";
        let spec = infantry_spec();
        let table = TableExtractor::new(&spec).extract(text).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].name(), "Legion Chaplain");
    }

    #[test]
    fn test_note_attaches_to_current_row() {
        let text = "\
           WS  BS  S  T  W  I  A  Ld  Sv
Praetor    6   5   4  4  3  5  4  10  2+
Note: The Praetor may
be upgraded.

Moritat    5   5   4  4  2  5  2  9   3+";
        let spec = infantry_spec();
        let table = TableExtractor::new(&spec).extract(text).unwrap();

        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0].note.as_deref(),
            Some("The Praetor may be upgraded.")
        );
    }

    #[test]
    fn test_sentence_closes_table() {
        let text = "\
           WS  BS  S  T  W  I  A  Ld  Sv
Praetor    6   5   4  4  3  5  4  10  2+
The Praetor is the commander of the force and leads from the front";
        let spec = infantry_spec();
        let table = TableExtractor::new(&spec).extract(text).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].name(), "Praetor");
    }

    #[test]
    fn test_staggered_header() {
        let text = "\
           WS  BS  S  T  W
                             I  A  Ld  Sv
Praetor    6   5   4  4  3  5  4  10  2+";
        let spec = infantry_spec().with_staggered(true);
        let table = TableExtractor::new(&spec).extract(text).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.consumed_lines, vec![0, 1, 2]);

        let strict = infantry_spec();
        assert!(TableExtractor::new(&strict).extract(text).is_none());
    }

    #[test]
    fn test_missing_header_is_unrecoverable() {
        let spec = infantry_spec();
        let err = TableExtractor::new(&spec)
            .extract_required("no table here", 7)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::HeadersNotFound { page: 7, .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_to_text_round_trip() {
        let text = "\
           WS  BS  S  T  W  I  A  Ld  Sv
Legion
Praetor    6   5   4  4  3  5  4  10  2+
Moritat    5   5   4  4  2  5  2  9   3+
Note: Command squad only.";
        let spec = infantry_spec();
        let first = TableExtractor::new(&spec).extract(text).unwrap();
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.rows[0].name(), "Legion Praetor");

        let rendered = first.to_text(&spec);
        let second = TableExtractor::new(&spec).extract(&rendered).unwrap();
        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn test_to_text_repeats_header_after_note() {
        let spec = infantry_spec();
        let row = |name: &str, note: Option<&str>| TableRow {
            name_cells: vec![name.to_string()],
            cells: vec!["4".to_string(); 9],
            note: note.map(str::to_string),
        };
        let table = ProfileTable {
            headers: spec.headers.clone(),
            rows: vec![row("Praetor", Some("Once per army.")), row("Moritat", None)],
            ..Default::default()
        };

        let rendered = table.to_text(&spec);
        assert_eq!(rendered.matches("WS  BS").count(), 2);

        let reparsed = TableExtractor::new(&spec).extract(&rendered).unwrap();
        assert_eq!(reparsed.rows, table.rows);
    }
}
