//! Column Splitting
//!
//! Partitions each line of a block into text outside the columns, column 1
//! and column 2 using a previously located divider. Pages switch between
//! full-width and two-column layout mid-block, so the output is a list of
//! sections in top-to-bottom order.

use serde::{Deserialize, Serialize};

use super::column_divider::{ColumnDivider, ColumnDividerFinder};
use crate::ingestion::text_utils::{char_len, char_slice, is_blank};

// ============================================================================
// Types
// ============================================================================

/// One stretch of a block: the full-width lines that lead into it and the
/// two columns that follow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub non_column_text: String,
    pub column_1: String,
    pub column_2: String,
    pub original_text: String,
}

impl Section {
    /// Whether any line of the section was split into columns.
    pub fn has_columns(&self) -> bool {
        !self.column_1.trim().is_empty() || !self.column_2.trim().is_empty()
    }

    /// Text in reading order: the full-width lead-in, then column 1, then column 2.
    pub fn reading_order(&self) -> String {
        [&self.non_column_text, &self.column_1, &self.column_2]
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .map(|part| part.trim_end_matches('\n'))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Default)]
struct SectionBuilder {
    non_column: Vec<String>,
    column_1: Vec<String>,
    column_2: Vec<String>,
    original: Vec<String>,
}

impl SectionBuilder {
    fn finish(self) -> Section {
        Section {
            non_column_text: self.non_column.join("\n"),
            column_1: self.column_1.join("\n"),
            column_2: self.column_2.join("\n"),
            original_text: self.original.join("\n"),
        }
    }
}

// ============================================================================
// Splitting
// ============================================================================

/// Split a block into sections at `divider`.
///
/// A line has a column break when it reaches the divider end and is blank
/// across the divider. Shorter lines inherit the previous line's status and
/// then only feed column 1. Blank lines follow the previous line and never
/// open or close a section; a break followed by a non-break starts a new one.
pub fn split_columns(text: &str, divider: ColumnDivider) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = SectionBuilder::default();
    let mut previous_had_break = false;

    for line in text.split('\n') {
        if is_blank(line) {
            if previous_had_break {
                current.column_1.push(String::new());
                current.column_2.push(String::new());
            } else {
                current.non_column.push(line.to_string());
            }
            current.original.push(line.to_string());
            continue;
        }

        let is_long = char_len(line) >= divider.end;
        let has_break = if is_long {
            char_slice(line, divider.start, divider.end)
                .chars()
                .all(|c| c == ' ')
        } else {
            previous_had_break
        };

        if previous_had_break && !has_break {
            sections.push(std::mem::take(&mut current).finish());
        }

        if has_break {
            if is_long {
                current
                    .column_1
                    .push(char_slice(line, 0, divider.start).trim_end().to_string());
                current.column_2.push(
                    char_slice(line, divider.end, char_len(line))
                        .trim_end()
                        .to_string(),
                );
            } else {
                current.column_1.push(line.trim_end().to_string());
            }
        } else {
            current.non_column.push(line.to_string());
        }

        current.original.push(line.to_string());
        previous_had_break = has_break;
    }

    sections.push(current.finish());
    sections
}

/// Split using only the divider end; the start defaults to two columns left of it.
pub fn split_columns_at(text: &str, divider_end: usize) -> Vec<Section> {
    split_columns(text, ColumnDivider::from_end(divider_end))
}

/// Locate the divider of `text` and return the block in reading order.
///
/// Blocks without any characters are returned unchanged.
pub fn reading_order_text(text: &str, finder: &ColumnDividerFinder) -> String {
    match finder.find(text) {
        Ok(divider) => split_columns(text, divider)
            .iter()
            .map(Section::reading_order)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Err(_) => text.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
