//! Column Divider Detection
//!
//! Locates the gutter between two text columns of a converter-rendered page
//! using a per-column whitespace density profile. The gutter is where the
//! density falls off most steeply: many lines are blank up to it and carry
//! text immediately after it.

use serde::{Deserialize, Serialize};

use crate::ingestion::error::{ExtractionError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Columns skipped on the left so bullet indentation is never taken for a gutter.
pub const DEFAULT_LEFT_MARGIN: usize = 4;

/// Narrowest divider the splitter will work with.
pub const MIN_DIVIDER_WIDTH: usize = 2;

// ============================================================================
// Types
// ============================================================================

/// Char-offset range `[start, end)` of an inferred gutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDivider {
    pub start: usize,
    pub end: usize,
}

impl ColumnDivider {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Divider known only by its end column; the start defaults to two
    /// columns to the left.
    pub fn from_end(end: usize) -> Self {
        Self {
            start: end.saturating_sub(MIN_DIVIDER_WIDTH),
            end,
        }
    }

    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

// ============================================================================
// Finder
// ============================================================================

/// Finds the best vertical split point of a text block.
#[derive(Debug, Clone)]
pub struct ColumnDividerFinder {
    left_margin: usize,
    min_width: usize,
}

impl Default for ColumnDividerFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnDividerFinder {
    /// Create a finder with the default margin and minimum width.
    pub fn new() -> Self {
        Self {
            left_margin: DEFAULT_LEFT_MARGIN,
            min_width: MIN_DIVIDER_WIDTH,
        }
    }

    /// Create a finder with custom margin and minimum divider width.
    pub fn with_settings(left_margin: usize, min_width: usize) -> Self {
        Self {
            left_margin,
            min_width: min_width.max(1),
        }
    }

    /// Count, for each char column, the lines that are blank at that column
    /// (either a space or past the end of the line).
    pub fn whitespace_density(&self, text: &str) -> Vec<usize> {
        let lines: Vec<Vec<char>> = text.lines().map(|l| l.chars().collect()).collect();
        let width = lines.iter().map(Vec::len).max().unwrap_or(0);

        (0..width)
            .map(|col| {
                lines
                    .iter()
                    .filter(|line| col >= line.len() || line[col] == ' ')
                    .count()
            })
            .collect()
    }

    /// Locate the divider of a block.
    ///
    /// # Errors
    /// [`ExtractionError::EmptyBlock`] when the block has no characters;
    /// callers are expected to guard against that.
    pub fn find(&self, text: &str) -> Result<ColumnDivider> {
        let density = self.whitespace_density(text);
        if density.is_empty() {
            return Err(ExtractionError::EmptyBlock);
        }
        let width = density.len();

        // Steepest decrease between neighbouring columns; ties keep the leftmost.
        let mut steepest: Option<(usize, usize)> = None;
        for idx in self.left_margin..width.saturating_sub(1) {
            if density[idx] <= density[idx + 1] {
                continue;
            }
            let drop = density[idx] - density[idx + 1];
            if steepest.map_or(true, |(_, best)| drop > best) {
                steepest = Some((idx, drop));
            }
        }

        let (mut start, end) = match steepest {
            Some((edge, _)) => {
                let mut start = edge;
                while start > 0 && density[start - 1] == density[edge] {
                    start -= 1;
                }
                (start, edge + 1)
            }
            None => (width.saturating_sub(self.min_width), width),
        };

        if end - start < self.min_width {
            start = end.saturating_sub(self.min_width);
        }

        tracing::trace!(start, end, "column divider located");
        Ok(ColumnDivider::new(start, end))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_column_block(left_width: usize, gutter: usize, rows: usize) -> String {
        (0..rows)
            .map(|i| {
                let left: String = std::iter::repeat('a').take(left_width).collect();
                let right = if i % 2 == 0 { "bbbbbbbb" } else { "bbbb" };
                format!("{}{}{}", left, " ".repeat(gutter), right)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_divider_brackets_gutter() {
        let block = two_column_block(20, 4, 6);
        let divider = ColumnDividerFinder::new().find(&block).unwrap();
        assert_eq!(divider, ColumnDivider::new(20, 24));
    }

    #[test]
    fn test_divider_with_ragged_left_column() {
        let block = "\
Unit Composition      Unit Type
● 9 Legionaries       ● Legionary: Infantry
● 1 Legion Sergeant   ● Legion Sergeant: Infantry
Wargear               Special Rules
● Bolter              ● Legiones Astartes";
        let divider = ColumnDividerFinder::new().find(block).unwrap();
        assert_eq!(divider.end, 22);
        assert_eq!(divider.start, 19);
    }

    #[test]
    fn test_narrow_gutter_is_widened_leftward() {
        let block = "aaaaaa bbbb\naaaaaa bbbb\naaaaaa bbbb";
        let divider = ColumnDividerFinder::new().find(block).unwrap();
        assert_eq!(divider.end, 7);
        assert_eq!(divider.width(), MIN_DIVIDER_WIDTH);
    }

    #[test]
    fn test_empty_block_fails() {
        let finder = ColumnDividerFinder::new();
        assert!(matches!(finder.find(""), Err(ExtractionError::EmptyBlock)));
        assert!(matches!(finder.find("\n\n"), Err(ExtractionError::EmptyBlock)));
    }

    #[test]
    fn test_density_counts_short_lines_as_blank() {
        let density = ColumnDividerFinder::new().whitespace_density("ab\na");
        assert_eq!(density, vec![0, 1]);
    }

    #[test]
    fn test_from_end_defaults_start() {
        let divider = ColumnDivider::from_end(30);
        assert_eq!(divider.start, 28);
        assert_eq!(ColumnDivider::from_end(1).start, 0);
    }
}
