//! Line-level text helpers shared by the layout and extraction passes.
//!
//! All column arithmetic is done in `char` offsets, never bytes: converter
//! output carries bullets ("●") and typographic quotes that are multi-byte.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Characters that open a bulleted list item.
pub const BULLETS: &[char] = &['●', '•', '■', '*', '-', '–'];

static DOT_LEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\.{2,}[\s.]*").expect("Invalid dot leader regex"));

static WHITESPACE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// A whitespace-delimited token and the char column it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub start: usize,
}

impl Cell {
    /// Char column one past the last character of the token.
    pub fn end(&self) -> usize {
        self.start + self.text.chars().count()
    }
}

/// Fold converter artifacts before any layout work: NFKC turns ligatures
/// into plain letters and non-breaking spaces into spaces, and CRLF becomes LF.
pub fn normalize_page_text(text: &str) -> String {
    text.replace("\r\n", "\n").nfkc().collect()
}

/// Number of leading space characters.
pub fn leading_spaces(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

/// Length of a line in chars.
pub fn char_len(line: &str) -> usize {
    line.chars().count()
}

/// Collapse every whitespace run to a single space and trim.
pub fn normalize_ws(text: &str) -> String {
    WHITESPACE_RUN_RE.replace_all(text.trim(), " ").into_owned()
}

/// Whether a line is empty or whitespace only.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Whether a line closes a paragraph: it ends in a full stop or an ellipsis,
/// ignoring closing quotes and brackets.
pub fn ends_paragraph(line: &str) -> bool {
    let trimmed = line
        .trim_end()
        .trim_end_matches(|c| matches!(c, '"' | '\'' | '”' | '’' | ')'));
    trimmed.ends_with('.') || trimmed.ends_with('…')
}

/// Heuristic for "this line is prose, not a table row".
///
/// Table cells are separated by runs of spaces; prose uses single spaces
/// and is dominated by lowercase words.
pub fn looks_like_sentence(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.contains("  ") {
        return false;
    }
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() < 5 {
        return false;
    }
    let lowercase_words = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_lowercase()))
        .count();
    lowercase_words >= 3
}

/// Whether the trimmed line opens a list item.
pub fn starts_with_bullet(line: &str) -> bool {
    line.trim_start().starts_with(BULLETS)
}

/// Remove a leading bullet and the whitespace after it.
pub fn strip_bullet(line: &str) -> &str {
    line.trim_start().trim_start_matches(BULLETS).trim_start()
}

/// Remove dot leaders ("Power sword ........ +10 points") leaving a single
/// space where they were, then trim.
pub fn strip_dot_leaders(text: &str) -> String {
    DOT_LEADER_RE.replace_all(text, " ").trim().to_string()
}

/// Split on whitespace, keeping each token's starting char column.
pub fn split_cells(line: &str) -> Vec<Cell> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (idx, ch) in line.chars().enumerate() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                cells.push(Cell {
                    text: std::mem::take(&mut current),
                    start,
                });
            }
        } else {
            if current.is_empty() {
                start = idx;
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        cells.push(Cell {
            text: current,
            start,
        });
    }

    cells
}

/// Split a rules list on commas that are not inside parentheses.
///
/// `"Heavy 1, Blast (3\", 5\"), Pinning"` yields three names.
pub fn split_top_level_commas(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for ch in text.chars() {
        match ch {
            '(' | '[' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| normalize_ws(&p))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Substring of `line` covering char columns `[start, end)`, clamped.
pub fn char_slice(line: &str, start: usize, end: usize) -> String {
    line.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}
