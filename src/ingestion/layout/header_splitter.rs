//! Header-Anchored Splitting
//!
//! Splits page text at literal header strings. Three flavours are needed by
//! the datasheet and page passes:
//!
//! - [`split_at_header`]: first (or nth) occurrence, optionally only where
//!   the header ends its line
//! - [`split_after_indented_header`]: a header whose body is an indented
//!   block; the block ends at the first indentation mismatch
//! - [`first_non_list_or_header_line`]: end of the two-column
//!   composition/wargear block that precedes free-form subsections
//!
//! Every split borrows from the input, so `before + rest` is the input.

use crate::ingestion::text_utils::{is_blank, leading_spaces, starts_with_bullet, strip_bullet};

/// Nested option lists inside a column are introduced by this label.
const NESTED_OPTIONS_LABEL: &str = "Options:";

/// Result of splitting text at a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSplit<'a> {
    /// Whether the header was located.
    pub found: bool,
    /// Text before the split point (the whole text when not found).
    pub before: &'a str,
    /// Text from the split point onward (empty when not found).
    pub rest: &'a str,
}

impl<'a> HeaderSplit<'a> {
    fn not_found(text: &'a str) -> Self {
        Self {
            found: false,
            before: text,
            rest: "",
        }
    }

    fn at(text: &'a str, index: usize) -> Self {
        Self {
            found: true,
            before: &text[..index],
            rest: &text[index..],
        }
    }
}

/// Split at the first occurrence of `header`.
///
/// With `header_at_end_of_line` only occurrences followed (after optional
/// trailing spaces) by a line break count.
pub fn split_at_header<'a>(header: &str, text: &'a str, header_at_end_of_line: bool) -> HeaderSplit<'a> {
    split_at_nth_header(header, text, 0, header_at_end_of_line)
}

/// Split at the `n`th (zero-based) qualifying occurrence of `header`.
pub fn split_at_nth_header<'a>(
    header: &str,
    text: &'a str,
    n: usize,
    header_at_end_of_line: bool,
) -> HeaderSplit<'a> {
    if header.is_empty() {
        return HeaderSplit::not_found(text);
    }

    text.match_indices(header)
        .filter(|(idx, _)| {
            if !header_at_end_of_line {
                return true;
            }
            let after = text[idx + header.len()..].trim_start_matches([' ', '\t']);
            after.starts_with('\n') || after.starts_with("\r\n")
        })
        .nth(n)
        .map(|(idx, _)| HeaderSplit::at(text, idx))
        .unwrap_or_else(|| HeaderSplit::not_found(text))
}

/// Split after the indented block that follows `header`.
///
/// The header must start a line (ignoring indentation). The expected
/// indentation is the column of the first character after the header on
/// that line, or the indentation of the next line when the header stands
/// alone. The block runs while lines keep that indentation; `before` holds
/// the header line and its block, `rest` starts at the first line whose
/// indentation differs.
pub fn split_after_indented_header<'a>(text: &'a str, header: &str) -> HeaderSplit<'a> {
    let mut offsets = Vec::new();
    let mut pos = 0;
    for line in text.split_inclusive('\n') {
        offsets.push((pos, line));
        pos += line.len();
    }

    let Some(header_idx) = offsets
        .iter()
        .position(|(_, line)| line.trim_start().starts_with(header))
    else {
        return HeaderSplit::not_found(text);
    };

    let header_line = offsets[header_idx].1.trim_end_matches(['\n', '\r']);
    let header_end_col = leading_spaces(header_line) + header.chars().count();
    let tail = header_line.chars().skip(header_end_col);
    let inline_indent = tail
        .enumerate()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| header_end_col + i);

    let mut scan_from = header_idx + 1;
    let expected_indent = match inline_indent {
        Some(indent) => indent,
        None => match offsets.get(header_idx + 1) {
            Some((_, next)) if !is_blank(next) => {
                scan_from += 1;
                leading_spaces(next)
            }
            _ => return split_or_end(text, &offsets, header_idx + 1),
        },
    };

    let split_idx = offsets
        .iter()
        .enumerate()
        .skip(scan_from)
        .find(|(_, (_, line))| is_blank(line) || leading_spaces(line) != expected_indent)
        .map(|(i, _)| i)
        .unwrap_or(offsets.len());

    split_or_end(text, &offsets, split_idx)
}

fn split_or_end<'a>(text: &'a str, offsets: &[(usize, &str)], line_idx: usize) -> HeaderSplit<'a> {
    match offsets.get(line_idx) {
        Some((byte, _)) => HeaderSplit::at(text, *byte),
        None => HeaderSplit::at(text, text.len()),
    }
}

/// Index of the first line after the first that ends a bulleted two-column block.
///
/// A line keeps the block going when it starts with one of `headers`, opens a
/// list item or parenthesis at the bullet indentation, or is indented at
/// least as deep as the established list text. A nested `Options:` label
/// inside a column opens a sub-list whose bullets never stop the block; the
/// same label at the block's own margin begins the free-form subsections.
///
/// Returns the line count when the block runs to the end of the text.
pub fn first_non_list_or_header_line(text: &str, headers: &[&str]) -> usize {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= 1 {
        return lines.len();
    }

    let base_indent = leading_spaces(lines[0]);
    let Some(first_item) = lines.iter().skip(1).find(|l| !is_blank(l)) else {
        return lines.len();
    };
    let bullet_indent = leading_spaces(first_item);
    let list_indent = if starts_with_bullet(first_item) {
        let item = first_item.trim_start();
        bullet_indent + item.chars().count() - strip_bullet(item).chars().count()
    } else {
        bullet_indent
    };

    let mut nested_options = false;
    for (idx, line) in lines.iter().enumerate().skip(1) {
        if is_blank(line) {
            continue;
        }
        let indent = leading_spaces(line);
        let trimmed = line.trim_start();

        if headers.iter().any(|h| trimmed.starts_with(h)) {
            nested_options = false;
            continue;
        }
        if trimmed.starts_with(NESTED_OPTIONS_LABEL) {
            if indent > base_indent {
                nested_options = true;
                continue;
            }
            return idx;
        }
        if nested_options && trimmed.starts_with('●') {
            continue;
        }
        if starts_with_bullet(trimmed) || trimmed.starts_with('(') {
            if indent == bullet_indent || indent >= list_indent {
                continue;
            }
            return idx;
        }
        if indent >= list_indent && indent > base_indent {
            continue;
        }
        return idx;
    }

    lines.len()
}

// ============================================================================
// Tests
// ============================================================================
