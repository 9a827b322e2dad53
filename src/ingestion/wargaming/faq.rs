//! FAQ and errata pages.
//!
//! Each entry's title line carries a "(Page N)" reference; the lines up to
//! the next titled entry are its text.

use regex::Regex;
use std::sync::LazyLock;

use super::records::FaqEntry;
use crate::ingestion::text_utils::is_blank;

/// Title lines contain this marker.
pub const PAGE_MARKER: &str = "(Page";

static PAGE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(Pages?\s+([^)]+)\)").expect("Invalid page reference regex"));

pub fn parse_faq(text: &str) -> Vec<FaqEntry> {
    let mut entries: Vec<FaqEntry> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.contains(PAGE_MARKER) {
            let page = PAGE_REF_RE
                .captures(trimmed)
                .map(|caps| caps[1].trim().to_string())
                .unwrap_or_default();
            entries.push(FaqEntry {
                title: trimmed.to_string(),
                page,
                text: String::new(),
            });
            continue;
        }

        // Lines before the first entry are the page's own heading
        let Some(entry) = entries.last_mut() else {
            continue;
        };
        if is_blank(trimmed) {
            continue;
        }
        if !entry.text.is_empty() {
            entry.text.push('\n');
        }
        entry.text.push_str(trimmed);
    }

    entries
}
