//! Rule/Paragraph Segmentation
//!
//! Turns a block of special rules prose into `rule name → body`. A short
//! line that does not end a sentence opens a new rule; lines
//! ending in a full stop or ellipsis close paragraphs. Editions that open
//! each rule with a narrative paragraph discard that first paragraph.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::edition::EditionProfile;
use crate::ingestion::text_utils::{ends_paragraph, is_blank};

/// A sentence end followed by the start of the next sentence.
static SENTENCE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([.…]["”’)]?) +(["“(]?[A-Z0-9])"#).expect("Invalid sentence break regex")
});

/// Rules found in a block plus the name candidates that had no body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSegmentation {
    pub rules: IndexMap<String, String>,
    pub dropped: Vec<String>,
}

impl RuleSegmentation {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RuleSegmenter {
    max_name_length: usize,
    first_paragraph_is_flavor: bool,
}

impl RuleSegmenter {
    pub fn new(max_name_length: usize, first_paragraph_is_flavor: bool) -> Self {
        Self {
            max_name_length,
            first_paragraph_is_flavor,
        }
    }

    pub fn from_edition(edition: &EditionProfile) -> Self {
        Self::new(edition.rule_name_max_length, edition.first_paragraph_is_flavor)
    }

    /// Whether `line` opens a new rule: shorter than the name limit and not
    /// ending a paragraph. A line ending in `,` `;` or `:` leads into the
    /// next line and never names a rule.
    fn is_rule_name(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.chars().count() < self.max_name_length
            && !ends_paragraph(trimmed)
            && !trimmed.ends_with([',', ';', ':'])
    }

    pub fn segment(&self, text: &str) -> RuleSegmentation {
        let mut result = RuleSegmentation::default();
        let mut current: Option<(String, String)> = None;
        let mut paragraph_count = 0usize;

        for line in text.lines() {
            if is_blank(line) {
                continue;
            }
            let trimmed = line.trim();

            if self.is_rule_name(trimmed) {
                if let Some((name, body)) = current.take() {
                    self.finish_rule(&mut result, name, body);
                }
                current = Some((trimmed.to_string(), String::new()));
                paragraph_count = usize::from(!self.first_paragraph_is_flavor);
                continue;
            }

            let Some((_, body)) = current.as_mut() else {
                continue;
            };

            let closes = ends_paragraph(trimmed);
            if paragraph_count >= 1 {
                body.push_str(trimmed);
                body.push(if closes { '\n' } else { ' ' });
            }
            if closes {
                paragraph_count += 1;
            }
        }

        if let Some((name, body)) = current.take() {
            self.finish_rule(&mut result, name, body);
        }

        if !result.dropped.is_empty() {
            tracing::warn!(dropped = ?result.dropped, "rule names without a body were dropped");
        }
        result
    }

    fn finish_rule(&self, result: &mut RuleSegmentation, name: String, body: String) {
        let body = body.trim_end();
        if body.is_empty() {
            result.dropped.push(name);
            return;
        }

        let mut body = SENTENCE_BREAK_RE.replace_all(body, "$1\n$2").into_owned();
        body.push('\n');

        match result.rules.get_mut(&name) {
            Some(existing) => existing.push_str(&body),
            None => {
                result.rules.insert(name, body);
            }
        }
    }
}
