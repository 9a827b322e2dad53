//! Option Groups
//!
//! Parses a datasheet's "Options" subheading:
//!
//! ```text
//! ● A Legion Tactical Squad may include:
//!   - Up to 10 additional Legionaries ........ +10 points per model
//! ● The Legion Sergeant may exchange his bolter for one of the following:
//!   - Power sword ............................. +10 points
//!   - Plasma pistol ........................... +15 points
//! ```
//!
//! Bulleted lines without a cost open a group; lines with a cost are its
//! options. "Up to N additional X" lines raise a model's maximum instead of
//! becoming options.

use regex::Regex;
use std::sync::LazyLock;

use super::records::{singular_key, OptionGroup, RawUnit, UnitOption};
use crate::ingestion::text_utils::{is_blank, starts_with_bullet, strip_bullet, strip_dot_leaders};

static POINTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\+?\s*(\d+)\s*(?:points?|pts)\b").expect("Invalid points regex")
});

static FREE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\.{2,}\s*|\s{2,})free\b").expect("Invalid free regex"));

static ADDITIONAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^up to (\w+) additional (.+?)(?:\s*\.{2,}.*|\s+\+.*|\s+at\s+.*)?$")
        .expect("Invalid additional models regex")
});

static UP_TO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bup to (\w+)\b").expect("Invalid up-to regex"));

static COUNT_OF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(one|two|three|four|five)\s+of the following").expect("Invalid count regex")
});

/// Parse "3", "three" and friends.
pub(crate) fn parse_count(word: &str) -> Option<u32> {
    if let Ok(n) = word.parse() {
        return Some(n);
    }
    let n = match word.to_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        _ => return None,
    };
    Some(n)
}

/// "Up to N additional X" with the cost of each extra model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalModels {
    pub model: String,
    pub count: u32,
    pub points: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    pub groups: Vec<OptionGroup>,
    pub additional: Vec<AdditionalModels>,
    pub unparsed: Vec<String>,
}

/// Cost of an option line, and the text in front of the cost.
fn split_cost(text: &str) -> Option<(String, u32)> {
    if let Some(caps) = POINTS_RE.captures(text) {
        let whole = caps.get(0)?;
        let points = caps[1].parse().ok()?;
        return Some((strip_dot_leaders(&text[..whole.start()]), points));
    }
    FREE_RE
        .find(text)
        .map(|m| (strip_dot_leaders(&text[..m.start()]), 0))
}

fn group_bounds(description: &str, option_count: usize) -> (u32, u32) {
    let lowered = description.to_lowercase();
    if let Some(n) = COUNT_OF_RE.captures(&lowered).and_then(|c| parse_count(&c[1])) {
        return (0, n);
    }
    if let Some(n) = UP_TO_RE.captures(&lowered).and_then(|c| parse_count(&c[1])) {
        return (0, n);
    }
    if lowered.contains("exchange") || lowered.contains("replace") {
        return (0, 1);
    }
    (0, option_count as u32)
}

/// Parse the text of an Options subheading.
pub fn parse_options(text: &str) -> ParsedOptions {
    let mut parsed = ParsedOptions::default();
    let mut description: Option<String> = None;
    let mut options: Vec<UnitOption> = Vec::new();
    let mut last_was_description = false;

    let flush = |parsed: &mut ParsedOptions, description: Option<String>, options: &mut Vec<UnitOption>| {
        if options.is_empty() {
            return;
        }
        let description = description.unwrap_or_default();
        let (min, max) = group_bounds(&description, options.len());
        parsed.groups.push(OptionGroup {
            description,
            min,
            max,
            options: std::mem::take(options),
        });
    };

    for line in text.lines() {
        if is_blank(line) {
            continue;
        }
        let trimmed = line.trim();
        let content = trimmed.strip_prefix("Options:").unwrap_or(trimmed).trim();
        if content.is_empty() {
            continue;
        }
        let item = strip_bullet(content);

        if let Some(caps) = ADDITIONAL_RE.captures(item) {
            let count = parse_count(&caps[1]);
            let points = split_cost(item).map(|(_, p)| p).unwrap_or(0);
            match count {
                Some(count) => parsed.additional.push(AdditionalModels {
                    model: caps[2].trim().to_string(),
                    count,
                    points,
                }),
                None => parsed.unparsed.push(item.to_string()),
            }
            last_was_description = false;
            continue;
        }

        match split_cost(item) {
            Some((name, points)) if !name.is_empty() => {
                options.push(UnitOption { name, points });
                last_was_description = false;
            }
            Some(_) => parsed.unparsed.push(item.to_string()),
            None if starts_with_bullet(content) || description.is_none() => {
                flush(&mut parsed, description.take(), &mut options);
                description = Some(item.to_string());
                last_was_description = true;
            }
            None if last_was_description => {
                if let Some(desc) = description.as_mut() {
                    desc.push(' ');
                    desc.push_str(item);
                }
            }
            None => match options.last_mut() {
                Some(option) => {
                    option.name.push(' ');
                    option.name.push_str(item);
                }
                None => parsed.unparsed.push(item.to_string()),
            },
        }
    }
    flush(&mut parsed, description, &mut options);

    parsed
}

/// The model an option group is about: the longest model name mentioned in
/// the description, or `None` for unit-wide groups.
fn target_model(unit: &RawUnit, description: &str) -> Option<usize> {
    let key = singular_key(description);
    unit.models
        .iter()
        .enumerate()
        .filter(|(_, m)| {
            let name = singular_key(m.name());
            !name.is_empty() && key.contains(&name)
        })
        .max_by_key(|(_, m)| m.name().len())
        .map(|(idx, _)| idx)
}

/// Parse an Options subheading into `unit`.
pub fn apply_options(unit: &mut RawUnit, text: &str) {
    let parsed = parse_options(text);

    for extra in parsed.additional {
        match unit.find_model(&extra.model) {
            Some(idx) => {
                let model = &mut unit.models[idx];
                model.max += extra.count;
                model.additional_model_cost = Some(extra.points);
            }
            None => unit.push_error(format!(
                "additional models name unknown model '{}'",
                extra.model
            )),
        }
    }

    for group in parsed.groups {
        match target_model(unit, &group.description) {
            Some(idx) => unit.models[idx].option_groups.push(group),
            None => unit.option_groups.push(group),
        }
    }

    for line in parsed.unparsed {
        unit.push_error(format!("unparsed option line '{}'", line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::wargaming::records::{Characteristics, RawModel, RawProfile};

    const TACTICAL_OPTIONS: &str = "\
Options:
● A Legion Tactical Squad may include:
  - Up to 10 additional Legionaries ........ +10 points per model
● The entire squad may take:
  - Melta bombs ............................ +5 points per model
● The Legion Sergeant may exchange his bolter
  for one of the following:
  - Power sword ............................ +10 points
  - Plasma pistol .......................... +15 points
  - Chainsword ............................. Free";

    fn tactical_unit() -> RawUnit {
        let mut unit = RawUnit::new("Legion Tactical Squad", 100);
        for name in ["Legionary", "Legion Sergeant"] {
            let mut model = RawModel::new(RawProfile {
                name: name.to_string(),
                characteristics: Characteristics::new(),
            });
            model.min = 9;
            model.max = 9;
            unit.models.push(model);
        }
        unit
    }

    #[test]
    fn test_parse_options() {
        let parsed = parse_options(TACTICAL_OPTIONS);

        assert_eq!(
            parsed.additional,
            vec![AdditionalModels {
                model: "Legionaries".to_string(),
                count: 10,
                points: 10,
            }]
        );
        assert_eq!(parsed.groups.len(), 2);
        assert_eq!(parsed.groups[0].options[0].name, "Melta bombs");
        assert_eq!(parsed.groups[0].max, 1);

        let exchange = &parsed.groups[1];
        assert!(exchange.description.ends_with("for one of the following:"));
        assert_eq!(exchange.max, 1);
        assert_eq!(exchange.options.len(), 3);
        assert_eq!(exchange.options[2].points, 0);
        assert!(parsed.unparsed.is_empty());
    }

    #[test]
    fn test_apply_options() {
        let mut unit = tactical_unit();
        apply_options(&mut unit, TACTICAL_OPTIONS);

        assert_eq!(unit.models[0].max, 19);
        assert_eq!(unit.models[0].additional_model_cost, Some(10));
        assert_eq!(unit.option_groups.len(), 1);
        assert_eq!(unit.models[1].option_groups.len(), 1);
        assert!(unit.errors.is_empty());
    }

    #[test]
    fn test_unknown_additional_model_is_reported() {
        let mut unit = tactical_unit();
        apply_options(&mut unit, "● Up to 2 additional Servitors ... +15 points each");
        assert_eq!(unit.errors.len(), 1);
    }

    #[test]
    fn test_group_bounds() {
        assert_eq!(group_bounds("may take up to two of the following", 4), (0, 2));
        assert_eq!(group_bounds("may take any of the following", 4), (0, 4));
        assert_eq!(group_bounds("may replace its bolter with", 3), (0, 1));
    }
}
