//! Property-based tests for rule segmentation
//!
//! Tests invariants:
//! - Each short title line followed by sentences becomes one rule
//! - Bodies keep one sentence per line
//! - A flavor-only rule is dropped, never emitted empty

use proptest::prelude::*;

use crate::ingestion::wargaming::RuleSegmenter;

fn sentence() -> impl Strategy<Value = String> {
    ("[A-Z][a-z]{2,8}", prop::collection::vec("[a-z]{2,8}", 3..9))
        .prop_map(|(first, rest)| format!("{} {}.", first, rest.join(" ")))
}

fn rules() -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    prop::collection::hash_set("[A-Z][a-z]{3,10}", 1..6).prop_flat_map(|names| {
        let names: Vec<String> = names.into_iter().collect();
        let count = names.len();
        (
            Just(names),
            prop::collection::vec(prop::collection::vec(sentence(), 1..4), count),
        )
            .prop_map(|(names, bodies)| names.into_iter().zip(bodies).collect())
    })
}

fn render(rules: &[(String, Vec<String>)]) -> String {
    rules
        .iter()
        .flat_map(|(name, body)| std::iter::once(name.clone()).chain(body.iter().cloned()))
        .collect::<Vec<_>>()
        .join("\n")
}

proptest! {
    #[test]
    fn prop_every_rule_keeps_its_body(rules in rules()) {
        let result = RuleSegmenter::new(50, false).segment(&render(&rules));

        prop_assert_eq!(result.rules.len(), rules.len());
        prop_assert!(result.dropped.is_empty());
        for (name, body) in &rules {
            prop_assert_eq!(&result.rules[name], &format!("{}\n", body.join("\n")));
        }
    }

    #[test]
    fn prop_flavor_paragraph_is_discarded(rules in rules()) {
        let result = RuleSegmenter::new(50, true).segment(&render(&rules));

        for (name, body) in &rules {
            if body.len() == 1 {
                prop_assert!(result.dropped.contains(name));
                prop_assert!(!result.rules.contains_key(name));
            } else {
                prop_assert_eq!(&result.rules[name], &format!("{}\n", body[1..].join("\n")));
            }
        }
        prop_assert!(result.rules.values().all(|body| !body.trim().is_empty()));
    }
}
