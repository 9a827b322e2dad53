//! Property-based tests for the profile table state machine
//!
//! Tests invariants:
//! - A continuation line never opens a new row
//! - Rendered rows extract back to the same rows

use proptest::prelude::*;

use crate::ingestion::wargaming::{ProfileTable, TableExtractor, TableRow, TableSpec};

fn spec() -> TableSpec {
    TableSpec::new(vec!["WS".to_string(), "BS".to_string(), "S".to_string()])
}

fn name_words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Z][a-z]{1,7}", 1..4)
}

fn stats() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[0-9]{1,2}\\+?", 3)
}

fn row() -> impl Strategy<Value = TableRow> {
    (
        name_words(),
        stats(),
        prop::option::weighted(0.3, prop::collection::vec("[a-z]{2,8}", 1..5)),
    )
        .prop_map(|(name_cells, cells, note)| TableRow {
            name_cells,
            cells,
            note: note.map(|words| words.join(" ")),
        })
}

proptest! {
    /// Continuation lines extend the row above them.
    #[test]
    fn prop_continuation_extends_previous_row(
        rows in prop::collection::vec(
            (name_words(), stats(), prop::option::of(prop::collection::vec("[a-z]{2,8}", 1..3))),
            1..8,
        )
    ) {
        let mut lines = vec!["Name  WS  BS  S".to_string()];
        for (name, cells, continuation) in &rows {
            lines.push(format!("{}  {}", name.join(" "), cells.join("  ")));
            if let Some(words) = continuation {
                lines.push(format!("  {}", words.join(" ")));
            }
        }

        let spec = spec();
        let table = TableExtractor::new(&spec).extract(&lines.join("\n")).unwrap();

        prop_assert_eq!(table.rows.len(), rows.len());
        for (extracted, (name, cells, continuation)) in table.rows.iter().zip(&rows) {
            let mut expected = name.join(" ");
            if let Some(words) = continuation {
                expected.push(' ');
                expected.push_str(&words.join(" "));
            }
            prop_assert_eq!(extracted.name(), expected);
            prop_assert_eq!(&extracted.cells, cells);
        }
    }

    /// Re-extracting rendered output yields identical rows.
    #[test]
    fn prop_table_extraction_is_idempotent(rows in prop::collection::vec(row(), 1..8)) {
        let spec = spec();
        let table = ProfileTable {
            headers: spec.headers.clone(),
            rows,
            ..Default::default()
        };

        let first = TableExtractor::new(&spec).extract(&table.to_text(&spec)).unwrap();
        prop_assert_eq!(&first.rows, &table.rows);

        let second = TableExtractor::new(&spec).extract(&first.to_text(&spec)).unwrap();
        prop_assert_eq!(&second.rows, &first.rows);
    }
}
