//! Property-based tests for layout reconstruction
//!
//! Tests invariants:
//! - A gutter shared by every line is located exactly
//! - Text without a column break is one full-width section
//! - Header splits never lose or duplicate text

use proptest::prelude::*;

use crate::ingestion::layout::{
    split_at_header, split_at_nth_header, split_columns, ColumnDivider, ColumnDividerFinder,
};

// ============================================================================
// Strategies
// ============================================================================

/// Two-column lines: the left text is padded to a common width, followed
/// by a gutter of `gutter` spaces and the right text.
fn two_column_block() -> impl Strategy<Value = (String, usize, usize)> {
    (
        prop::collection::vec(("[a-z]{4,20}", "[a-z]{1,15}"), 2..12),
        2usize..6,
    )
        .prop_map(|(rows, gutter)| {
            let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
            let text = rows
                .iter()
                .map(|(left, right)| {
                    format!("{:<width$}{}{}", left, " ".repeat(gutter), right, width = width)
                })
                .collect::<Vec<_>>()
                .join("\n");
            (text, width, gutter)
        })
}

/// Lines of unbroken words and blank lines.
fn single_column_block() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{0,30}", 1..15).prop_map(|lines| lines.join("\n"))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// The divider brackets the synthetic gutter exactly.
    #[test]
    fn prop_divider_brackets_gutter((text, width, gutter) in two_column_block()) {
        let divider = ColumnDividerFinder::new().find(&text).unwrap();

        prop_assert_eq!(divider.start, width);
        prop_assert_eq!(divider.end, width + gutter);
    }

    /// Splitting at the found divider recovers both columns.
    #[test]
    fn prop_two_columns_are_recovered((text, _width, _gutter) in two_column_block()) {
        let divider = ColumnDividerFinder::new().find(&text).unwrap();
        let sections = split_columns(&text, divider);

        prop_assert_eq!(sections.len(), 1);
        let left: Vec<&str> = text.lines().map(|l| l.split_whitespace().next().unwrap()).collect();
        let right: Vec<&str> = text.lines().map(|l| l.split_whitespace().last().unwrap()).collect();
        prop_assert_eq!(sections[0].column_1.clone(), left.join("\n"));
        prop_assert_eq!(sections[0].column_2.clone(), right.join("\n"));
        prop_assert!(sections[0].non_column_text.is_empty());
    }

    /// Blocks without a column break are returned whole.
    #[test]
    fn prop_no_break_is_single_section(
        text in single_column_block(),
        start in 0usize..20,
        width in 2usize..5,
    ) {
        let sections = split_columns(&text, ColumnDivider::new(start, start + width));

        prop_assert_eq!(sections.len(), 1);
        prop_assert_eq!(&sections[0].non_column_text, &text);
        prop_assert!(sections[0].column_1.is_empty());
        prop_assert!(sections[0].column_2.is_empty());
        prop_assert_eq!(&sections[0].original_text, &text);
    }

    /// `before + rest` is the input whether or not the header was found.
    #[test]
    fn prop_header_split_round_trip(
        lines in prop::collection::vec("[A-Za-z ]{0,25}", 0..10),
        header in "[A-Z][a-z]{2,10}",
        insert_at in 0usize..10,
        at_end_of_line in any::<bool>(),
    ) {
        let mut lines = lines;
        let at = insert_at.min(lines.len());
        lines.insert(at, header.clone());
        let text = format!("{}\n", lines.join("\n"));

        let split = split_at_header(&header, &text, at_end_of_line);
        prop_assert!(split.found);
        prop_assert_eq!(format!("{}{}", split.before, split.rest), text.clone());
        prop_assert!(split.rest.starts_with(&header));

        let nth = split_at_nth_header(&header, &text, 3, at_end_of_line);
        prop_assert_eq!(format!("{}{}", nth.before, nth.rest), text);
    }
}
