//! Page layout reconstruction.
//!
//! Converter output has no column markers; these passes recover the two-column
//! layout from whitespace and split text at literal headers.

pub mod column_divider;
pub mod column_splitter;
pub mod header_splitter;

pub use column_divider::{ColumnDivider, ColumnDividerFinder};
pub use column_splitter::{reading_order_text, split_columns, split_columns_at, Section};
pub use header_splitter::{
    first_non_list_or_header_line, split_after_indented_header, split_at_header,
    split_at_nth_header, HeaderSplit,
};
