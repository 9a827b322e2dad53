//! Rulebook ingestion.
//!
//! Reconstructs reading order from converter text and extracts structured
//! records (unit datasheets, weapon profiles, special rules, FAQ entries)
//! page by page.

pub mod book;
pub mod error;
pub mod layout;
pub mod text_utils;
pub mod wargaming;

pub use book::{Book, BookReport, ReportTotals};
pub use error::{ExtractionError, Result};
pub use wargaming::{EditionProfile, GameEdition, LookupContext, Page, PageType};
