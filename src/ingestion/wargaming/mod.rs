//! Wargame rulebook extraction.
//!
//! Page classification plus the extractors for unit datasheets, weapon
//! tables, special rules and FAQ entries. Per-edition heuristics live in
//! [`EditionProfile`]; catalogue name resolution in [`LookupContext`].

pub mod datasheet;
pub mod edition;
pub mod faq;
pub mod lookup;
pub mod options;
pub mod page;
pub mod page_classifier;
pub mod records;
pub mod rule_segmenter;
pub mod table_extractor;
pub mod weapon_table;

pub use datasheet::{DatasheetExtractor, DatasheetPage};
pub use edition::{EditionProfile, GameEdition};
pub use faq::parse_faq;
pub use lookup::LookupContext;
pub use options::{apply_options, parse_options, ParsedOptions};
pub use page::{EpubParagraph, Page, PageSource, PageType};
pub use page_classifier::PageClassifier;
pub use records::{
    Characteristics, FaqEntry, OptionGroup, RawModel, RawProfile, RawUnit, UnitOption,
    WeaponProfile,
};
pub use rule_segmenter::{RuleSegmentation, RuleSegmenter};
pub use table_extractor::{ProfileTable, TableExtractor, TableRow, TableSpec};
pub use weapon_table::{WeaponScan, WeaponTableExtractor};
