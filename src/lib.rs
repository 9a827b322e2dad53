/// rulebook-extract - Wargame rulebook text extraction
///
/// Reconstructs reading order from PDF/EPUB text dumps of wargame rulebooks
/// and extracts unit datasheets, weapon profiles, special rules and FAQ
/// entries as structured records.

pub mod config;
pub mod core;
pub mod ingestion;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
