//! Error types for rulebook extraction.
//!
//! Distinguishes page-scoped failures that the book driver records and moves
//! past from table corruption that must stop the run for human review.

use thiserror::Error;

/// Unified error type for the ingestion module.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The column divider finder was handed a block with no lines.
    #[error("Cannot locate a column divider in an empty text block")]
    EmptyBlock,

    /// A marker the page type implies must be present is missing.
    #[error("Page {page}: expected marker {marker:?} was not found")]
    StructuralAssumption { page: u32, marker: String },

    /// The headers of a required table could not be located at all.
    #[error("Page {page}: table headers {headers:?} could not be located")]
    HeadersNotFound { page: u32, headers: Vec<String> },

    /// A profile row does not carry one value per header.
    #[error("Profile {name:?} has {found} characteristics but the header list has {expected}")]
    ProfileMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Unknown edition: {0}")]
    UnknownEdition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ExtractionError {
    /// Create a structural assumption failure for a page.
    pub fn structural(page: u32, marker: impl Into<String>) -> Self {
        Self::StructuralAssumption {
            page,
            marker: marker.into(),
        }
    }

    /// Create a headers-not-found failure for a page.
    pub fn headers_not_found(page: u32, headers: &[String]) -> Self {
        Self::HeadersNotFound {
            page,
            headers: headers.to_vec(),
        }
    }

    /// Whether the book driver may record this error and continue with the
    /// next page.
    ///
    /// Only table corruption propagates: it signals that the source document
    /// changed shape in a way the heuristics do not cover.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::HeadersNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExtractionError>;
