//! Metadata extraction from the site's HTML pages.
//!
//! The site has no public API: whether a URL points at an album or a single
//! file, and the identifiers needed to query the listing endpoint, only exist
//! as state embedded in the page's inline scripts. Everything that depends on
//! that page layout lives behind the [`MetadataExtractor`] trait so a layout
//! change touches this module only.
//!
//! Extraction fails loudly: a missing or duplicated marker line is an error,
//! never a best guess.

mod line_scan;

pub use line_scan::{
    ALBUM_KEY, ALBUM_QUERY_MARKER, LineScanExtractor, MEDIA_MARKER, ORIGINAL_URL_KEY,
};

use thiserror::Error;

use crate::descriptor::Descriptor;

/// Errors raised when a page does not have the expected structure.
///
/// None of these are retried: they mean the page layout changed.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No line carries the expected marker.
    #[error("page structure not recognized: no {what} found")]
    MarkerNotFound {
        /// What was looked for.
        what: &'static str,
    },

    /// More than one line carries the marker, so the right one is unknown.
    #[error("page structure ambiguous: {count} {what} lines found, expected exactly one")]
    Ambiguous {
        /// What was looked for.
        what: &'static str,
        /// Number of matching lines.
        count: usize,
    },

    /// The marker line was found but the value pattern did not match.
    #[error("page structure not recognized: could not extract {field}")]
    PatternMismatch {
        /// The field being extracted.
        field: &'static str,
    },

    /// The extracted value is not a valid JSON string literal.
    #[error("could not decode {field}: {source}")]
    Decode {
        /// The field being decoded.
        field: &'static str,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Recovers album/file identity and the listing proof token from page HTML.
pub trait MetadataExtractor: Send + Sync {
    /// Classifies the page as an album or a single file.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractError`] when the page lacks the expected state or
    /// contains it more than once.
    fn extract(&self, html: &str) -> Result<Descriptor, ExtractError>;

    /// Recovers the token the listing endpoint requires.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractError`] when the token is missing or ambiguous.
    fn proof_token(&self, html: &str) -> Result<String, ExtractError>;
}
