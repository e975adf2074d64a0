//! Error types for Ladle operations.
//!
//! This module defines the main error type [`LadleError`] which represents
//! all possible failures of an extraction: obtaining or reading the
//! underlying stream, tokenizing it, and parsing selectors or profiles.
//!
//! An empty result is never an error. A selector that matched nothing
//! yields an empty block list inside a successful [`crate::Extraction`].
//!
//! # Example
//!
//! ```rust
//! use ladle_core::{Extractor, LadleError};
//!
//! match Extractor::new("div > p") {
//!     Err(LadleError::InvalidSelector { selector, reason }) => {
//!         println!("{selector}: {reason}");
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for extraction operations.
#[derive(Error, Debug)]
pub enum LadleError {
    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, connection issues
    /// and failures while reading the response body.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The fetch infrastructure answered with an error status instead of
    /// relaying the target site's own response.
    #[error("Status {status} requesting {url}")]
    Upstream { status: u16, url: String },

    /// I/O failure while reading the input stream.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The streaming tokenizer gave up on the input.
    #[error("Failed to tokenize HTML: {0}")]
    Tokenizer(String),

    /// A selector string could not be turned into a matchable selector.
    ///
    /// Raised when the selector set is registered, before any input is read.
    #[error("Invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A recipe profile is missing or malformed.
    #[error("Profile error: {0}")]
    ProfileError(String),
}

impl LadleError {
    pub(crate) fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
        LadleError::InvalidSelector { selector: selector.to_string(), reason: reason.into() }
    }

    /// Whether the failure came from obtaining or reading the input stream
    /// rather than from the extraction request itself.
    pub fn is_transport(&self) -> bool {
        match self {
            #[cfg(feature = "fetch")]
            LadleError::HttpError(_) => true,
            LadleError::Timeout { .. }
            | LadleError::InvalidUrl(_)
            | LadleError::Upstream { .. }
            | LadleError::Io(_)
            | LadleError::FileNotFound(_) => true,
            LadleError::Tokenizer(_) | LadleError::InvalidSelector { .. } | LadleError::ProfileError(_) => false,
        }
    }
}

impl From<lol_html::errors::RewritingError> for LadleError {
    fn from(err: lol_html::errors::RewritingError) -> Self {
        LadleError::Tokenizer(err.to_string())
    }
}

/// Result type alias for LadleError.
pub type Result<T> = std::result::Result<T, LadleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LadleError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_upstream_error() {
        let err = LadleError::Upstream { status: 503, url: "https://example.com".to_string() };
        assert_eq!(err.to_string(), "Status 503 requesting https://example.com");
        assert!(err.is_transport());
    }

    #[test]
    fn test_invalid_selector_names_selector() {
        let err = LadleError::invalid_selector("p:first-child", "pseudo-classes are not supported");
        assert!(err.to_string().contains("p:first-child"));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_timeout_error() {
        let err = LadleError::Timeout { timeout: 30 };
        assert!(err.to_string().contains("30"));
    }
}
