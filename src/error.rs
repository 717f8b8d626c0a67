//! Error types for the edgequake-docview library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocViewError`], **fatal / construction-time**: the caller asked for
//!   something that cannot be set up at all (empty title, invalid
//!   configuration, pdfium library missing). Returned as `Err(DocViewError)`
//!   from constructors and setters.
//!
//! * [`LoadError`], **per load attempt**: the document source could not be
//!   turned into a displayable artifact. Never returned to the caller of
//!   `load_source()`; it is captured in
//!   [`crate::state::DocumentState::Failed`] and delivered to the observer.
//!
//! Hosts decide what to do with a `LoadError` (show a retry prompt for
//! [`LoadError::PasswordProtected`], an offline banner for
//! [`LoadError::NoInternet`], …); the library only reports it faithfully.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors returned by the edgequake-docview library.
///
/// Load failures use [`LoadError`] and are stored in the document state
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum DocViewError {
    // ── Document errors ───────────────────────────────────────────────────
    /// A document title was empty.
    #[error("Document title cannot be empty")]
    EmptyTitle,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background runtime could not be created.
    #[error("Failed to build the background runtime: {0}")]
    RuntimeBuild(#[source] std::io::Error),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF documents need a pdfium shared library at runtime.\n\
  • Install pdfium system-wide, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),
}

/// Why a single load attempt did not produce an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum LoadError {
    /// The payload was missing, malformed, or not of the expected format.
    #[error("The document source is missing, malformed or of the wrong format")]
    InvalidResource,

    /// The source is remote and the device has no network connection.
    #[error("No internet connection is available to fetch the document")]
    NoInternet,

    /// The document is locked and the supplied credential was absent or wrong.
    #[error("The document is password protected")]
    PasswordProtected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_display() {
        assert!(DocViewError::EmptyTitle.to_string().contains("empty"));
    }

    #[test]
    fn invalid_config_display() {
        let e = DocViewError::InvalidConfig("jpeg_quality must be 1–100".into());
        let msg = e.to_string();
        assert!(msg.contains("jpeg_quality"), "got: {msg}");
    }

    #[test]
    fn binding_failure_mentions_env_override() {
        let e = DocViewError::PdfiumBindingFailed("not found".into());
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }

    #[test]
    fn load_error_round_trips_through_json() {
        let json = serde_json::to_string(&LoadError::PasswordProtected).unwrap();
        assert_eq!(json, "\"PasswordProtected\"");
        let back: LoadError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LoadError::PasswordProtected);
    }
}
