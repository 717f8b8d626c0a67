//! Where a document comes from, and which kind of document it is.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Input descriptor of a document.
///
/// Both variants accept `None` so that a host can hand over whatever it
/// received; an absent payload finishes the load as
/// [`crate::LoadError::InvalidResource`] without touching the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Inline base64 payload.
    EncodedContent(Option<String>),
    /// Remote location (`http`, `https` or `file` URL).
    RemoteLocation(Option<Url>),
}

impl DocumentSource {
    pub fn encoded(contents: impl Into<String>) -> Self {
        DocumentSource::EncodedContent(Some(contents.into()))
    }

    pub fn remote(url: Url) -> Self {
        DocumentSource::RemoteLocation(Some(url))
    }

    /// Parse `input` as a URL, keeping `None` when it is not one.
    pub fn remote_str(input: &str) -> Self {
        DocumentSource::RemoteLocation(Url::parse(input).ok())
    }

    /// `true` when there is nothing to load: no payload, a blank payload or
    /// no URL.
    pub fn is_empty(&self) -> bool {
        match self {
            DocumentSource::EncodedContent(contents) => contents
                .as_deref()
                .map_or(true, |c| c.trim().is_empty()),
            DocumentSource::RemoteLocation(url) => url.is_none(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, DocumentSource::RemoteLocation(_))
    }
}

/// The kinds of documents the viewer can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    /// Fixed subdirectory of the share root that exported files land in.
    pub fn share_subdirectory(&self) -> &'static str {
        match self {
            DocumentKind::Image => "image-file",
            DocumentKind::Pdf => "pdf-file",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Image => f.write_str("image"),
            DocumentKind::Pdf => f.write_str("pdf"),
        }
    }
}
