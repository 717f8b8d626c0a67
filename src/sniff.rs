//! First-byte MIME sniffing.
//!
//! Export file names are derived from the first byte of the exported buffer
//! through a fixed lookup table. 0x49 and 0x4D are the two TIFF byte orders.
//! Exported extensions must stay stable, so the table only ever looks at one
//! byte.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format tag produced by [`MimeType::detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MimeType {
    /// No signature matched, or the buffer was empty.
    #[default]
    Unknown,
    Gif,
    /// Exported by image documents without an alpha channel.
    Jpeg,
    /// Required by PDF documents.
    Pdf,
    PlainText,
    /// Exported by image documents with an alpha channel.
    Png,
    Tiff,
}

impl MimeType {
    /// Detect the format of `data` from its first byte only.
    pub fn detect(data: &[u8]) -> Self {
        match Self::signature(data) {
            0x25 => MimeType::Pdf,
            0x46 => MimeType::PlainText,
            0x47 => MimeType::Gif,
            0x49 | 0x4D => MimeType::Tiff,
            0x89 => MimeType::Png,
            0xFF => MimeType::Jpeg,
            _ => MimeType::Unknown,
        }
    }

    /// Decode a base64 payload and detect its format.
    ///
    /// Returns [`MimeType::Unknown`] when the payload is not valid base64.
    pub fn from_base64(contents: &str) -> Self {
        match STANDARD.decode(contents.trim()) {
            Ok(data) => Self::detect(&data),
            Err(_) => MimeType::Unknown,
        }
    }

    /// The signature byte inspected by [`MimeType::detect`] (0 for an empty buffer).
    pub fn signature(data: &[u8]) -> u8 {
        data.first().copied().unwrap_or(0)
    }

    /// The canonical MIME string.
    pub fn mime(&self) -> &'static str {
        match self {
            MimeType::Unknown => "application/octet-stream",
            MimeType::Gif => "image/gif",
            MimeType::Jpeg => "image/jpeg",
            MimeType::Pdf => "application/pdf",
            MimeType::PlainText => "text/plain",
            MimeType::Png => "image/png",
            MimeType::Tiff => "image/tiff",
        }
    }

    /// The canonical file extension, without a dot. Empty for `Unknown`.
    pub fn extension(&self) -> &'static str {
        match self {
            MimeType::Unknown => "",
            MimeType::Gif => "gif",
            MimeType::Jpeg => "jpeg",
            MimeType::Pdf => "pdf",
            MimeType::PlainText => "txt",
            MimeType::Png => "png",
            MimeType::Tiff => "tiff",
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}
