//! Configuration types for document loading and sharing.
//!
//! All tunables live in [`ViewerConfig`], built via its
//! [`ViewerConfigBuilder`]. One config is typically shared by every document
//! a host opens; documents clone the few fields they need at construction.

use crate::error::DocViewError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration shared by loaders, documents and the background runtime.
///
/// Built via [`ViewerConfig::builder()`] or using [`ViewerConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_docview::ViewerConfig;
///
/// let config = ViewerConfig::builder()
///     .share_root("/tmp/my-app")
///     .max_background_threads(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Directory under which `image-file/` and `pdf-file/` share
    /// subdirectories are created. Default: the system temp directory.
    pub share_root: PathBuf,

    /// Upper bound on threads performing blocking remote loads. Default: 4.
    ///
    /// Excess loads queue until a thread is free.
    pub max_background_threads: usize,

    /// JPEG quality (1–100) used when exporting opaque images. Default: 100.
    pub jpeg_quality: u8,

    /// `User-Agent` header sent with HTTP(S) loads.
    pub user_agent: String,

    /// Explicit path to the pdfium shared library.
    ///
    /// If None, `PDFIUM_LIB_PATH` is consulted, then the system library.
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            share_root: std::env::temp_dir(),
            max_background_threads: 4,
            jpeg_quality: 100,
            user_agent: concat!("edgequake-docview/", env!("CARGO_PKG_VERSION")).to_string(),
            pdfium_library_path: None,
        }
    }
}

impl ViewerConfig {
    /// Create a new builder for `ViewerConfig`.
    pub fn builder() -> ViewerConfigBuilder {
        ViewerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ViewerConfig`].
#[derive(Debug)]
pub struct ViewerConfigBuilder {
    config: ViewerConfig,
}

impl ViewerConfigBuilder {
    pub fn share_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.share_root = root.into();
        self
    }

    pub fn max_background_threads(mut self, n: usize) -> Self {
        self.config.max_background_threads = n;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ViewerConfig, DocViewError> {
        let c = &self.config;
        if c.max_background_threads == 0 {
            return Err(DocViewError::InvalidConfig(
                "max_background_threads must be ≥ 1".into(),
            ));
        }
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(DocViewError::InvalidConfig(format!(
                "jpeg_quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.share_root.as_os_str().is_empty() {
            return Err(DocViewError::InvalidConfig(
                "share_root cannot be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ViewerConfig::default();
        assert_eq!(c.share_root, std::env::temp_dir());
        assert_eq!(c.max_background_threads, 4);
        assert_eq!(c.jpeg_quality, 100);
        assert!(c.user_agent.starts_with("edgequake-docview/"));
        assert!(c.pdfium_library_path.is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let c = ViewerConfig::builder()
            .share_root("/tmp/share")
            .max_background_threads(2)
            .jpeg_quality(90)
            .user_agent("test-agent")
            .pdfium_library_path("/opt/pdfium/libpdfium.so")
            .build()
            .unwrap();
        assert_eq!(c.share_root, PathBuf::from("/tmp/share"));
        assert_eq!(c.max_background_threads, 2);
        assert_eq!(c.jpeg_quality, 90);
        assert_eq!(c.user_agent, "test-agent");
        assert_eq!(
            c.pdfium_library_path,
            Some(PathBuf::from("/opt/pdfium/libpdfium.so"))
        );
    }

    #[test]
    fn builder_rejects_zero_threads() {
        let err = ViewerConfig::builder()
            .max_background_threads(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, DocViewError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_out_of_range_quality() {
        assert!(ViewerConfig::builder().jpeg_quality(0).build().is_err());
        assert!(ViewerConfig::builder().jpeg_quality(101).build().is_err());
        assert!(ViewerConfig::builder().jpeg_quality(1).build().is_ok());
    }

    #[test]
    fn builder_rejects_empty_share_root() {
        assert!(ViewerConfig::builder().share_root("").build().is_err());
    }
}
