//! # edgequake-docview
//!
//! Load, observe and share image and PDF documents from inline base64
//! payloads or remote URLs.
//!
//! ## Why this crate?
//!
//! Viewer screens keep re-implementing the same plumbing: decode a base64
//! blob or download a URL off the UI thread, unlock a password-protected PDF,
//! tell the UI when loading started and how it ended, and write a file the
//! platform share sheet can pick up. This crate does that once, for every
//! document kind, behind a single [`Document`] trait.
//!
//! ## Load Lifecycle
//!
//! ```text
//! load_source()
//!  │
//!  ├─ 1. Loading      emitted synchronously, view cleared
//!  ├─ 2. Source       inline base64 (caller's thread) or URL (background pool)
//!  ├─ 3. Reachability remote only: offline → NoInternet
//!  ├─ 4. Decode       image::load_from_memory / pdfium (+ password unlock)
//!  └─ 5. Terminal     Success (artifact bound) or Failed(LoadError),
//!                     delivered on the main context
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docview::{
//!     Document, DocumentSource, ImageDocument, ViewerConfig, ViewerRuntime,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ViewerConfig::default();
//!     let (runtime, mut main_loop) = ViewerRuntime::new(&config)?;
//!
//!     let doc = ImageDocument::image(
//!         "Cat",
//!         DocumentSource::remote_str("https://example.com/cat.png"),
//!         runtime.policy(),
//!         &config,
//!     )?;
//!     doc.load_source();
//!
//!     // The host's UI thread drains the main context.
//!     while !doc.state().is_some_and(|s| s.is_terminal()) {
//!         main_loop.blocking_run_one();
//!     }
//!     println!("{:?} → {:?}", doc.state(), doc.share_location());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docview` demo binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docview = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod loader;
pub mod reachability;
pub mod runtime;
pub mod share;
pub mod sniff;
pub mod source;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ViewerConfig, ViewerConfigBuilder};
pub use document::{
    Document, DocumentObserver, DocumentView, ImageDocument, PdfDocument, ViewerDocument,
};
pub use error::{DocViewError, LoadError};
pub use loader::{
    Artifact, FetchEvent, FetchSink, ImageFile, ImageLoader, Loader, PdfBackend, PdfFile,
    PdfInfo, PdfLoader, PdfOpenError, PdfiumBackend,
};
pub use reachability::{FixedReachability, Reachability, SystemReachability};
pub use runtime::{main_context, ExecutionPolicy, MainLoop, MainQueue, ViewerRuntime};
pub use share::ShareExporter;
pub use sniff::MimeType;
pub use source::{DocumentKind, DocumentSource};
pub use state::DocumentState;
