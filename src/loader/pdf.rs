//! PDF documents, including password-protected ones.
//!
//! ## Unlock protocol
//!
//! A document is first opened without a password. Only if the backend reports
//! that a password is required is the credential tried; a missing credential
//! is tried as the empty string, which opens PDFs that are encrypted with an
//! empty user password. If that second attempt is also refused the load fails
//! with [`LoadError::PasswordProtected`]. A credential supplied for an
//! unencrypted document is ignored.
//!
//! ## Why a backend trait?
//!
//! Opening a PDF needs the pdfium shared library. [`PdfBackend`] keeps the
//! unlock protocol independent from it, so hosts can plug in another engine
//! and tests can run without a pdfium binary.

use super::{Artifact, ByteTransport, Decoder, FetchPipeline, FetchSink, Loader};
use crate::config::ViewerConfig;
use crate::error::{DocViewError, LoadError};
use crate::reachability::Reachability;
use crate::runtime::ExecutionPolicy;
use crate::sniff::MimeType;
use crate::source::{DocumentKind, DocumentSource};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// What a backend learned while opening a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfInfo {
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub pdf_version: String,
}

/// Why a backend could not open a document.
#[derive(Debug, Error)]
pub enum PdfOpenError {
    #[error("Document is encrypted and the password was not accepted")]
    PasswordRequired,

    #[error("Malformed PDF: {0}")]
    Malformed(String),

    #[error("PDF backend unavailable: {0}")]
    Backend(String),
}

/// A PDF engine able to open a document from memory.
pub trait PdfBackend: Send + Sync {
    fn open(&self, data: &[u8], password: Option<&str>) -> Result<PdfInfo, PdfOpenError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`PdfBackend`] over the pdfium shared library.
///
/// Library lookup order: [`ViewerConfig::pdfium_library_path`], then the
/// `PDFIUM_LIB_PATH` environment variable, then the system library path.
/// pdfium keeps thread-local state, so every `open` binds its own instance on
/// the calling thread.
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    library_path: Option<PathBuf>,
}

impl PdfiumBackend {
    /// Resolve the library and check that it can be bound.
    pub fn new(config: &ViewerConfig) -> Result<Self, DocViewError> {
        let library_path = config
            .pdfium_library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let backend = Self { library_path };
        backend.bind().map_err(DocViewError::PdfiumBindingFailed)?;

        match &backend.library_path {
            Some(path) => debug!("pdfium bound from {}", path.display()),
            None => debug!("pdfium bound from system library"),
        }
        Ok(backend)
    }

    fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| e.to_string())?;

        Ok(Pdfium::new(bindings))
    }
}

impl PdfBackend for PdfiumBackend {
    fn open(&self, data: &[u8], password: Option<&str>) -> Result<PdfInfo, PdfOpenError> {
        let pdfium = self.bind().map_err(PdfOpenError::Backend)?;

        let document = pdfium
            .load_pdf_from_byte_slice(data, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    PdfOpenError::PasswordRequired
                } else {
                    PdfOpenError::Malformed(err_str)
                }
            })?;

        let metadata = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(PdfInfo {
            page_count: document.pages().len() as usize,
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            pdf_version: format!("{:?}", document.version()),
        })
    }
}

// ── Artifact & decoder ───────────────────────────────────────────────────

/// An opened PDF. Keeps the original bytes for sharing.
#[derive(Debug, Clone)]
pub struct PdfFile {
    data: Vec<u8>,
    info: PdfInfo,
    unlocked: bool,
}

impl PdfFile {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn info(&self) -> &PdfInfo {
        &self.info
    }

    pub fn page_count(&self) -> usize {
        self.info.page_count
    }

    /// `true` if opening required a password.
    pub fn was_unlocked(&self) -> bool {
        self.unlocked
    }
}

impl Artifact for PdfFile {
    fn share_data(&self, _config: &ViewerConfig) -> Option<Vec<u8>> {
        Some(self.data.clone())
    }
}

/// Applies the unlock protocol on top of a [`PdfBackend`].
pub struct PdfDecoder {
    backend: Arc<dyn PdfBackend>,
}

impl PdfDecoder {
    pub fn new(backend: Arc<dyn PdfBackend>) -> Self {
        Self { backend }
    }
}

impl Decoder for PdfDecoder {
    type Artifact = PdfFile;

    fn decode(&self, data: Vec<u8>, credential: Option<&str>) -> Result<PdfFile, LoadError> {
        match self.backend.open(&data, None) {
            Ok(info) => {
                if credential.is_some() {
                    debug!("Credential supplied for an unencrypted PDF; ignoring it");
                }
                info!("PDF loaded: {} pages", info.page_count);
                Ok(PdfFile {
                    data,
                    info,
                    unlocked: false,
                })
            }
            Err(PdfOpenError::PasswordRequired) => {
                match self.backend.open(&data, Some(credential.unwrap_or(""))) {
                    Ok(info) => {
                        info!("PDF unlocked: {} pages", info.page_count);
                        Ok(PdfFile {
                            data,
                            info,
                            unlocked: true,
                        })
                    }
                    Err(PdfOpenError::PasswordRequired) => {
                        info!("PDF is password protected; credential was not accepted");
                        Err(LoadError::PasswordProtected)
                    }
                    Err(e) => {
                        warn!("PDF unlock failed: {}", e);
                        Err(LoadError::InvalidResource)
                    }
                }
            }
            Err(e) => {
                debug!("PDF open failed: {}", e);
                Err(LoadError::InvalidResource)
            }
        }
    }

    fn accepts_encoded(&self, data: &[u8]) -> bool {
        MimeType::detect(data) == MimeType::Pdf
    }
}

// ── Loader ───────────────────────────────────────────────────────────────

/// Loads PDF documents.
pub struct PdfLoader {
    pipeline: FetchPipeline,
    decoder: Arc<PdfDecoder>,
}

impl PdfLoader {
    pub fn new(
        policy: ExecutionPolicy,
        reachability: Arc<dyn Reachability>,
        config: &ViewerConfig,
        backend: Arc<dyn PdfBackend>,
    ) -> Self {
        Self::with_pipeline(
            FetchPipeline::new(
                policy,
                reachability,
                ByteTransport::new(config.user_agent.clone()),
            ),
            backend,
        )
    }

    /// A loader backed by pdfium, resolved per [`PdfiumBackend::new`].
    pub fn pdfium(
        policy: ExecutionPolicy,
        reachability: Arc<dyn Reachability>,
        config: &ViewerConfig,
    ) -> Result<Self, DocViewError> {
        let backend = PdfiumBackend::new(config)?;
        Ok(Self::new(policy, reachability, config, Arc::new(backend)))
    }

    pub fn with_pipeline(pipeline: FetchPipeline, backend: Arc<dyn PdfBackend>) -> Self {
        Self {
            pipeline,
            decoder: Arc::new(PdfDecoder::new(backend)),
        }
    }
}

impl Loader for PdfLoader {
    type Artifact = PdfFile;

    const KIND: DocumentKind = DocumentKind::Pdf;

    fn fetch(&self, source: &DocumentSource, credential: Option<&str>, sink: FetchSink<PdfFile>) {
        self.pipeline.run(&self.decoder, source, credential, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Opens anything starting with `%PDF`, optionally behind a password.
    struct FakeBackend {
        password: Option<&'static str>,
        attempts: Mutex<Vec<Option<String>>>,
    }

    impl FakeBackend {
        fn new(password: Option<&'static str>) -> Self {
            Self {
                password,
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    impl PdfBackend for FakeBackend {
        fn open(&self, data: &[u8], password: Option<&str>) -> Result<PdfInfo, PdfOpenError> {
            self.attempts.lock().push(password.map(str::to_owned));
            if !data.starts_with(b"%PDF") {
                return Err(PdfOpenError::Malformed("no header".into()));
            }
            match (self.password, password) {
                (None, _) => {}
                (Some(expected), Some(given)) if expected == given => {}
                _ => return Err(PdfOpenError::PasswordRequired),
            }
            Ok(PdfInfo {
                page_count: 2,
                ..PdfInfo::default()
            })
        }
    }

    fn decoder(backend: &Arc<FakeBackend>) -> PdfDecoder {
        PdfDecoder::new(Arc::clone(backend) as Arc<dyn PdfBackend>)
    }

    const PDF: &[u8] = b"%PDF-1.7 fake";

    #[test]
    fn unencrypted_opens_on_first_attempt() {
        let backend = Arc::new(FakeBackend::new(None));
        let file = decoder(&backend).decode(PDF.to_vec(), None).unwrap();

        assert_eq!(file.page_count(), 2);
        assert!(!file.was_unlocked());
        assert_eq!(*backend.attempts.lock(), vec![None]);
    }

    #[test]
    fn credential_for_unencrypted_is_ignored() {
        let backend = Arc::new(FakeBackend::new(None));
        let file = decoder(&backend)
            .decode(PDF.to_vec(), Some("secret"))
            .unwrap();

        assert!(!file.was_unlocked());
        assert_eq!(backend.attempts.lock().len(), 1);
    }

    #[test]
    fn correct_credential_unlocks() {
        let backend = Arc::new(FakeBackend::new(Some("secret")));
        let file = decoder(&backend)
            .decode(PDF.to_vec(), Some("secret"))
            .unwrap();

        assert!(file.was_unlocked());
        assert_eq!(
            *backend.attempts.lock(),
            vec![None, Some("secret".to_string())]
        );
    }

    #[test]
    fn wrong_credential_is_password_protected() {
        let backend = Arc::new(FakeBackend::new(Some("secret")));
        let err = decoder(&backend)
            .decode(PDF.to_vec(), Some("guess"))
            .unwrap_err();
        assert_eq!(err, LoadError::PasswordProtected);
    }

    #[test]
    fn missing_credential_tries_empty_password() {
        let backend = Arc::new(FakeBackend::new(Some("")));
        let file = decoder(&backend).decode(PDF.to_vec(), None).unwrap();

        assert!(file.was_unlocked());
        assert_eq!(*backend.attempts.lock(), vec![None, Some(String::new())]);
    }

    #[test]
    fn missing_credential_on_locked_pdf_is_password_protected() {
        let backend = Arc::new(FakeBackend::new(Some("secret")));
        let err = decoder(&backend).decode(PDF.to_vec(), None).unwrap_err();
        assert_eq!(err, LoadError::PasswordProtected);
    }

    #[test]
    fn malformed_is_invalid_resource() {
        let backend = Arc::new(FakeBackend::new(None));
        let err = decoder(&backend)
            .decode(b"garbage".to_vec(), None)
            .unwrap_err();
        assert_eq!(err, LoadError::InvalidResource);
    }

    #[test]
    fn inline_payload_must_look_like_pdf() {
        let backend = Arc::new(FakeBackend::new(None));
        let d = decoder(&backend);
        assert!(d.accepts_encoded(PDF));
        assert!(!d.accepts_encoded(b"\x89PNG"));
    }

    #[test]
    fn share_data_is_original_bytes() {
        let backend = Arc::new(FakeBackend::new(None));
        let file = decoder(&backend).decode(PDF.to_vec(), None).unwrap();
        assert_eq!(
            file.share_data(&ViewerConfig::default()).unwrap(),
            PDF.to_vec()
        );
    }
}
