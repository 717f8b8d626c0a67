//! The document façade: title, load lifecycle, observer and sharing.
//!
//! ## State machine
//!
//! ```text
//! None ──load_source()──▶ Loading ──▶ Success
//!                            ▲   ├──▶ Failed(InvalidResource)
//!                            │   ├──▶ Failed(NoInternet)
//!                            │   └──▶ Failed(PasswordProtected)
//!                            └──── load_source() from any state
//! ```
//!
//! `Success` holds exactly when an artifact is bound to the document's
//! [`DocumentView`]. Every transition clears or binds the view first, then
//! publishes the state, then notifies the observer with no lock held.
//!
//! ## Overlapping loads
//!
//! Each `load_source()` starts a new generation. Events from older
//! generations are dropped, so the most recently issued load always wins,
//! whatever order the background pool finishes in.

use crate::config::ViewerConfig;
use crate::error::DocViewError;
use crate::loader::{Artifact, FetchEvent, FetchSink, ImageLoader, Loader, PdfLoader};
use crate::reachability::{Reachability, SystemReachability};
use crate::runtime::ExecutionPolicy;
use crate::share::ShareExporter;
use crate::source::{DocumentKind, DocumentSource};
use crate::state::DocumentState;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Receives document state changes.
///
/// Called synchronously on every state mutation: on the caller's thread for
/// the `Loading` transition and inline payloads, on the main context for
/// remote completions. Documents hold observers weakly.
pub trait DocumentObserver: Send + Sync {
    fn on_state_changed(&self, _document: &dyn Document) {}
}

/// Object-safe view of a document, independent of its kind.
pub trait Document: Send + Sync {
    fn title(&self) -> String;

    /// Fails with [`DocViewError::EmptyTitle`] and keeps the current title
    /// when `title` is empty.
    fn set_title(&self, title: &str) -> Result<(), DocViewError>;

    /// `None` until the first [`Document::load_source`].
    fn state(&self) -> Option<DocumentState>;

    /// Export the loaded document and return the written file.
    ///
    /// `None` unless the state is [`DocumentState::Success`], or if the
    /// export fails. Every call writes a fresh file.
    fn share_location(&self) -> Option<PathBuf>;

    fn kind(&self) -> DocumentKind;

    /// (Re)load the current source.
    fn load_source(&self);
}

/// Render target of a document. Holds the bound artifact, if any.
pub struct DocumentView<A> {
    artifact: RwLock<Option<Arc<A>>>,
}

impl<A> DocumentView<A> {
    fn new() -> Self {
        Self {
            artifact: RwLock::new(None),
        }
    }

    pub fn artifact(&self) -> Option<Arc<A>> {
        self.artifact.read().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.artifact.read().is_some()
    }

    fn bind(&self, artifact: A) {
        *self.artifact.write() = Some(Arc::new(artifact));
    }

    fn clear(&self) {
        *self.artifact.write() = None;
    }
}

impl<A> fmt::Debug for DocumentView<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentView")
            .field("bound", &self.is_bound())
            .finish()
    }
}

struct Fields {
    title: String,
    source: DocumentSource,
    state: Option<DocumentState>,
    generation: u64,
}

struct Inner<L: Loader> {
    loader: L,
    exporter: ShareExporter,
    config: ViewerConfig,
    credential: Option<String>,
    fields: Mutex<Fields>,
    view: Arc<DocumentView<L::Artifact>>,
    observer: Mutex<Option<Weak<dyn DocumentObserver>>>,
}

/// A document of the kind loaded by `L`. Cheap to clone; clones share state.
pub struct ViewerDocument<L: Loader> {
    inner: Arc<Inner<L>>,
}

/// A raster image document.
pub type ImageDocument = ViewerDocument<ImageLoader>;

/// A PDF document.
pub type PdfDocument = ViewerDocument<PdfLoader>;

impl<L: Loader> ViewerDocument<L> {
    pub fn new(
        title: impl Into<String>,
        source: DocumentSource,
        loader: L,
        config: &ViewerConfig,
    ) -> Result<Self, DocViewError> {
        Self::build(title.into(), source, None, loader, config)
    }

    fn build(
        title: String,
        source: DocumentSource,
        credential: Option<String>,
        loader: L,
        config: &ViewerConfig,
    ) -> Result<Self, DocViewError> {
        if title.is_empty() {
            return Err(DocViewError::EmptyTitle);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                loader,
                exporter: ShareExporter::new(config.share_root.clone()),
                config: config.clone(),
                credential,
                fields: Mutex::new(Fields {
                    title,
                    source,
                    state: None,
                    generation: 0,
                }),
                view: Arc::new(DocumentView::new()),
                observer: Mutex::new(None),
            }),
        })
    }

    /// Replace the source used by the next [`Document::load_source`].
    pub fn set_source(&self, source: DocumentSource) {
        self.inner.fields.lock().source = source;
    }

    pub fn source(&self) -> DocumentSource {
        self.inner.fields.lock().source.clone()
    }

    pub fn credential(&self) -> Option<&str> {
        self.inner.credential.as_deref()
    }

    pub fn document_view(&self) -> Arc<DocumentView<L::Artifact>> {
        Arc::clone(&self.inner.view)
    }

    /// Register `observer`, replacing any previous one. Only a weak
    /// reference is kept.
    pub fn set_observer(&self, observer: &Arc<dyn DocumentObserver>) {
        *self.inner.observer.lock() = Some(Arc::downgrade(observer));
    }

    pub fn clear_observer(&self) {
        *self.inner.observer.lock() = None;
    }

    /// Number of loads issued so far.
    pub fn generation(&self) -> u64 {
        self.inner.fields.lock().generation
    }

    fn apply(inner: &Arc<Inner<L>>, generation: u64, event: FetchEvent<L::Artifact>) {
        {
            let mut fields = inner.fields.lock();
            if fields.generation != generation {
                debug!(
                    "Discarding stale load event for '{}' (generation {}, current {})",
                    fields.title, generation, fields.generation
                );
                return;
            }

            let state = event.state();
            match event {
                FetchEvent::Finished(Ok(artifact)) => inner.view.bind(artifact),
                FetchEvent::Loading | FetchEvent::Finished(Err(_)) => inner.view.clear(),
            }
            fields.state = Some(state);
            debug!("Document '{}' → {}", fields.title, state);
        }

        Self::notify(inner);
    }

    fn notify(inner: &Arc<Inner<L>>) {
        let observer = inner.observer.lock().as_ref().and_then(Weak::upgrade);
        if let Some(observer) = observer {
            let document = ViewerDocument {
                inner: Arc::clone(inner),
            };
            observer.on_state_changed(&document);
        }
    }
}

impl<L: Loader> Document for ViewerDocument<L> {
    fn title(&self) -> String {
        self.inner.fields.lock().title.clone()
    }

    fn set_title(&self, title: &str) -> Result<(), DocViewError> {
        if title.is_empty() {
            return Err(DocViewError::EmptyTitle);
        }
        self.inner.fields.lock().title = title.to_string();
        Ok(())
    }

    fn state(&self) -> Option<DocumentState> {
        self.inner.fields.lock().state
    }

    fn share_location(&self) -> Option<PathBuf> {
        let (title, state) = {
            let fields = self.inner.fields.lock();
            (fields.title.clone(), fields.state)
        };
        if state != Some(DocumentState::Success) {
            return None;
        }

        let artifact = self.inner.view.artifact()?;
        let data = artifact.share_data(&self.inner.config)?;
        self.inner
            .exporter
            .export(&data, &title, L::KIND.share_subdirectory())
    }

    fn kind(&self) -> DocumentKind {
        L::KIND
    }

    fn load_source(&self) {
        let (generation, source) = {
            let mut fields = self.inner.fields.lock();
            fields.generation += 1;
            (fields.generation, fields.source.clone())
        };

        let weak = Arc::downgrade(&self.inner);
        let sink: FetchSink<L::Artifact> = Arc::new(move |event: FetchEvent<L::Artifact>| {
            match weak.upgrade() {
                Some(inner) => Self::apply(&inner, generation, event),
                None => debug!("Document dropped before its load finished"),
            }
        });

        self.inner
            .loader
            .fetch(&source, self.inner.credential.as_deref(), sink);
    }
}

impl<L: Loader> Clone for ViewerDocument<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: Loader> fmt::Debug for ViewerDocument<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.inner.fields.lock();
        f.debug_struct("ViewerDocument")
            .field("kind", &L::KIND)
            .field("title", &fields.title)
            .field("state", &fields.state)
            .field("generation", &fields.generation)
            .finish_non_exhaustive()
    }
}

// ── Convenience constructors ─────────────────────────────────────────────

impl ImageDocument {
    /// An image document using [`SystemReachability`].
    pub fn image(
        title: impl Into<String>,
        source: DocumentSource,
        policy: ExecutionPolicy,
        config: &ViewerConfig,
    ) -> Result<Self, DocViewError> {
        let reachability: Arc<dyn Reachability> = Arc::new(SystemReachability::new());
        Self::new(title, source, ImageLoader::new(policy, reachability, config), config)
    }
}

impl PdfDocument {
    /// A pdfium-backed PDF document using [`SystemReachability`].
    pub fn pdf(
        title: impl Into<String>,
        source: DocumentSource,
        credential: Option<String>,
        policy: ExecutionPolicy,
        config: &ViewerConfig,
    ) -> Result<Self, DocViewError> {
        let reachability: Arc<dyn Reachability> = Arc::new(SystemReachability::new());
        let loader = PdfLoader::pdfium(policy, reachability, config)?;
        Self::with_credential(title, source, credential, loader, config)
    }

    /// A PDF document unlocked with `credential` when it is encrypted.
    pub fn with_credential(
        title: impl Into<String>,
        source: DocumentSource,
        credential: Option<String>,
        loader: PdfLoader,
        config: &ViewerConfig,
    ) -> Result<Self, DocViewError> {
        Self::build(title.into(), source, credential, loader, config)
    }
}
