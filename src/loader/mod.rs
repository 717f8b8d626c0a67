//! Document loaders: turn a [`DocumentSource`] into a decoded artifact.
//!
//! Every kind shares one fetch protocol ([`FetchPipeline`]) and plugs in its
//! own [`Decoder`]:
//!
//! ```text
//!            ┌─ Loading (always first, synchronous)
//! source ────┤
//!            ├─ empty ───────────────────────────▶ InvalidResource
//!            ├─ EncodedContent ─ base64 ─ decode ─▶ terminal (caller's thread)
//!            └─ RemoteLocation ─ reachability?
//!                  ├─ offline ───────────────────▶ NoInternet
//!                  └─ background: load ─ decode ─▶ terminal (posted to main)
//! ```
//!
//! 1. [`transport`]: blocking byte load for `http(s)` and `file` URLs
//! 2. [`image`]: raster decoder ([`ImageLoader`])
//! 3. [`pdf`]: PDF decoder with password unlock ([`PdfLoader`])
//!
//! The background context only produces data. Binding the artifact to a
//! view is the document's job, on the main context.

pub mod image;
pub mod pdf;
pub mod transport;

pub use self::image::{ImageDecoder, ImageFile, ImageLoader};
pub use self::pdf::{PdfBackend, PdfDecoder, PdfFile, PdfInfo, PdfLoader, PdfOpenError, PdfiumBackend};
pub use self::transport::{ByteTransport, TransportError};

use crate::config::ViewerConfig;
use crate::error::LoadError;
use crate::reachability::Reachability;
use crate::runtime::ExecutionPolicy;
use crate::source::{DocumentKind, DocumentSource};
use crate::state::DocumentState;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// An event emitted by a fetch: `Loading`, then exactly one `Finished`.
#[derive(Debug)]
pub enum FetchEvent<A> {
    Loading,
    Finished(Result<A, LoadError>),
}

impl<A> FetchEvent<A> {
    /// The document state this event corresponds to.
    pub fn state(&self) -> DocumentState {
        match self {
            FetchEvent::Loading => DocumentState::Loading,
            FetchEvent::Finished(result) => DocumentState::from(result),
        }
    }
}

/// Receives the events of one fetch. Terminal events of remote loads arrive
/// on the main context.
pub type FetchSink<A> = Arc<dyn Fn(FetchEvent<A>) + Send + Sync>;

/// A decoded, displayable document.
pub trait Artifact: Send + Sync + 'static {
    /// Bytes to write when the document is shared, or `None` if they cannot
    /// be produced right now.
    fn share_data(&self, config: &ViewerConfig) -> Option<Vec<u8>>;
}

/// Per-kind loading capability.
pub trait Loader: Send + Sync + 'static {
    type Artifact: Artifact;

    const KIND: DocumentKind;

    /// Start loading `source`, reporting progress to `sink`.
    fn fetch(
        &self,
        source: &DocumentSource,
        credential: Option<&str>,
        sink: FetchSink<Self::Artifact>,
    );
}

/// Turns raw bytes into an artifact. Runs on whichever context acquired the
/// bytes, so implementations may block.
pub trait Decoder: Send + Sync + 'static {
    type Artifact: Artifact;

    fn decode(&self, data: Vec<u8>, credential: Option<&str>) -> Result<Self::Artifact, LoadError>;

    /// Gate applied to inline payloads before [`Decoder::decode`] is called.
    fn accepts_encoded(&self, _data: &[u8]) -> bool {
        true
    }
}

/// The fetch protocol shared by every loader.
#[derive(Clone)]
pub struct FetchPipeline {
    reachability: Arc<dyn Reachability>,
    policy: ExecutionPolicy,
    transport: Arc<ByteTransport>,
}

impl FetchPipeline {
    pub fn new(
        policy: ExecutionPolicy,
        reachability: Arc<dyn Reachability>,
        transport: ByteTransport,
    ) -> Self {
        Self {
            reachability,
            policy,
            transport: Arc::new(transport),
        }
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Run one fetch of `source` through `decoder`.
    pub fn run<D: Decoder>(
        &self,
        decoder: &Arc<D>,
        source: &DocumentSource,
        credential: Option<&str>,
        sink: FetchSink<D::Artifact>,
    ) {
        sink(FetchEvent::Loading);

        match source {
            DocumentSource::EncodedContent(Some(contents)) if !contents.trim().is_empty() => {
                let result =
                    contain_panic(|| decode_encoded(decoder.as_ref(), contents, credential));
                sink(FetchEvent::Finished(result));
            }
            DocumentSource::RemoteLocation(Some(url)) => {
                if !self.reachability.is_connected_to_network() {
                    debug!("Offline; not loading {}", url);
                    sink(FetchEvent::Finished(Err(LoadError::NoInternet)));
                    return;
                }

                let transport = Arc::clone(&self.transport);
                let decoder = Arc::clone(decoder);
                let url = url.clone();
                let credential = credential.map(str::to_owned);
                let policy = self.policy.clone();

                self.policy.run_in_background(move || {
                    let result = contain_panic(|| match transport.load(&url) {
                        Ok(data) => decoder.decode(data, credential.as_deref()),
                        Err(e) => {
                            warn!("Remote load failed: {}", e);
                            Err(LoadError::InvalidResource)
                        }
                    });
                    policy.run_on_main(move || sink(FetchEvent::Finished(result)));
                });
            }
            _ => {
                debug!("Document source is empty");
                sink(FetchEvent::Finished(Err(LoadError::InvalidResource)));
            }
        }
    }
}

/// Run a load step, turning a panic into `InvalidResource` so the fetch
/// still reaches a terminal event.
fn contain_panic<A>(step: impl FnOnce() -> Result<A, LoadError>) -> Result<A, LoadError> {
    panic::catch_unwind(AssertUnwindSafe(step)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".into());
        warn!("Load panicked: {}", reason);
        Err(LoadError::InvalidResource)
    })
}

/// Decode an inline base64 payload on the caller's thread.
fn decode_encoded<D: Decoder>(
    decoder: &D,
    contents: &str,
    credential: Option<&str>,
) -> Result<D::Artifact, LoadError> {
    let data = STANDARD.decode(contents.trim()).map_err(|e| {
        debug!("Payload is not valid base64: {}", e);
        LoadError::InvalidResource
    })?;

    if data.is_empty() {
        return Err(LoadError::InvalidResource);
    }

    if !decoder.accepts_encoded(&data) {
        debug!("Payload rejected before decoding");
        return Err(LoadError::InvalidResource);
    }

    decoder.decode(data, credential)
}
