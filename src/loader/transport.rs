//! Blocking byte acquisition for remote document locations.
//!
//! Runs on the background pool only. `http`/`https` go through
//! `reqwest::blocking`; `file` URLs are read from disk so hosts can point a
//! remote source at a bundled or cached file. There is no timeout: a load
//! either finishes or fails on its own.

use reqwest::Url;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// Why the bytes behind a URL could not be loaded.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("'{0}' is not a valid local file URL")]
    InvalidFileUrl(String),

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },
}

/// Loads the bytes behind a URL, blocking the current thread.
#[derive(Debug, Clone)]
pub struct ByteTransport {
    user_agent: String,
}

impl ByteTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// Fetch every byte behind `url`.
    pub fn load(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        match url.scheme() {
            "file" => read_file(url),
            "http" | "https" => self.download(url),
            other => Err(TransportError::UnsupportedScheme(other.to_string())),
        }
    }

    fn download(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        info!("Downloading document from: {}", url);

        let client = reqwest::blocking::Client::builder()
            .user_agent(self.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| TransportError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let response = client
            .get(url.clone())
            .send()
            .map_err(|e| TransportError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TransportError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|e| TransportError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

fn read_file(url: &Url) -> Result<Vec<u8>, TransportError> {
    let path = url
        .to_file_path()
        .map_err(|_| TransportError::InvalidFileUrl(url.to_string()))?;

    let data = std::fs::read(&path).map_err(|source| TransportError::Read {
        path: path.clone(),
        source,
    })?;

    debug!("Read {} bytes from {}", data.len(), path.display());
    Ok(data)
}
