//! Load lifecycle of a document.
//!
//! A document starts unloaded (`Option::<DocumentState>::None`), enters
//! [`DocumentState::Loading`] when `load_source()` is called and settles on
//! exactly one terminal state per load attempt:
//!
//! ```text
//! None ──▶ Loading ──┬──▶ Success
//!             ▲      ├──▶ Failed(InvalidResource)
//!             │      ├──▶ Failed(NoInternet)
//!             │      └──▶ Failed(PasswordProtected)
//!             └────── load_source() again
//! ```
//!
//! The status ("still loading" / "done") and the failure reason are kept
//! apart: failures live in [`LoadError`], carried by [`DocumentState::Failed`].

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current status of a document's most recent load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentState {
    /// A load is in flight.
    Loading,
    /// The artifact is decoded and bound to the document view.
    Success,
    /// The load finished without an artifact.
    Failed(LoadError),
}

impl DocumentState {
    /// `true` for every state a load attempt can finish in.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DocumentState::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DocumentState::Success)
    }

    /// The failure reason, if the load failed.
    pub fn error(&self) -> Option<LoadError> {
        match self {
            DocumentState::Failed(e) => Some(*e),
            _ => None,
        }
    }
}

impl From<LoadError> for DocumentState {
    fn from(e: LoadError) -> Self {
        DocumentState::Failed(e)
    }
}

impl<A> From<&Result<A, LoadError>> for DocumentState {
    fn from(result: &Result<A, LoadError>) -> Self {
        match result {
            Ok(_) => DocumentState::Success,
            Err(e) => DocumentState::Failed(*e),
        }
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentState::Loading => f.write_str("loading"),
            DocumentState::Success => f.write_str("success"),
            DocumentState::Failed(LoadError::InvalidResource) => f.write_str("invalid resource"),
            DocumentState::Failed(LoadError::NoInternet) => f.write_str("no internet"),
            DocumentState::Failed(LoadError::PasswordProtected) => {
                f.write_str("password protected")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_loading_is_transient() {
        assert!(!DocumentState::Loading.is_terminal());
        assert!(DocumentState::Success.is_terminal());
        assert!(DocumentState::Failed(LoadError::NoInternet).is_terminal());
    }

    #[test]
    fn error_is_exposed_for_failures_only() {
        assert_eq!(DocumentState::Success.error(), None);
        assert_eq!(DocumentState::Loading.error(), None);
        assert_eq!(
            DocumentState::from(LoadError::PasswordProtected).error(),
            Some(LoadError::PasswordProtected)
        );
    }

    #[test]
    fn state_from_result() {
        let ok: Result<u8, LoadError> = Ok(1);
        let err: Result<u8, LoadError> = Err(LoadError::InvalidResource);
        assert_eq!(DocumentState::from(&ok), DocumentState::Success);
        assert_eq!(
            DocumentState::from(&err),
            DocumentState::Failed(LoadError::InvalidResource)
        );
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            DocumentState::Failed(LoadError::PasswordProtected).to_string(),
            "password protected"
        );
    }
}
