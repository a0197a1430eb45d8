//! Error taxonomy shared by every domain operation

use thiserror::Error;

/// Errors surfaced by SPECTRA operations.
///
/// `Upstream` exists so collaborators can describe external failures, but the
/// latency and intensity feeds recover from it locally and never hand it to
/// request handlers.
#[derive(Debug, Error)]
pub enum SpectraError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl SpectraError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SpectraError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        SpectraError::NotFound(msg.into())
    }

    /// True for errors caused by the caller's request rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SpectraError::Validation(_) | SpectraError::NotFound(_) | SpectraError::Conflict(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SpectraError>;
