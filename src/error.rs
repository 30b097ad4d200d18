use crate::services::{RemoteError, StoreError};
use thiserror::Error;

/// Classified failure returned by every engine operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The caller passed something the engine refuses (self-swipe, bad range...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Neither the remote side nor the local store could serve the call
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A write lost a storage-level race; retry the read-check-act sequence
    #[error("conflict: {0}")]
    Conflict(String),
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Short machine-readable kind, used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidArgument(_) => "invalid_argument",
            EngineError::Unavailable(_) => "unavailable",
            EngineError::Conflict(_) => "conflict",
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => EngineError::Conflict(message),
            other => EngineError::Unavailable(format!("local store: {}", other)),
        }
    }
}

impl From<RemoteError> for EngineError {
    fn from(err: RemoteError) -> Self {
        EngineError::Unavailable(format!("remote: {}", err))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
