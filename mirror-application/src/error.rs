use thiserror::Error;

use mirror_domain::{EventId, QueryKind, RemoteError};

use crate::fetch::{PageFetchError, RetryError};

/// Entity-level failure. The orchestrator decides whether it defers or aborts.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Page(#[from] PageFetchError),
    #[error("remote call failed: {0}")]
    Remote(#[from] RetryError<RemoteError>),
    #[error("malformed {kind} response: {message}")]
    Malformed { kind: QueryKind, message: String },
    #[error("event {0} has no phase")]
    NoPhase(EventId),
    #[error("{0} not found on remote")]
    NotFound(String),
    #[error("path {path} already holds event {owner}")]
    PathCollision { path: String, owner: EventId },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl SyncError {
    /// Transient failures are deferred to the next run rather than treated as permanent.
    pub fn is_deferred(&self) -> bool {
        match self {
            SyncError::Page(err) => err.error.is_exhausted(),
            SyncError::Remote(err) => err.is_exhausted(),
            SyncError::Store(_) => true,
            SyncError::Malformed { .. }
            | SyncError::NoPhase(_)
            | SyncError::NotFound(_)
            | SyncError::PathCollision { .. } => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("integrity check failed: {0} issue(s)")]
    Integrity(usize),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
