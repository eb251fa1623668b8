//! Error types for cache loads.

use thiserror::Error;

/// Failure of a cache load, shared by every caller that waited on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheLoadError<E> {
    /// The loader returned an error; nothing was cached.
    #[error("cache load failed: {0}")]
    Failed(#[source] E),

    /// The load task ended without producing a result.
    #[error("cache load task aborted: {0}")]
    Aborted(String),
}

impl<E> CacheLoadError<E> {
    /// Returns the loader error when the load itself failed.
    #[must_use]
    pub const fn loader_error(&self) -> Option<&E> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Aborted(_) => None,
        }
    }
}
