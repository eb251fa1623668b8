//! Gateway port for reading task records from the donor service.

use crate::donor_task::domain::{DonorTaskId, RemoteTaskRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for donor gateway operations.
pub type DonorGatewayResult<T> = Result<T, DonorGatewayError>;

/// Read-only access to donor task records.
///
/// Implementations perform one upstream round trip per call. They neither
/// cache nor retry; both belong to the calling service.
#[async_trait]
pub trait DonorTaskGateway: Send + Sync {
    /// Fetches the donor's task list.
    ///
    /// # Errors
    ///
    /// Returns [`DonorGatewayError`] classified by whether a retry could
    /// succeed.
    async fn fetch_all(&self) -> DonorGatewayResult<Vec<RemoteTaskRecord>>;

    /// Fetches a single task.
    ///
    /// Returns `None` when the donor service does not know the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DonorGatewayError`] for every other failure.
    async fn fetch_one(&self, id: &DonorTaskId) -> DonorGatewayResult<Option<RemoteTaskRecord>>;
}

/// Upstream failures that may clear on their own.
#[derive(Debug, Clone, Error)]
pub enum TransientFailure {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The donor service answered with a server error.
    #[error("donor service returned HTTP {0}")]
    ServerError(u16),

    /// The connection could not be established or was dropped.
    #[error("connection failed: {0}")]
    Connection(Arc<dyn std::error::Error + Send + Sync>),
}

/// Errors returned by donor gateway implementations.
#[derive(Debug, Clone, Error)]
pub enum DonorGatewayError {
    /// The donor service is temporarily unavailable.
    #[error("donor service unavailable: {0}")]
    TransientUpstream(#[source] TransientFailure),

    /// The donor service rejected the request; retrying will not help.
    #[error("donor service rejected the request: {reason}")]
    PermanentUpstream {
        /// HTTP status, when the rejection came with one.
        status: Option<u16>,
        /// Human-readable cause.
        reason: String,
    },

    /// The response body could not be understood.
    #[error("malformed donor response: {0}")]
    MalformedResponse(String),
}

impl DonorGatewayError {
    /// Wraps a connection-level failure.
    #[must_use]
    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::TransientUpstream(TransientFailure::Connection(Arc::new(err)))
    }

    /// Builds a permanent rejection carrying an HTTP status.
    #[must_use]
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::PermanentUpstream {
            status: Some(status),
            reason: reason.into(),
        }
    }

    /// Reports whether a later attempt could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientUpstream(_))
    }
}
