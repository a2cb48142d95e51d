//! Source-host port for opening change requests and deleting branches.

use crate::task::domain::{BranchName, Credentials, RepositoryRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for change-request operations.
pub type ChangeRequestResult<T> = Result<T, ChangeRequestError>;

/// A change request to open against the target repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Target repository.
    pub repository: RepositoryRef,
    /// Branch holding the worker's change.
    pub head: BranchName,
    /// Branch the change should merge into.
    pub base: String,
    /// Change request title.
    pub title: String,
    /// Change request body.
    pub body: String,
}

/// Change request created by the source host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedChangeRequest {
    /// Browser URL of the change request.
    pub url: String,
    /// Host-assigned number, when reported.
    pub number: Option<u64>,
}

/// Thin client over the source-hosting API.
#[async_trait]
pub trait ChangeRequestClient: Send + Sync {
    /// Opens a change request from `request.head` into `request.base`.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeRequestError`] when the host rejects the request or
    /// cannot be reached.
    async fn open_change_request(
        &self,
        request: &ChangeRequest,
        credentials: &Credentials,
    ) -> ChangeRequestResult<OpenedChangeRequest>;

    /// Deletes `branch` from `repository`.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeRequestError`] when the host rejects the deletion or
    /// cannot be reached. Callers treat this as advisory.
    async fn delete_branch(
        &self,
        repository: &RepositoryRef,
        branch: &BranchName,
        credentials: &Credentials,
    ) -> ChangeRequestResult<()>;
}

/// Errors returned by change-request client implementations.
#[derive(Debug, Clone, Error)]
pub enum ChangeRequestError {
    /// The host answered with a non-success status.
    #[error("source host rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message reported by the host.
        message: String,
    },

    /// The host answered successfully but the payload was unusable.
    #[error("unexpected source host response: {0}")]
    InvalidResponse(String),

    /// The request could not be rendered or sent.
    #[error("source host request failed: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl ChangeRequestError {
    /// Wraps a transport error from the client adapter.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
