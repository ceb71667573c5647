//! The logical CRUD contract between the element store and the backend.

use std::sync::Arc;

use async_trait::async_trait;
use board_core::{BoardElement, BoardId, ElementId, ElementPatch, NewElement};
use thiserror::Error;

/// Errors a repository can report.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The request never completed (connection, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP-style status code.
        status: u16,
        /// Body or reason supplied by the backend.
        message: String,
    },
    /// The response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// The row does not exist or is not visible to the caller.
    #[error("element not found: {0}")]
    NotFound(ElementId),
    /// The backend refused the request outright.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Persistence for board elements.
///
/// Access control is enforced by the backend; implementations do not filter
/// by caller.
#[async_trait]
pub trait Repository: Send + Sync {
    /// All elements of a board, ascending by creation time.
    async fn list_elements(&self, board: &BoardId) -> Result<Vec<BoardElement>, RepositoryError>;

    /// Create an element; the backend assigns `id` and `created_at`.
    async fn create_element(&self, element: &NewElement) -> Result<BoardElement, RepositoryError>;

    /// Apply a partial update and return the full updated record.
    async fn update_element(
        &self,
        id: ElementId,
        patch: &ElementPatch,
    ) -> Result<BoardElement, RepositoryError>;

    /// Delete an element.
    async fn delete_element(&self, id: ElementId) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<R: Repository + ?Sized> Repository for Arc<R> {
    async fn list_elements(&self, board: &BoardId) -> Result<Vec<BoardElement>, RepositoryError> {
        (**self).list_elements(board).await
    }

    async fn create_element(&self, element: &NewElement) -> Result<BoardElement, RepositoryError> {
        (**self).create_element(element).await
    }

    async fn update_element(
        &self,
        id: ElementId,
        patch: &ElementPatch,
    ) -> Result<BoardElement, RepositoryError> {
        (**self).update_element(id, patch).await
    }

    async fn delete_element(&self, id: ElementId) -> Result<(), RepositoryError> {
        (**self).delete_element(id).await
    }
}
