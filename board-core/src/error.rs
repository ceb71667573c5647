//! Error types for board operations.

use thiserror::Error;

use crate::validation::ValidationError;
use crate::ElementId;

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;

/// Errors that can occur in board operations.
///
/// Remote failures carry the underlying message so callers can surface it
/// to the user as-is.
#[derive(Debug, Error)]
pub enum BoardError {
    /// A required identifier (board id, API endpoint) is missing.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Loading the board's elements failed.
    #[error("Failed to load elements: {0}")]
    Fetch(String),

    /// Creating an element failed.
    #[error("Failed to create element: {0}")]
    Create(String),

    /// Updating an element failed.
    #[error("Failed to update element: {0}")]
    Update(String),

    /// Deleting an element failed.
    #[error("Failed to delete element: {0}")]
    Delete(String),

    /// Input rejected before reaching the repository.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Element not found in the canonical list.
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    /// A previous mutation for this element has not resolved yet.
    #[error("Element {0} has a mutation in flight")]
    Busy(ElementId),
}

impl BoardError {
    /// The user-facing message for this error.
    ///
    /// Remote failures return the backend's message without the operation
    /// prefix, matching what a modal would show.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(msg) | Self::Create(msg) | Self::Update(msg) | Self::Delete(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }

    /// Returns true if this error came back from the repository.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::Create(_) | Self::Update(_) | Self::Delete(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_strips_prefix_for_remote_errors() {
        let err = BoardError::Update("row level security".to_string());
        assert_eq!(err.user_message(), "row level security");
        assert!(err.is_remote());
        assert_eq!(
            err.to_string(),
            "Failed to update element: row level security"
        );
    }

    #[test]
    fn test_local_errors_are_not_remote() {
        let err = BoardError::NotConfigured("board id".to_string());
        assert!(!err.is_remote());
        assert_eq!(err.user_message(), "Not configured: board id");
    }
}
