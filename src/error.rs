//! Error types for the access engine.
//!
//! `MoveError` carries the four outcomes of move validation; `ApiError` is what
//! callers of the service layer see, and `StorageError` wraps store failures.

use crate::types::NodeId;
use thiserror::Error;

/// Storage-layer failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Reasons a re-parent operation is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Forbidden: crud permission required on {0}")]
    Forbidden(NodeId),

    #[error("Invalid move target: {0}")]
    InvalidTarget(String),

    #[error("Moving {node} under {target} would create a cycle")]
    WouldCreateCycle { node: NodeId, target: NodeId },
}

/// Errors surfaced to controllers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Moving {node} under {target} would create a cycle")]
    WouldCreateCycle { node: NodeId, target: NodeId },

    #[error("Inconsistent tree: {0}")]
    Consistency(String),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Share link denied: {0}")]
    ShareDenied(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl ApiError {
    /// HTTP-style status code a controller should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::Forbidden(_) | ApiError::ShareDenied(_) => 403,
            ApiError::InvalidTarget(_)
            | ApiError::WouldCreateCycle { .. }
            | ApiError::InvalidNode(_) => 400,
            ApiError::Consistency(_) | ApiError::ConfigError(_) | ApiError::StorageError(_) => 500,
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<MoveError> for ApiError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::NotFound(id) => ApiError::NotFound(id),
            MoveError::Forbidden(id) => {
                ApiError::Forbidden(format!("crud permission required on {}", id))
            }
            MoveError::InvalidTarget(reason) => ApiError::InvalidTarget(reason),
            MoveError::WouldCreateCycle { node, target } => {
                ApiError::WouldCreateCycle { node, target }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_errors_keep_their_category() {
        let err: ApiError = MoveError::NotFound("a".to_string()).into();
        assert_eq!(err.status_code(), 404);

        let err: ApiError = MoveError::Forbidden("a".to_string()).into();
        assert_eq!(err.status_code(), 403);

        let err: ApiError = MoveError::InvalidTarget("gone".to_string()).into();
        assert_eq!(err.status_code(), 400);

        let err: ApiError = MoveError::WouldCreateCycle {
            node: "a".to_string(),
            target: "b".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::WouldCreateCycle { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_consistency_is_internal() {
        let err = ApiError::Consistency("cycle at x".to_string());
        assert_eq!(err.status_code(), 500);
    }
}
