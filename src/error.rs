//! Error types shared by adapters, the registry, and the query engine.

use serde::Serialize;

use crate::adapter::BackendKind;

pub type Result<T> = std::result::Result<T, QueueError>;

/// Machine-readable error classification for the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    UnsupportedOperation,
    DetectionFailed,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue {queue} not found")]
    QueueNotFound { queue: String },

    #[error("Job {id} not found")]
    JobNotFound { id: String },

    #[error("{backend} does not support {operation}")]
    Unsupported {
        backend: BackendKind,
        operation: String,
    },

    #[error("Could not detect queue backend type; pass the type explicitly")]
    DetectionFailed,

    #[error("Backend failure: {message}")]
    Internal { message: String },
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::QueueNotFound { .. } | QueueError::JobNotFound { .. } => {
                ErrorKind::NotFound
            }
            QueueError::Unsupported { .. } => ErrorKind::UnsupportedOperation,
            QueueError::DetectionFailed => ErrorKind::DetectionFailed,
            QueueError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn job_not_found(id: impl Into<String>) -> Self {
        QueueError::JobNotFound { id: id.into() }
    }

    pub fn unsupported(backend: BackendKind, operation: impl Into<String>) -> Self {
        QueueError::Unsupported {
            backend,
            operation: operation.into(),
        }
    }

    /// Wrap an arbitrary backend failure, passing existing kinds through.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        QueueError::Internal {
            message: err.to_string(),
        }
    }
}
