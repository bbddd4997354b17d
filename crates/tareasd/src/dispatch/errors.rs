//! Error types for request dispatch failures.
//!
//! Every variant renders into a failure response through
//! [`DispatchError::to_response`]. Parse and routing failures are recovered per
//! message; only [`DispatchError::RequestTooLarge`] and I/O failures end the
//! session.

use std::io;

use tareas_store::StoreError;
use thiserror::Error;

use crate::pool::PoolError;
use crate::tasks::TaskError;

use super::response::Response;

/// Errors surfaced during request parsing and dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The message was not a JSON request object.
    #[error("malformed input")]
    MalformedInput {
        /// Parser diagnostic, logged but never sent to the client.
        detail: String,
    },

    /// The `op` field named no known operation.
    #[error("unknown op: {op}")]
    UnknownOperation {
        /// Operation exactly as received.
        op: String,
    },

    /// The task descriptor was rejected.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Undelimited input exceeded the configured window.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Bytes buffered when the limit tripped.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },

    /// The credential store failed.
    #[error("internal error: {0}")]
    Store(#[from] StoreError),

    /// The worker pool could not run the request.
    #[error("internal error: {0}")]
    Pool(#[from] PoolError),

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialization failed.
    #[error("failed to serialize response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
}

impl DispatchError {
    /// Creates a malformed input error from any parser diagnostic.
    pub fn malformed(detail: impl ToString) -> Self {
        Self::MalformedInput {
            detail: detail.to_string(),
        }
    }

    /// Creates an unknown operation error.
    pub fn unknown_operation(op: impl Into<String>) -> Self {
        Self::UnknownOperation { op: op.into() }
    }

    /// Creates a request too large error.
    pub fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Returns `true` for errors reported to the client right before the
    /// session closes; the session lingers so the report is not lost.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RequestTooLarge { .. })
    }

    /// Renders the error as the failure response sent to the client.
    pub fn to_response(&self) -> Response {
        Response::failure(self.to_string())
    }
}
