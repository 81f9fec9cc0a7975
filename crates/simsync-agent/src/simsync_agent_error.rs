// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the sync client

use crate::exchange::ExchangeId;
use std::time::Duration;

/// Result type alias using SyncAgentError
pub type Result<T> = std::result::Result<T, SyncAgentError>;

/// Errors raised by the sync client
#[derive(Debug, thiserror::Error)]
pub enum SyncAgentError {
    /// Network-level failure (connect, send, read body)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server responded with HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response decoded to JSON, but not to an object
    #[error("Response body is not a JSON object (got {0})")]
    NotAnObject(String),

    /// No response within the configured deadline
    #[error("Exchange timed out after {0:?}")]
    Timeout(Duration),

    /// Exchange aborted before it completed
    #[error("Exchange {0} was cancelled")]
    Cancelled(ExchangeId),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Session used before `start()`
    #[error("Session not started - call start() first")]
    NotStarted,

    /// `start()` called twice
    #[error("Session already started")]
    AlreadyStarted,

    /// Session used after `shutdown()`
    #[error("Session has been shut down")]
    ShutDown,

    /// Exchange attempted while another one is outstanding
    #[error("Exchange {0} is still in flight")]
    InFlight(ExchangeId),

    /// A failed exchange, returned under `FailurePolicy::Surface`
    #[error("Exchange {id} failed: {source}")]
    ExchangeFailed {
        id: ExchangeId,
        #[source]
        source: Box<SyncAgentError>,
    },

    /// Async runtime unavailable or task died
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl SyncAgentError {
    /// Check if the next due tick may reasonably succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncAgentError::Transport(_) | SyncAgentError::Timeout(_) => true,
            SyncAgentError::HttpStatus { status, .. } => *status >= 500,
            SyncAgentError::ExchangeFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SyncAgentError::Timeout(Duration::from_millis(5)).is_retryable());
        assert!(SyncAgentError::HttpStatus {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!SyncAgentError::HttpStatus {
            status: 404,
            body: String::new()
        }
        .is_retryable());
        assert!(!SyncAgentError::NotAnObject("array".to_string()).is_retryable());
    }

    #[test]
    fn test_exchange_failed_wraps_source() {
        let err = SyncAgentError::ExchangeFailed {
            id: ExchangeId::new(7),
            source: Box::new(SyncAgentError::Timeout(Duration::from_millis(5))),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("Exchange #7 failed"));
    }
}
