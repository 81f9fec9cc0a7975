// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Errors raised by the `/sync` server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum SyncServerError {
    /// Request form lacks the output field
    #[error("Missing form field '{0}'")]
    MissingField(String),

    /// Output field is not valid JSON
    #[error("Invalid JSON in output data: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Output field is JSON, but not an object
    #[error("Output data must be a JSON object (got {0})")]
    NotAnObject(String),

    /// Could not bind the listening socket
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server loop failed
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl SyncServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncServerError::MissingField(_)
            | SyncServerError::InvalidJson(_)
            | SyncServerError::NotAnObject(_) => StatusCode::BAD_REQUEST,
            SyncServerError::Bind { .. } | SyncServerError::Serve(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for SyncServerError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}
