// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Exchange transports
//!
//! A transport carries one serialized output buffer to the sync server and brings back
//! the decoded input buffer. `HttpFormTransport` speaks the `/sync` form protocol:
//! `POST <server_url>/sync` with form field `outputData` holding the JSON object.

use crate::buffers::DataMap;
use crate::simsync_agent_error::{Result, SyncAgentError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

/// Path appended to the server base URL
pub const SYNC_PATH: &str = "/sync";

/// Form field carrying the serialized output buffer
pub const OUTPUT_FIELD: &str = "outputData";

/// One request/response round trip
#[async_trait]
pub trait ExchangeTransport: Send + Sync {
    /// Send `payload` (a JSON object) and return the decoded response object
    async fn exchange(&self, payload: String) -> Result<DataMap>;
}

/// Decode a response body into an input map. Anything but a JSON object is rejected.
pub fn decode_response(body: &str) -> Result<DataMap> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(SyncAgentError::NotAnObject(json_kind(&other).to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Build the exchange endpoint from a base URL, tolerating a trailing slash
pub fn sync_url(server_url: &str) -> String {
    format!("{}{}", server_url.trim_end_matches('/'), SYNC_PATH)
}

/// HTTP form POST transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFormTransport {
    http_client: reqwest::Client,
    url: String,
}

impl HttpFormTransport {
    /// Create a transport with its own HTTP client.
    ///
    /// `timeout` is applied per request by `reqwest`; the session applies its own deadline
    /// on top, so this is mostly useful when the transport is used on its own.
    pub fn new(server_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_http_client(server_url, builder.build()?))
    }

    /// Create a transport using a pre-configured HTTP client (shared proxies, headers, pools).
    pub fn with_http_client(server_url: &str, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            url: sync_url(server_url),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ExchangeTransport for HttpFormTransport {
    async fn exchange(&self, payload: String) -> Result<DataMap> {
        trace!("[TRANSPORT] POST {} ({} bytes)", self.url, payload.len());

        let resp = self
            .http_client
            .post(&self.url)
            .form(&[(OUTPUT_FIELD, payload)])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SyncAgentError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        decode_response(&body)
    }
}
