// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Agent-side `/sync` endpoint
//!
//! The simulation posts its output buffer as form field `outputData`; the handler turns it
//! into the next input buffer, which goes back as the JSON response body.

use crate::buffers::DataMap;
use crate::sync_server_error::SyncServerError;
use crate::transport::{OUTPUT_FIELD, SYNC_PATH};
use axum::extract::{Form, State};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Turns one simulation output buffer into the next input buffer
///
/// Implementations keep their own state behind `&self` (a learner, a controller, ...).
pub trait SyncHandler: Send + Sync + 'static {
    fn sync(&self, output: DataMap) -> DataMap;
}

impl<F> SyncHandler for F
where
    F: Fn(DataMap) -> DataMap + Send + Sync + 'static,
{
    fn sync(&self, output: DataMap) -> DataMap {
        self(output)
    }
}

/// Replies with exactly what it received
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl SyncHandler for EchoHandler {
    fn sync(&self, output: DataMap) -> DataMap {
        output
    }
}

type SharedHandler = Arc<dyn SyncHandler>;

/// Build the router serving `POST /sync`
pub fn sync_router<H: SyncHandler>(handler: H) -> Router {
    let handler: SharedHandler = Arc::new(handler);
    Router::new()
        .route(SYNC_PATH, post(handle_sync))
        .with_state(handler)
}

async fn handle_sync(
    State(handler): State<SharedHandler>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<DataMap>, SyncServerError> {
    let raw = form
        .get(OUTPUT_FIELD)
        .ok_or_else(|| SyncServerError::MissingField(OUTPUT_FIELD.to_string()))?;

    let output = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!("[SERVER] Rejected non-object output data");
            return Err(SyncServerError::NotAnObject(
                match other {
                    Value::Array(_) => "array",
                    Value::String(_) => "string",
                    Value::Number(_) => "number",
                    Value::Bool(_) => "bool",
                    _ => "null",
                }
                .to_string(),
            ));
        }
        Err(e) => {
            warn!("[SERVER] Rejected malformed output data: {}", e);
            return Err(e.into());
        }
    };

    let output_keys = output.len();
    let input = handler.sync(output);
    debug!(
        "[SERVER] Sync handled: {} output keys -> {} input keys",
        output_keys,
        input.len()
    );
    Ok(Json(input))
}

/// Bind `addr` and serve until `shutdown` resolves
pub async fn serve<H, S>(addr: &str, handler: H, shutdown: S) -> Result<(), SyncServerError>
where
    H: SyncHandler,
    S: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| SyncServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    serve_listener(listener, handler, shutdown).await
}

/// Serve on an already-bound listener (port 0 in tests)
pub async fn serve_listener<H, S>(
    listener: TcpListener,
    handler: H,
    shutdown: S,
) -> Result<(), SyncServerError>
where
    H: SyncHandler,
    S: Future<Output = ()> + Send + 'static,
{
    if let Ok(local) = listener.local_addr() {
        info!("[SERVER] Listening on http://{}{}", local, SYNC_PATH);
    }
    axum::serve(listener, sync_router(handler))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(SyncServerError::Serve)?;
    info!("[SERVER] Stopped");
    Ok(())
}
