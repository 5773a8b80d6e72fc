// src/server/handlers.rs

//! Request handlers for `/new` and `/status/{id}`.

use std::sync::Arc;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exec::sink;
use crate::server::AppState;
use crate::server::error::ApiError;
use crate::status::ExecutionStatus;
use crate::types::StatusId;

/// Response header carrying the status id of a started command.
pub const STATUS_ID_HEADER: HeaderName = HeaderName::from_static("x-status-id");

const SINK_CAPACITY: usize = 16;

/// Body of `POST /new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommandRequest {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Start a command: POST /new
///
/// Headers (status id, content type) are part of the returned response, so
/// they are on the wire before the first output chunk. The subprocess is then
/// driven on its own task while the body streams.
pub async fn new_command(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: NewCommandRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "rejecting malformed /new body");
        ApiError::bad_request(format!("invalid request body: {e}"))
    })?;

    let execution = state.engine.start(&request.name, request.args).await?;
    let id = execution.id();

    let cancel = state.shutdown.child_token();
    let (sink, output) = sink::channel(SINK_CAPACITY, &cancel);

    tokio::spawn(async move {
        execution.run(sink, cancel).await;
    });

    let headers = [
        (STATUS_ID_HEADER, HeaderValue::from(id)),
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        ),
    ];
    Ok((headers, Body::from_stream(output)).into_response())
}

/// Look up a finished run: POST /status/{id}
///
/// The route captures the whole remainder of the path, so extra segments
/// such as `/status/1/extra` arrive here and are rejected as malformed.
pub async fn command_status(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ExecutionStatus>, ApiError> {
    let id = parse_status_id(&raw_id)?;

    state
        .engine
        .ledger()
        .get(id)
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Parse the id part of a status path.
///
/// Anything that is not a single integer segment is a 400. Negative integers
/// are well-formed but can never have been allocated, so they are a 404.
pub fn parse_status_id(raw: &str) -> Result<StatusId, ApiError> {
    let invalid = || ApiError::bad_request(format!("invalid status id: {raw}"));

    if raw.is_empty() || raw.contains('/') {
        return Err(invalid());
    }
    if let Ok(id) = raw.parse::<StatusId>() {
        return Ok(id);
    }
    match raw.strip_prefix('-') {
        Some(magnitude) if !magnitude.is_empty() && magnitude.bytes().all(|b| b.is_ascii_digit()) => {
            Err(ApiError::NotFound)
        }
        _ => Err(invalid()),
    }
}

/// POST /status or /status/ without an id.
pub async fn missing_status_id() -> ApiError {
    ApiError::bad_request("missing status id")
}
