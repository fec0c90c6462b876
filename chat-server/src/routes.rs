//! HTTP route handlers.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::client::FrameStream;
use crate::error::ChatError;
use crate::server::AppState;
use crate::sse::event_stream;
use crate::tool::{ToolCall, ToolResult};
use crate::types::ChatCompletionRequest;

/// An error returned before the answer stream starts.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        let status = if matches!(e, ChatError::BadRequest(_)) {
            StatusCode::BAD_REQUEST
        } else if e.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// `POST /v1/chat/completions`
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let frames = state.orchestrator.answer(request).await.map_err(|e| {
        error!("chat completion failed: {e}");
        ApiError::from(e)
    })?;

    Ok(sse_response(frames))
}

fn sse_response(frames: FrameStream) -> Response {
    (
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
        ],
        Body::from_stream(event_stream(frames)),
    )
        .into_response()
}

/// `GET /v1/tools`
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!([state.tool.definition()]))
}

/// `POST /v1/tools/retrieve_documents`
pub async fn retrieve_documents(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ToolCall>, JsonRejection>,
) -> Json<ToolResult> {
    let arguments = match payload {
        Ok(Json(call)) => call.into_arguments().map_err(|e| e.to_string()),
        Err(rejection) => Err(rejection.body_text()),
    };

    match arguments {
        Ok(arguments) => Json(state.tool.call(arguments).await),
        Err(message) => {
            warn!("invalid tool arguments: {message}");
            Json(ToolResult { result: None })
        }
    }
}

/// `GET /health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "ok": true, "documents": state.documents }))
}
