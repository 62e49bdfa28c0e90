//! Inbox handlers for receiving `ActivityPub` activities.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::warn;

use crate::processor::InboxProcessor;

/// State required for the inbox handlers.
#[derive(Clone)]
pub struct InboxState {
    pub processor: InboxProcessor,
}

impl InboxState {
    /// Create a new inbox state.
    #[must_use]
    pub const fn new(processor: InboxProcessor) -> Self {
        Self { processor }
    }
}

/// Shared inbox.
pub async fn inbox_handler(State(state): State<InboxState>, body: Bytes) -> Response {
    handle(&state, &body, None).await
}

/// Per-actor inbox.
pub async fn user_inbox_handler(
    State(state): State<InboxState>,
    Path(username): Path<String>,
    body: Bytes,
) -> Response {
    handle(&state, &body, Some(username.as_str())).await
}

async fn handle(state: &InboxState, body: &[u8], target_handle: Option<&str>) -> Response {
    let raw: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Failed to parse activity");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    // Applied and Ignored are both acknowledged
    match state.processor.process(raw, target_handle).await {
        Ok(_) => StatusCode::ACCEPTED.into_response(),
        Err(e) => e.into_response(),
    }
}
