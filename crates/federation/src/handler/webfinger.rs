//! `WebFinger` handler for actor discovery.

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::webfinger::{WebfingerError, WebfingerResolver};

/// `WebFinger` query parameters.
#[derive(Debug, Deserialize)]
pub struct WebfingerQuery {
    pub resource: String,
}

/// State required for the `WebFinger` handler.
#[derive(Clone)]
pub struct WebfingerState {
    pub resolver: WebfingerResolver,
}

impl WebfingerState {
    /// Create a new `WebFinger` state.
    #[must_use]
    pub const fn new(resolver: WebfingerResolver) -> Self {
        Self { resolver }
    }
}

/// Handle `WebFinger` requests.
///
/// Example: `/.well-known/webfinger?resource=acct:alice@example.com`
pub async fn webfinger_handler(
    State(state): State<WebfingerState>,
    Query(query): Query<WebfingerQuery>,
) -> Response {
    info!(resource = %query.resource, "WebFinger lookup");

    match state.resolver.resolve_resource(&query.resource).await {
        Ok(document) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/jrd+json")],
            Json(document),
        )
            .into_response(),
        Err(e) => {
            let status = match e {
                WebfingerError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
                WebfingerError::NotLocal(_) | WebfingerError::NotFound(_) => StatusCode::NOT_FOUND,
                WebfingerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string()).into_response()
        }
    }
}
