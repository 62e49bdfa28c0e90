//! `ActivityPub` request handlers.

#![allow(missing_docs)]

mod inbox;
mod webfinger;

use axum::{
    Router,
    routing::{get, post},
};

pub use inbox::{InboxState, inbox_handler, user_inbox_handler};
pub use webfinger::{WebfingerQuery, WebfingerState, webfinger_handler};

/// Federation routes: `WebFinger` and the shared and per-actor inboxes.
pub fn router(inbox_state: InboxState, webfinger_state: WebfingerState) -> Router {
    Router::new()
        .route(
            "/.well-known/webfinger",
            get(webfinger_handler).with_state(webfinger_state),
        )
        .route("/inbox", post(inbox_handler).with_state(inbox_state.clone()))
        .route(
            "/users/{username}/inbox",
            post(user_inbox_handler).with_state(inbox_state),
        )
}
