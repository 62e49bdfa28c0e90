//! ActivityPub federation for murmur.
//!
//! - **Activities**: Follow, Like, Undo, Create
//! - **Objects**: Note
//! - **Processing**: inbox dispatch and remote actor discovery
//! - **Discovery**: `WebFinger`
//! - **Handlers**: axum routes for `WebFinger` and the inboxes

pub mod activities;
pub mod client;
pub mod handler;
pub mod objects;
pub mod processor;
pub mod webfinger;

pub use activities::*;
pub use client::{ApClient, ApClientError};
pub use handler::*;
pub use objects::*;
pub use processor::{ActorFetcher, InboxActivity, InboxOutcome, InboxProcessor};
pub use webfinger::{WebfingerError, WebfingerLink, WebfingerResolver, WebfingerResponse};
