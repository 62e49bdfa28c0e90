//! Inbox processing for incoming `ActivityPub` activities.

#![allow(missing_docs)]

mod actor_fetcher;
mod inbox;

pub use actor_fetcher::ActorFetcher;
pub use inbox::{InboxActivity, InboxOutcome, InboxProcessor};
