//! Core business logic for murmur.
//!
//! Services mutate the actor/post/comment/notification graph. Side effects
//! that must not block the caller (notifications, mention scans) go through
//! the [`NotificationFanout`] queue and run on a [`FanoutWorker`].

pub mod services;

pub use services::*;
