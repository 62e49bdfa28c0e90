//! `ActivityPub` activity types accepted by the inbox.

#![allow(missing_docs)]

mod create;
mod follow;
mod like;
mod undo;

pub use create::CreateActivity;
pub use follow::FollowActivity;
pub use like::LikeActivity;
pub use undo::{UndoActivity, UndoObject};
