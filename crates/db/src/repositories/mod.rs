//! Database repositories.

mod json_set;

pub mod actor;
pub mod comment;
pub mod notification;
pub mod post;

pub use actor::ActorRepository;
pub use comment::CommentRepository;
pub use notification::NotificationRepository;
pub use post::PostRepository;
