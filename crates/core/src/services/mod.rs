//! Business logic services.

pub mod actor;
pub mod comment;
pub mod fanout;
pub mod mention;
pub mod notification;
pub mod post;

#[cfg(test)]
mod test_support;

pub use actor::{ActorService, ActorSummary, FollowOutcome, RegisterActorInput, UpdateProfileInput};
pub use comment::{CommentResponse, CommentService};
pub use fanout::{FanoutContext, FanoutWorker, Job, NotificationFanout};
pub use mention::{Mention, MentionResolver, extract_mentions};
pub use notification::{CreateNotificationInput, NotificationResponse, NotificationService};
pub use post::{CreatePostInput, PostService, RemotePostInput, ToggleResult};
