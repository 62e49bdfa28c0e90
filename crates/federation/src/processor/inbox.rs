//! Inbox processing: turns incoming activities into local state changes.

use murmur_common::{AppError, AppResult};
use murmur_core::{ActorService, CommentService, PostService, RemotePostInput};
use murmur_db::entities::{actor, post, post::Visibility};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::actor_fetcher::{ActorFetcher, url_authority};
use crate::activities::{CreateActivity, FollowActivity, LikeActivity, UndoActivity, UndoObject};

/// An incoming activity, dispatched on its `type`.
#[derive(Debug, Clone)]
pub enum InboxActivity {
    Follow(FollowActivity),
    Like(LikeActivity),
    Undo(UndoActivity),
    Create(CreateActivity),
    /// Any type we do not act on, kept as received.
    Unknown(Value),
}

impl InboxActivity {
    /// Parse a raw payload.
    ///
    /// A known `type` whose shape does not match fails with `BadRequest`.
    /// Unrecognized types, and `Create` of anything but a Note, become
    /// [`InboxActivity::Unknown`].
    pub fn parse(value: Value) -> AppResult<Self> {
        if !value.is_object() {
            return Err(AppError::BadRequest(
                "Activity must be a JSON object".to_string(),
            ));
        }

        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Ok(Self::Unknown(value));
        };

        match kind {
            "Follow" => from_value(value).map(Self::Follow),
            "Like" => from_value(value).map(Self::Like),
            "Undo" => from_value(value).map(Self::Undo),
            "Create" => {
                let object_kind = value
                    .get("object")
                    .and_then(|o| o.get("type"))
                    .and_then(Value::as_str);
                if object_kind == Some("Note") {
                    from_value(value).map(Self::Create)
                } else {
                    Ok(Self::Unknown(value))
                }
            }
            _ => Ok(Self::Unknown(value)),
        }
    }

    /// Get the activity type as a string.
    #[must_use]
    pub const fn activity_type(&self) -> &str {
        match self {
            Self::Follow(_) => "Follow",
            Self::Like(_) => "Like",
            Self::Undo(_) => "Undo",
            Self::Create(_) => "Create",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Get the actor URL.
    #[must_use]
    pub const fn actor(&self) -> Option<&Url> {
        match self {
            Self::Follow(a) => Some(&a.actor),
            Self::Like(a) => Some(&a.actor),
            Self::Undo(a) => Some(&a.actor),
            Self::Create(a) => Some(&a.actor),
            Self::Unknown(_) => None,
        }
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::BadRequest(format!("Malformed activity: {e}")))
}

/// Map "not found" to `None`, keep other errors.
fn optional<T>(result: AppResult<T>) -> AppResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Result of processing an inbox activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxOutcome {
    /// Local state was updated (or already reflected the activity).
    Applied,
    /// Nothing to do: unknown type, unknown object or duplicate delivery.
    Ignored,
}

/// Processor for inbox deliveries.
#[derive(Clone)]
pub struct InboxProcessor {
    actor_service: ActorService,
    post_service: PostService,
    comment_service: CommentService,
    actor_fetcher: ActorFetcher,
}

impl InboxProcessor {
    /// Create a new inbox processor.
    #[must_use]
    pub const fn new(
        actor_service: ActorService,
        post_service: PostService,
        comment_service: CommentService,
        actor_fetcher: ActorFetcher,
    ) -> Self {
        Self {
            actor_service,
            post_service,
            comment_service,
            actor_fetcher,
        }
    }

    /// Process a raw activity delivered to the shared inbox, or to the inbox
    /// of `target_handle`.
    pub async fn process(
        &self,
        raw: Value,
        target_handle: Option<&str>,
    ) -> AppResult<InboxOutcome> {
        let activity = InboxActivity::parse(raw)?;

        info!(
            activity_type = activity.activity_type(),
            actor = ?activity.actor().map(Url::as_str),
            target = ?target_handle,
            "Processing inbox activity"
        );

        match activity {
            InboxActivity::Follow(follow) => self.follow(&follow, target_handle).await,
            InboxActivity::Like(like) => self.like(&like).await,
            InboxActivity::Undo(undo) => self.undo(&undo, target_handle).await,
            InboxActivity::Create(create) => self.create(&create).await,
            InboxActivity::Unknown(value) => {
                debug!(
                    activity_type = ?value.get("type"),
                    "Ignoring unsupported activity"
                );
                Ok(InboxOutcome::Ignored)
            }
        }
    }

    async fn follow(
        &self,
        activity: &FollowActivity,
        target_handle: Option<&str>,
    ) -> AppResult<InboxOutcome> {
        let Some(target) = self.local_target(&activity.object, target_handle).await? else {
            info!(object = %activity.object, "Follow target is not a local actor, ignoring");
            return Ok(InboxOutcome::Ignored);
        };

        let Some(follower) = self.remote_actor(&activity.actor).await? else {
            return Ok(InboxOutcome::Ignored);
        };

        let outcome = self.actor_service.follow(&follower.id, &target.id).await?;
        info!(
            follower = %follower.id,
            followee = %target.id,
            changed = outcome.changed,
            "Applied remote follow"
        );

        Ok(InboxOutcome::Applied)
    }

    async fn like(&self, activity: &LikeActivity) -> AppResult<InboxOutcome> {
        let Some(post) = self.post_service.find_by_uri(activity.object.as_str()).await? else {
            info!(object = %activity.object, "Liked object not found, ignoring");
            return Ok(InboxOutcome::Ignored);
        };

        let Some(liker) = self.remote_actor(&activity.actor).await? else {
            return Ok(InboxOutcome::Ignored);
        };

        let result = self.post_service.like_post(&post.id, &liker.id).await?;
        info!(post_id = %post.id, actor_id = %liker.id, changed = result.changed, "Applied remote like");

        Ok(InboxOutcome::Applied)
    }

    async fn undo(
        &self,
        activity: &UndoActivity,
        target_handle: Option<&str>,
    ) -> AppResult<InboxOutcome> {
        if let Some(inner) = activity.inner_actor()
            && inner != &activity.actor
        {
            warn!(
                actor = %activity.actor,
                inner_actor = %inner,
                "Undo of another actor's activity, ignoring"
            );
            return Ok(InboxOutcome::Ignored);
        }

        match &activity.object {
            UndoObject::Like(like) => {
                match self.post_service.find_by_uri(like.object.as_str()).await? {
                    Some(post) => self.undo_like(&activity.actor, &post).await,
                    None => {
                        info!(object = %like.object, "Unliked object not found, ignoring");
                        Ok(InboxOutcome::Ignored)
                    }
                }
            }
            UndoObject::Follow(follow) => {
                self.undo_follow(&activity.actor, &follow.object, target_handle)
                    .await
            }
            UndoObject::Reference(id) => {
                // Only a bare post or actor id can be interpreted
                if let Some(post) = self.post_service.find_by_uri(id.as_str()).await? {
                    return self.undo_like(&activity.actor, &post).await;
                }
                self.undo_follow(&activity.actor, id, None).await
            }
            UndoObject::Other(_) => {
                debug!("Ignoring Undo of unsupported object");
                Ok(InboxOutcome::Ignored)
            }
        }
    }

    async fn undo_like(&self, actor_url: &Url, post: &post::Model) -> AppResult<InboxOutcome> {
        let Some(actor) = self.known_remote_actor(actor_url).await? else {
            return Ok(InboxOutcome::Ignored);
        };

        let removed = self.post_service.unlike_post(&post.id, &actor.id).await?;
        info!(post_id = %post.id, actor_id = %actor.id, removed, "Applied remote unlike");

        Ok(InboxOutcome::Applied)
    }

    async fn undo_follow(
        &self,
        actor_url: &Url,
        object: &Url,
        target_handle: Option<&str>,
    ) -> AppResult<InboxOutcome> {
        let Some(follower) = self.known_remote_actor(actor_url).await? else {
            return Ok(InboxOutcome::Ignored);
        };
        let Some(target) = self.local_target(object, target_handle).await? else {
            info!(object = %object, "Unfollow target is not a local actor, ignoring");
            return Ok(InboxOutcome::Ignored);
        };

        let outcome = self.actor_service.unfollow(&follower.id, &target.id).await?;
        info!(
            follower = %follower.id,
            followee = %target.id,
            changed = outcome.changed,
            "Applied remote unfollow"
        );

        Ok(InboxOutcome::Applied)
    }

    async fn create(&self, activity: &CreateActivity) -> AppResult<InboxOutcome> {
        let note = &activity.object;

        if note.attributed_to != activity.actor {
            warn!(
                actor = %activity.actor,
                attributed_to = %note.attributed_to,
                "Note attributed to another actor, ignoring"
            );
            return Ok(InboxOutcome::Ignored);
        }

        if note.content.trim().is_empty() && note.attachment.is_empty() {
            debug!(note = %note.id, "Empty note, ignoring");
            return Ok(InboxOutcome::Ignored);
        }

        let Some(author) = self.remote_actor(&activity.actor).await? else {
            return Ok(InboxOutcome::Ignored);
        };

        if let Some(parent_uri) = &note.in_reply_to
            && let Some(parent) = self.post_service.find_by_uri(parent_uri.as_str()).await?
        {
            let created = self
                .comment_service
                .create_remote_comment(&parent, &author, &note.content, note.id.as_str())
                .await?;

            return Ok(match created {
                Some(comment) => {
                    info!(comment_id = %comment.id, post_id = %parent.id, "Stored remote reply");
                    InboxOutcome::Applied
                }
                None => {
                    debug!(note = %note.id, "Duplicate reply delivery");
                    InboxOutcome::Ignored
                }
            });
        }

        let visibility = if activity.is_public() {
            Visibility::Public
        } else {
            Visibility::Followers
        };

        let created = self
            .post_service
            .create_remote_post(
                &author,
                RemotePostInput {
                    uri: note.id.to_string(),
                    content: note.content.clone(),
                    sensitive: note.is_sensitive(),
                    content_warning: note.content_warning().map(String::from),
                    visibility,
                    attachments: note.attachment_urls(),
                },
            )
            .await?;

        Ok(match created {
            Some(post) => {
                info!(post_id = %post.id, author_id = %author.id, "Stored remote post");
                InboxOutcome::Applied
            }
            None => {
                debug!(note = %note.id, "Duplicate note delivery");
                InboxOutcome::Ignored
            }
        })
    }

    /// The local actor an activity addresses. The inbox owner stands in for
    /// `object` only when `object` is one of the owner's own local URLs.
    async fn local_target(
        &self,
        object: &Url,
        target_handle: Option<&str>,
    ) -> AppResult<Option<actor::Model>> {
        if let Some(actor) = optional(self.actor_service.resolve_actor(object.as_str()).await)? {
            return Ok(actor.is_local().then_some(actor));
        }

        let Some(handle) = target_handle.filter(|_| self.is_local_url(object)) else {
            return Ok(None);
        };

        let owner = optional(self.actor_service.resolve_actor(handle).await)?;
        Ok(owner.filter(|owner| {
            owner.is_local() && self.actor_service.is_own_url(owner, object.as_str())
        }))
    }

    /// The sending actor, created on first sight. `None` when the URL claims
    /// to be one of ours.
    async fn remote_actor(&self, actor_url: &Url) -> AppResult<Option<actor::Model>> {
        if self.is_local_url(actor_url) {
            warn!(actor = %actor_url, "Inbox activity claims a local actor, ignoring");
            return Ok(None);
        }

        let actor = match self.actor_fetcher.find_or_create(actor_url).await {
            Ok(actor) => actor,
            Err(AppError::Conflict(reason)) => {
                warn!(actor = %actor_url, %reason, "Cannot record sending actor, ignoring");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok((!actor.is_local()).then_some(actor))
    }

    /// The sending actor if we already know it. Undo never creates actors.
    async fn known_remote_actor(&self, actor_url: &Url) -> AppResult<Option<actor::Model>> {
        if self.is_local_url(actor_url) {
            return Ok(None);
        }

        let actor = optional(self.actor_service.resolve_actor(actor_url.as_str()).await)?;
        if actor.is_none() {
            debug!(actor = %actor_url, "Undo from unknown actor, ignoring");
        }
        Ok(actor.filter(|a| !a.is_local()))
    }

    fn is_local_url(&self, url: &Url) -> bool {
        url_authority(url).is_some_and(|authority| authority == self.actor_service.local_domain())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use murmur_core::{Job, NotificationFanout};
    use murmur_db::entities::{comment, notification::NotificationType};
    use murmur_db::repositories::{ActorRepository, CommentRepository, PostRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    const SERVER: &str = "https://local.test";

    fn local_actor(id: &str, username: &str) -> actor::Model {
        let uri = format!("{SERVER}/users/{id}");
        actor::Model {
            id: id.to_string(),
            inbox: Some(format!("{uri}/inbox")),
            uri,
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            host: None,
            name: None,
            summary: None,
            avatar_url: None,
            followers: json!([]),
            following: json!([]),
            followers_count: 0,
            following_count: 0,
            public_key_pem: None,
            private_key_pem: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn remote_actor(id: &str) -> actor::Model {
        actor::Model {
            uri: "https://remote.test/users/bob".to_string(),
            inbox: None,
            host: Some("remote.test".to_string()),
            ..local_actor(id, "bob")
        }
    }

    fn local_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            uri: format!("{SERVER}/posts/{id}"),
            author_id: author_id.to_string(),
            content: "hello".to_string(),
            visibility: Visibility::Public,
            sensitive: false,
            content_warning: None,
            attachments: json!([]),
            liked_by: json!([]),
            shared_by: json!([]),
            like_count: 0,
            share_count: 0,
            replies_count: 0,
            is_local: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    const fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    /// One mock per repository handle so each queue sees only its own queries.
    struct Mocks {
        actors: MockDatabase,
        posts: MockDatabase,
        comments: MockDatabase,
        fetched: MockDatabase,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                actors: MockDatabase::new(DatabaseBackend::Postgres),
                posts: MockDatabase::new(DatabaseBackend::Postgres),
                comments: MockDatabase::new(DatabaseBackend::Postgres),
                fetched: MockDatabase::new(DatabaseBackend::Postgres),
            }
        }

        fn build(self) -> (InboxProcessor, UnboundedReceiver<Job>) {
            let (fanout, rx) = NotificationFanout::channel();
            let empty = || {
                ActorRepository::new(Arc::new(
                    MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
                ))
            };

            let actor_service = ActorService::new(
                ActorRepository::new(Arc::new(self.actors.into_connection())),
                fanout.clone(),
                SERVER.to_string(),
                "local.test".to_string(),
            );
            let post_service = PostService::new(
                PostRepository::new(Arc::new(self.posts.into_connection())),
                empty(),
                fanout.clone(),
                SERVER.to_string(),
            );
            let comment_service = CommentService::new(
                CommentRepository::new(Arc::new(self.comments.into_connection())),
                empty(),
                post_service.clone(),
                fanout,
            );
            let fetcher = ActorFetcher::new(
                ActorRepository::new(Arc::new(self.fetched.into_connection())),
                None,
            );

            (
                InboxProcessor::new(actor_service, post_service, comment_service, fetcher),
                rx,
            )
        }
    }

    #[test]
    fn test_parse_unknown_type() {
        let activity = InboxActivity::parse(json!({
            "type": "Announce",
            "id": "https://remote.test/boosts/1",
            "actor": "https://remote.test/users/bob",
            "object": "https://local.test/posts/p1"
        }))
        .unwrap();

        assert!(matches!(activity, InboxActivity::Unknown(_)));
        assert_eq!(activity.activity_type(), "Unknown");
        assert!(activity.actor().is_none());
    }

    #[test]
    fn test_parse_create_of_non_note_is_unknown() {
        let activity = InboxActivity::parse(json!({
            "type": "Create",
            "id": "https://remote.test/create/1",
            "actor": "https://remote.test/users/bob",
            "object": { "type": "Question", "id": "https://remote.test/polls/1" }
        }))
        .unwrap();

        assert!(matches!(activity, InboxActivity::Unknown(_)));
    }

    #[test]
    fn test_parse_malformed_known_type_is_bad_request() {
        let result = InboxActivity::parse(json!({
            "type": "Follow",
            "id": "https://remote.test/follows/1",
            "actor": "https://remote.test/users/bob"
        }));

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_parse_non_object_is_bad_request() {
        let result = InboxActivity::parse(json!(["Follow"]));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_unknown_activity_is_ignored() {
        let (processor, _rx) = Mocks::new().build();

        let outcome = processor
            .process(json!({ "type": "Block", "actor": "https://remote.test/users/bob" }), None)
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_follow_creates_edge_and_notifies() {
        let alice = local_actor("a1", "alice");
        let bob = remote_actor("r1");

        let mut mocks = Mocks::new();
        mocks.actors = mocks
            .actors
            // resolve target by URI, then get_by_id for follower and target
            .append_query_results([[alice.clone()]])
            .append_query_results([[bob.clone()], [alice.clone()]])
            .append_exec_results([exec(1), exec(1)]);
        mocks.fetched = mocks.fetched.append_query_results([[bob]]);
        let (processor, mut rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Follow",
                    "id": "https://remote.test/follows/1",
                    "actor": "https://remote.test/users/bob",
                    "object": alice.uri
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Applied);
        match rx.try_recv().unwrap() {
            Job::Notify(input) => {
                assert_eq!(input.notification_type, NotificationType::Follow);
                assert_eq!(input.notifiee_id, "a1");
                assert_eq!(input.notifier_id, "r1");
            }
            other => panic!("Expected follow notification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_follow_of_unknown_target_is_ignored() {
        let mut mocks = Mocks::new();
        mocks.actors = mocks
            .actors
            .append_query_results([Vec::<actor::Model>::new()]);
        let (processor, _rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Follow",
                    "id": "https://remote.test/follows/2",
                    "actor": "https://remote.test/users/bob",
                    "object": "https://local.test/users/nobody"
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_follow_of_third_party_via_user_inbox_is_ignored() {
        let mut mocks = Mocks::new();
        mocks.actors = mocks
            .actors
            .append_query_results([Vec::<actor::Model>::new()]);
        let (processor, mut rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Follow",
                    "id": "https://remote.test/follows/3",
                    "actor": "https://remote.test/users/bob",
                    "object": "https://third.test/users/carol"
                }),
                Some("alice"),
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Ignored);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_follow_of_owner_profile_url_via_user_inbox() {
        let alice = local_actor("a1", "alice");
        let bob = remote_actor("r1");

        let mut mocks = Mocks::new();
        mocks.actors = mocks
            .actors
            // no actor has the profile URL as its URI, and "alice" is not an id
            .append_query_results([Vec::<actor::Model>::new(), Vec::new()])
            .append_query_results([[alice.clone()], [bob.clone()], [alice]])
            .append_exec_results([exec(1), exec(1)]);
        mocks.fetched = mocks.fetched.append_query_results([[bob]]);
        let (processor, mut rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Follow",
                    "id": "https://remote.test/follows/4",
                    "actor": "https://remote.test/users/bob",
                    "object": "https://local.test/@alice"
                }),
                Some("alice"),
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Applied);
        assert!(matches!(
            rx.try_recv().unwrap(),
            Job::Notify(ref input) if input.notifiee_id == "a1"
        ));
    }

    #[tokio::test]
    async fn test_undo_follow_of_third_party_via_user_inbox_is_ignored() {
        let mut mocks = Mocks::new();
        mocks.actors = mocks
            .actors
            .append_query_results([[remote_actor("r1")]])
            .append_query_results([Vec::<actor::Model>::new()]);
        let (processor, _rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Undo",
                    "id": "https://remote.test/undo/3",
                    "actor": "https://remote.test/users/bob",
                    "object": {
                        "type": "Follow",
                        "id": "https://remote.test/follows/3",
                        "actor": "https://remote.test/users/bob",
                        "object": "https://third.test/users/carol"
                    }
                }),
                Some("alice"),
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_follow_from_actor_with_taken_handle_is_ignored() {
        let alice = local_actor("a1", "alice");

        let mut mocks = Mocks::new();
        mocks.actors = mocks.actors.append_query_results([[alice.clone()]]);
        mocks.fetched = mocks
            .fetched
            .append_query_results([Vec::<actor::Model>::new()])
            .append_query_results([[remote_actor("r1")]]);
        let (processor, mut rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Follow",
                    "id": "https://remote.test/follows/5",
                    "actor": "https://remote.test/u/bob",
                    "object": alice.uri
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Ignored);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_like_applies_and_notifies_author() {
        let post = local_post("p1", "a1");

        let mut mocks = Mocks::new();
        mocks.posts = mocks
            .posts
            .append_query_results([[post.clone()], [post.clone()]])
            .append_exec_results([exec(1)]);
        mocks.fetched = mocks.fetched.append_query_results([[remote_actor("r1")]]);
        let (processor, mut rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Like",
                    "id": "https://remote.test/likes/1",
                    "actor": "https://remote.test/users/bob",
                    "object": post.uri
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Applied);
        assert!(matches!(
            rx.try_recv().unwrap(),
            Job::Notify(ref input) if input.notification_type == NotificationType::Like
        ));
    }

    #[tokio::test]
    async fn test_like_of_unknown_post_is_ignored() {
        let mut mocks = Mocks::new();
        mocks.posts = mocks
            .posts
            .append_query_results([Vec::<post::Model>::new()]);
        let (processor, mut rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Like",
                    "id": "https://remote.test/likes/2",
                    "actor": "https://remote.test/users/bob",
                    "object": "https://elsewhere.test/notes/9"
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Ignored);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_undo_of_foreign_activity_is_ignored() {
        let (processor, _rx) = Mocks::new().build();

        let outcome = processor
            .process(
                json!({
                    "type": "Undo",
                    "id": "https://remote.test/undo/1",
                    "actor": "https://remote.test/users/mallory",
                    "object": {
                        "type": "Like",
                        "id": "https://remote.test/likes/1",
                        "actor": "https://remote.test/users/bob",
                        "object": "https://local.test/posts/p1"
                    }
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_undo_like_removes_like() {
        let post = local_post("p1", "a1");

        let mut mocks = Mocks::new();
        mocks.posts = mocks
            .posts
            .append_query_results([[post.clone()]])
            .append_exec_results([exec(1)]);
        mocks.actors = mocks.actors.append_query_results([[remote_actor("r1")]]);
        let (processor, _rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Undo",
                    "id": "https://remote.test/undo/2",
                    "actor": "https://remote.test/users/bob",
                    "object": {
                        "type": "Like",
                        "id": "https://remote.test/likes/1",
                        "actor": "https://remote.test/users/bob",
                        "object": post.uri
                    }
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Applied);
    }

    #[tokio::test]
    async fn test_create_reply_becomes_comment() {
        let post = local_post("p1", "a1");
        let stored = comment::Model {
            id: "c1".to_string(),
            post_id: "p1".to_string(),
            author_id: "r1".to_string(),
            content: "nice post".to_string(),
            uri: Some("https://remote.test/notes/1".to_string()),
            created_at: Utc::now().into(),
        };

        let mut mocks = Mocks::new();
        mocks.fetched = mocks.fetched.append_query_results([[remote_actor("r1")]]);
        mocks.posts = mocks
            .posts
            .append_query_results([[post.clone()]])
            .append_exec_results([exec(1)]);
        mocks.comments = mocks
            .comments
            .append_query_results([Vec::<comment::Model>::new()])
            .append_query_results([[stored]]);
        let (processor, mut rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Create",
                    "id": "https://remote.test/notes/1/activity",
                    "actor": "https://remote.test/users/bob",
                    "object": {
                        "type": "Note",
                        "id": "https://remote.test/notes/1",
                        "attributedTo": "https://remote.test/users/bob",
                        "content": "nice post",
                        "inReplyTo": post.uri,
                        "to": ["https://www.w3.org/ns/activitystreams#Public"]
                    }
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Applied);
        match rx.try_recv().unwrap() {
            Job::Notify(input) => {
                assert_eq!(input.notification_type, NotificationType::Comment);
                assert_eq!(input.comment_id.as_deref(), Some("c1"));
            }
            other => panic!("Expected comment notification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_duplicate_note_is_ignored() {
        let existing = post::Model {
            uri: "https://remote.test/notes/2".to_string(),
            is_local: false,
            ..local_post("p9", "r1")
        };

        let mut mocks = Mocks::new();
        mocks.fetched = mocks.fetched.append_query_results([[remote_actor("r1")]]);
        mocks.posts = mocks.posts.append_query_results([[existing]]);
        let (processor, _rx) = mocks.build();

        let outcome = processor
            .process(
                json!({
                    "type": "Create",
                    "id": "https://remote.test/notes/2/activity",
                    "actor": "https://remote.test/users/bob",
                    "object": {
                        "type": "Note",
                        "id": "https://remote.test/notes/2",
                        "attributedTo": "https://remote.test/users/bob",
                        "content": "hello again"
                    }
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_activity_claiming_local_actor_is_ignored() {
        let (processor, _rx) = Mocks::new().build();

        let outcome = processor
            .process(
                json!({
                    "type": "Create",
                    "id": "https://local.test/fake/1",
                    "actor": "https://local.test/users/a1",
                    "object": {
                        "type": "Note",
                        "id": "https://local.test/fake-note/1",
                        "attributedTo": "https://local.test/users/a1",
                        "content": "forged"
                    }
                }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, InboxOutcome::Ignored);
    }
}
