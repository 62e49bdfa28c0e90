//! Actor directory: local registration, profiles, follow graph and lookup.

use murmur_common::{AppError, AppResult, IdGenerator, generate_rsa_keypair};
use murmur_db::{
    entities::{actor, notification::NotificationType},
    repositories::ActorRepository,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::{Validate, ValidationError};

use crate::services::fanout::NotificationFanout;
use crate::services::notification::CreateNotificationInput;

/// Display name used when an actor can no longer be loaded.
pub const PLACEHOLDER_NAME: &str = "Someone";

/// Actor service for business logic.
#[derive(Clone)]
pub struct ActorService {
    actor_repo: ActorRepository,
    fanout: NotificationFanout,
    server_url: String,
    local_domain: String,
    id_gen: IdGenerator,
}

/// Input for registering a local actor.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterActorInput {
    #[validate(length(min = 1, max = 64), custom(function = "validate_username"))]
    pub username: String,

    #[validate(length(max = 256))]
    pub name: Option<String>,

    #[validate(length(max = 2048))]
    pub summary: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Input for updating a profile. `None` leaves a field unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(max = 256))]
    pub name: Option<String>,

    #[validate(length(max = 2048))]
    pub summary: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Denormalized author/notifier summary embedded in responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorSummary {
    pub id: String,
    pub username: String,
    pub host: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ActorSummary {
    /// Summary for an actor that cannot be loaded.
    #[must_use]
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            username: PLACEHOLDER_NAME.to_lowercase(),
            host: None,
            name: Some(PLACEHOLDER_NAME.to_string()),
            avatar_url: None,
        }
    }
}

impl From<&actor::Model> for ActorSummary {
    fn from(actor: &actor::Model) -> Self {
        Self {
            id: actor.id.clone(),
            username: actor.username.clone(),
            host: actor.host.clone(),
            name: actor.name.clone(),
            avatar_url: actor.avatar_url.clone(),
        }
    }
}

/// Result of a follow/unfollow call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowOutcome {
    /// Whether the edge was created (follow) or removed (unfollow).
    pub changed: bool,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username"))
    }
}

fn username_conflict(username: &str) -> AppError {
    AppError::Conflict(format!("Username already taken: {username}"))
}

impl ActorService {
    /// Create a new actor service.
    #[must_use]
    pub fn new(
        actor_repo: ActorRepository,
        fanout: NotificationFanout,
        server_url: String,
        local_domain: String,
    ) -> Self {
        Self {
            actor_repo,
            fanout,
            server_url: server_url.trim_end_matches('/').to_string(),
            local_domain: local_domain.to_lowercase(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Domain local handles belong to.
    #[must_use]
    pub fn local_domain(&self) -> &str {
        &self.local_domain
    }

    /// Profile page of a local actor.
    #[must_use]
    pub fn profile_url(&self, actor: &actor::Model) -> String {
        format!("{}/@{}", self.server_url, actor.username)
    }

    /// Whether `url` names `actor`: its federation URI, or the profile page
    /// of a local actor.
    #[must_use]
    pub fn is_own_url(&self, actor: &actor::Model, url: &str) -> bool {
        let url = url.trim_end_matches('/');
        url == actor.uri || (actor.is_local() && url.eq_ignore_ascii_case(&self.profile_url(actor)))
    }

    /// Register a new local actor.
    pub async fn register(&self, input: RegisterActorInput) -> AppResult<actor::Model> {
        input.validate()?;

        if self.username_taken(&input.username).await? {
            return Err(username_conflict(&input.username));
        }

        let keypair = generate_rsa_keypair()?;
        let actor_id = self.id_gen.generate();
        let uri = format!("{}/users/{actor_id}", self.server_url);

        let model = actor::ActiveModel {
            id: Set(actor_id),
            uri: Set(uri.clone()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            host: Set(None),
            name: Set(input.name),
            summary: Set(input.summary),
            avatar_url: Set(input.avatar_url),
            inbox: Set(Some(format!("{uri}/inbox"))),
            followers: Set(json!([])),
            following: Set(json!([])),
            followers_count: Set(0),
            following_count: Set(0),
            public_key_pem: Set(Some(keypair.public_key_pem)),
            private_key_pem: Set(Some(keypair.private_key_pem)),
            ..Default::default()
        };

        let actor = match self.actor_repo.create(model).await {
            Ok(actor) => actor,
            Err(e) => {
                // Lost a race against a registration of the same username
                if self.username_taken(&input.username).await? {
                    return Err(username_conflict(&input.username));
                }
                return Err(e);
            }
        };
        tracing::info!(actor_id = %actor.id, username = %actor.username, "Registered local actor");
        Ok(actor)
    }

    async fn username_taken(&self, username: &str) -> AppResult<bool> {
        Ok(self
            .actor_repo
            .find_by_username_and_host(username, None)
            .await?
            .is_some())
    }

    /// Update display name, summary and avatar.
    pub async fn update_profile(
        &self,
        actor_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<actor::Model> {
        input.validate()?;

        let actor = self.actor_repo.get_by_id(actor_id).await?;
        let mut active: actor::ActiveModel = actor.into();

        if let Some(name) = input.name {
            active.name = Set(Some(name));
        }
        if let Some(summary) = input.summary {
            active.summary = Set(Some(summary));
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.actor_repo.update(active).await
    }

    /// Get an actor by ID.
    pub async fn get(&self, actor_id: &str) -> AppResult<actor::Model> {
        self.actor_repo.get_by_id(actor_id).await
    }

    /// Follow `target_id`. A `follow` notification is queued when the edge is new.
    pub async fn follow(&self, follower_id: &str, target_id: &str) -> AppResult<FollowOutcome> {
        if follower_id == target_id {
            return Err(AppError::SelfReference("Cannot follow yourself".to_string()));
        }

        let follower = self.actor_repo.get_by_id(follower_id).await?;
        let target = self.actor_repo.get_by_id(target_id).await?;

        let added = self.actor_repo.add_following(&follower.id, &target.uri).await?;
        // Applied even when `added` is false so a half-written edge heals
        self.actor_repo.add_follower(&target.id, &follower.uri).await?;

        if added {
            tracing::debug!(follower_id = %follower.id, target_id = %target.id, "Follow edge created");
            self.fanout.notify(CreateNotificationInput {
                notification_type: NotificationType::Follow,
                notifiee_id: target.id,
                notifier_id: follower.id,
                post_id: None,
                comment_id: None,
            });
        }

        Ok(FollowOutcome { changed: added })
    }

    /// Remove the follow edge from `follower_id` to `target_id`, if any.
    pub async fn unfollow(&self, follower_id: &str, target_id: &str) -> AppResult<FollowOutcome> {
        if follower_id == target_id {
            return Err(AppError::SelfReference(
                "Cannot unfollow yourself".to_string(),
            ));
        }

        let follower = self.actor_repo.get_by_id(follower_id).await?;
        let target = self.actor_repo.get_by_id(target_id).await?;

        let removed = self
            .actor_repo
            .remove_following(&follower.id, &target.uri)
            .await?;
        self.actor_repo
            .remove_follower(&target.id, &follower.uri)
            .await?;

        Ok(FollowOutcome { changed: removed })
    }

    /// Resolve a local id, a handle (`alice`, `@alice`, `alice@domain`) or a
    /// federation URI to an actor.
    pub async fn resolve_actor(&self, identifier: &str) -> AppResult<actor::Model> {
        let identifier = identifier.trim();
        let not_found = || AppError::UserNotFound(identifier.to_string());

        if identifier.starts_with("https://") || identifier.starts_with("http://") {
            return self
                .actor_repo
                .find_by_uri(identifier)
                .await?
                .ok_or_else(not_found);
        }

        let handle = identifier.strip_prefix('@').unwrap_or(identifier);
        if handle.is_empty() {
            return Err(not_found());
        }

        if let Some((username, host)) = handle.split_once('@') {
            return self
                .find_by_handle(username, Some(host))
                .await?
                .ok_or_else(not_found);
        }

        if let Some(actor) = self.actor_repo.find_by_id(handle).await? {
            return Ok(actor);
        }

        self.find_by_handle(handle, None).await?.ok_or_else(not_found)
    }

    /// Find an actor by handle. A host equal to the local domain means local.
    pub async fn find_by_handle(
        &self,
        username: &str,
        host: Option<&str>,
    ) -> AppResult<Option<actor::Model>> {
        let host = host.filter(|h| !h.eq_ignore_ascii_case(&self.local_domain));
        self.actor_repo
            .find_by_username_and_host(username, host)
            .await
    }

    /// Actors following `actor_id`.
    pub async fn get_followers(&self, actor_id: &str) -> AppResult<Vec<actor::Model>> {
        let actor = self.actor_repo.get_by_id(actor_id).await?;
        self.actor_repo.find_by_uris(&actor.follower_uris()).await
    }

    /// Actors `actor_id` follows.
    pub async fn get_following(&self, actor_id: &str) -> AppResult<Vec<actor::Model>> {
        let actor = self.actor_repo.get_by_id(actor_id).await?;
        self.actor_repo.find_by_uris(&actor.following_uris()).await
    }

    /// Summary of an actor by id, or a placeholder if it cannot be loaded.
    pub async fn summary(&self, actor_id: &str) -> ActorSummary {
        match self.actor_repo.find_by_id(actor_id).await {
            Ok(Some(actor)) => ActorSummary::from(&actor),
            Ok(None) => ActorSummary::placeholder(actor_id),
            Err(e) => {
                tracing::warn!(actor_id = %actor_id, error = %e, "Failed to load actor summary");
                ActorSummary::placeholder(actor_id)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::fanout::Job;
    use crate::services::test_support::{create_test_actor, exec};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn service(db: MockDatabase) -> (ActorService, UnboundedReceiver<Job>) {
        let (fanout, rx) = NotificationFanout::channel();
        let service = ActorService::new(
            ActorRepository::new(Arc::new(db.into_connection())),
            fanout,
            "https://local.test/".to_string(),
            "Local.Test".to_string(),
        );
        (service, rx)
    }

    #[tokio::test]
    async fn test_follow_self_is_rejected() {
        let (service, _rx) = service(MockDatabase::new(DatabaseBackend::Postgres));

        match service.follow("a1", "a1").await {
            Err(AppError::SelfReference(_)) => {}
            other => panic!("Expected SelfReference, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_follow_missing_target() {
        let (service, _rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_actor("a1", "alice")]])
                .append_query_results([Vec::<actor::Model>::new()]),
        );

        match service.follow("a1", "ghost").await {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "ghost"),
            other => panic!("Expected UserNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_follow_new_edge_queues_notification() {
        let (service, mut rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_actor("a1", "alice")]])
                .append_query_results([[create_test_actor("a2", "bob")]])
                .append_exec_results([exec(1), exec(1)]),
        );

        let outcome = service.follow("a1", "a2").await.unwrap();

        assert!(outcome.changed);
        match rx.try_recv().unwrap() {
            Job::Notify(input) => {
                assert_eq!(input.notification_type, NotificationType::Follow);
                assert_eq!(input.notifiee_id, "a2");
                assert_eq!(input.notifier_id, "a1");
            }
            other => panic!("Expected Notify job, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_follow_existing_edge_is_noop() {
        let (service, mut rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_actor("a1", "alice")]])
                .append_query_results([[create_test_actor("a2", "bob")]])
                .append_exec_results([exec(0), exec(0)]),
        );

        let outcome = service.follow("a1", "a2").await.unwrap();

        assert!(!outcome.changed);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unfollow_not_following() {
        let (service, _rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_actor("a1", "alice")]])
                .append_query_results([[create_test_actor("a2", "bob")]])
                .append_exec_results([exec(0), exec(0)]),
        );

        assert!(!service.unfollow("a1", "a2").await.unwrap().changed);
    }

    #[tokio::test]
    async fn test_resolve_actor_by_uri() {
        let (service, _rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_actor("a1", "alice")]]),
        );

        let actor = service
            .resolve_actor("https://local.test/users/a1")
            .await
            .unwrap();

        assert_eq!(actor.id, "a1");
    }

    #[tokio::test]
    async fn test_resolve_actor_local_domain_handle() {
        let (service, _rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_actor("a1", "alice")]]),
        );

        let actor = service.resolve_actor("@alice@local.test").await.unwrap();

        assert_eq!(actor.username, "alice");
    }

    #[tokio::test]
    async fn test_resolve_actor_unknown() {
        let (service, _rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<actor::Model>::new()])
                .append_query_results([Vec::<actor::Model>::new()]),
        );

        match service.resolve_actor("nobody").await {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "nobody"),
            other => panic!("Expected UserNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username() {
        let (service, _rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_actor("a1", "alice")]]),
        );

        let result = service
            .register(RegisterActorInput {
                username: "Alice".to_string(),
                name: None,
                summary: None,
                avatar_url: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_race_reports_conflict() {
        let (service, _rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<actor::Model>::new()])
                .append_query_errors([DbErr::Custom(
                    "duplicate key value violates unique constraint".to_string(),
                )])
                .append_query_results([[create_test_actor("a1", "alice")]]),
        );

        let result = service
            .register(RegisterActorInput {
                username: "alice".to_string(),
                name: None,
                summary: None,
                avatar_url: None,
            })
            .await;

        match result {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("alice")),
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_insert_failure_stays_database_error() {
        let (service, _rx) = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<actor::Model>::new()])
                .append_query_errors([DbErr::Custom("connection reset".to_string())])
                .append_query_results([Vec::<actor::Model>::new()]),
        );

        let result = service
            .register(RegisterActorInput {
                username: "alice".to_string(),
                name: None,
                summary: None,
                avatar_url: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_username() {
        let (service, _rx) = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service
            .register(RegisterActorInput {
                username: "not valid!".to_string(),
                name: None,
                summary: None,
                avatar_url: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_is_own_url() {
        let (service, _rx) = service(MockDatabase::new(DatabaseBackend::Postgres));
        let alice = create_test_actor("a1", "alice");

        assert!(service.is_own_url(&alice, "https://local.test/users/a1"));
        assert!(service.is_own_url(&alice, "https://local.test/@Alice/"));
        assert!(!service.is_own_url(&alice, "https://local.test/@bob"));
        assert!(!service.is_own_url(&alice, "https://third.test/users/carol"));
    }

    #[test]
    fn test_placeholder_summary() {
        let summary = ActorSummary::placeholder("a9");
        assert_eq!(summary.id, "a9");
        assert_eq!(summary.name.as_deref(), Some(PLACEHOLDER_NAME));
    }
}
