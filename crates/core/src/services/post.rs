//! Post service.

use murmur_common::{AppError, AppResult, IdGenerator};
use murmur_db::{
    entities::{
        actor,
        notification::NotificationType,
        post::{self, Visibility},
    },
    repositories::{ActorRepository, PostRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::services::fanout::NotificationFanout;
use crate::services::notification::CreateNotificationInput;

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    actor_repo: ActorRepository,
    fanout: NotificationFanout,
    server_url: String,
    id_gen: IdGenerator,
}

/// Input for creating a new post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(max = 3000))]
    #[serde(default)]
    pub content: String,

    #[validate(length(max = 100))]
    pub content_warning: Option<String>,

    #[serde(default)]
    pub sensitive: bool,

    #[serde(default = "default_visibility")]
    pub visibility: Visibility,

    #[validate(length(max = 16))]
    #[serde(default)]
    pub attachments: Vec<String>,
}

const fn default_visibility() -> Visibility {
    Visibility::Public
}

/// A post received through federation.
#[derive(Debug, Clone)]
pub struct RemotePostInput {
    pub uri: String,
    pub content: String,
    pub sensitive: bool,
    pub content_warning: Option<String>,
    pub visibility: Visibility,
    pub attachments: Vec<String>,
}

/// Result of a like/share call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleResult {
    /// Whether the set changed.
    pub changed: bool,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        actor_repo: ActorRepository,
        fanout: NotificationFanout,
        server_url: String,
    ) -> Self {
        Self {
            post_repo,
            actor_repo,
            fanout,
            server_url: server_url.trim_end_matches('/').to_string(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a post authored by a local actor.
    pub async fn create_post(
        &self,
        author_id: &str,
        input: CreatePostInput,
    ) -> AppResult<post::Model> {
        input.validate()?;

        if input.content.trim().is_empty() && input.attachments.is_empty() {
            return Err(AppError::Validation(
                "Content or attachments required".to_string(),
            ));
        }

        if input.content_warning.is_some() && !input.sensitive {
            return Err(AppError::Validation(
                "Content warning requires a sensitive post".to_string(),
            ));
        }

        let author = self.actor_repo.get_by_id(author_id).await?;

        let post_id = self.id_gen.generate();
        let model = post::ActiveModel {
            id: Set(post_id.clone()),
            uri: Set(format!("{}/posts/{post_id}", self.server_url)),
            author_id: Set(author.id.clone()),
            content: Set(input.content),
            visibility: Set(input.visibility),
            sensitive: Set(input.sensitive),
            content_warning: Set(input.content_warning),
            attachments: Set(json!(input.attachments)),
            liked_by: Set(json!([])),
            shared_by: Set(json!([])),
            like_count: Set(0),
            share_count: Set(0),
            replies_count: Set(0),
            is_local: Set(author.is_local()),
            ..Default::default()
        };

        let post = self.post_repo.create(model).await?;

        if !post.content.is_empty() {
            self.fanout
                .scan_mentions(&author.id, &post.id, None, &post.content);
        }

        Ok(post)
    }

    /// Store a post received through federation.
    ///
    /// Returns `None` if a post with the same URI is already stored.
    pub async fn create_remote_post(
        &self,
        author: &actor::Model,
        input: RemotePostInput,
    ) -> AppResult<Option<post::Model>> {
        if self.post_repo.find_by_uri(&input.uri).await?.is_some() {
            return Ok(None);
        }

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            uri: Set(input.uri),
            author_id: Set(author.id.clone()),
            content: Set(input.content),
            visibility: Set(input.visibility),
            sensitive: Set(input.sensitive),
            content_warning: Set(input.content_warning),
            attachments: Set(json!(input.attachments)),
            liked_by: Set(json!([])),
            shared_by: Set(json!([])),
            like_count: Set(0),
            share_count: Set(0),
            replies_count: Set(0),
            is_local: Set(false),
            ..Default::default()
        };

        let post = self.post_repo.create(model).await?;

        if !post.content.is_empty() {
            self.fanout
                .scan_mentions(&author.id, &post.id, None, &post.content);
        }

        Ok(Some(post))
    }

    /// Get a post by ID.
    pub async fn get_post(&self, post_id: &str) -> AppResult<post::Model> {
        self.post_repo.get_by_id(post_id).await
    }

    /// Find a post by federation URI.
    pub async fn find_by_uri(&self, uri: &str) -> AppResult<Option<post::Model>> {
        self.post_repo.find_by_uri(uri).await
    }

    /// Delete a post. Only its author may do this.
    pub async fn delete_post(&self, post_id: &str, actor_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.author_id != actor_id {
            return Err(AppError::Forbidden(
                "Only the author can delete this post".to_string(),
            ));
        }

        self.post_repo.delete(post_id).await?;
        Ok(())
    }

    /// Like a post. Notifies the author the first time `actor_id` likes it.
    pub async fn like_post(&self, post_id: &str, actor_id: &str) -> AppResult<ToggleResult> {
        let post = self.post_repo.get_by_id(post_id).await?;

        let changed = self.post_repo.add_liker(&post.id, actor_id).await?;

        if changed && post.author_id != actor_id {
            self.fanout.notify(CreateNotificationInput {
                notification_type: NotificationType::Like,
                notifiee_id: post.author_id,
                notifier_id: actor_id.to_string(),
                post_id: Some(post.id),
                comment_id: None,
            });
        }

        Ok(ToggleResult { changed })
    }

    /// Remove a like. Returns whether the like existed.
    pub async fn unlike_post(&self, post_id: &str, actor_id: &str) -> AppResult<bool> {
        let removed = self.post_repo.remove_liker(post_id, actor_id).await?;
        if !removed {
            // Tell "not liked" apart from "no such post"
            self.post_repo.get_by_id(post_id).await?;
        }
        Ok(removed)
    }

    /// Share a post. Shares do not notify.
    pub async fn share_post(&self, post_id: &str, actor_id: &str) -> AppResult<ToggleResult> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let changed = self.post_repo.add_sharer(&post.id, actor_id).await?;
        Ok(ToggleResult { changed })
    }

    /// Remove a share. Returns whether the share existed.
    pub async fn unshare_post(&self, post_id: &str, actor_id: &str) -> AppResult<bool> {
        let removed = self.post_repo.remove_sharer(post_id, actor_id).await?;
        if !removed {
            self.post_repo.get_by_id(post_id).await?;
        }
        Ok(removed)
    }

    /// Increment the reply counter.
    pub async fn increment_reply_count(&self, post_id: &str) -> AppResult<()> {
        self.post_repo.increment_replies_count(post_id).await
    }

    /// Decrement the reply counter, never below zero.
    pub async fn decrement_reply_count(&self, post_id: &str) -> AppResult<()> {
        self.post_repo.decrement_replies_count(post_id).await
    }
}
