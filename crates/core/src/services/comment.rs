//! Comment service.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use murmur_common::{AppError, AppResult, IdGenerator};
use murmur_db::{
    entities::{actor, comment, notification::NotificationType, post},
    repositories::{ActorRepository, CommentRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::actor::ActorSummary;
use crate::services::fanout::NotificationFanout;
use crate::services::notification::CreateNotificationInput;
use crate::services::post::PostService;

/// Maximum comment length in characters.
pub const MAX_COMMENT_LENGTH: usize = 3000;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    actor_repo: ActorRepository,
    post_service: PostService,
    fanout: NotificationFanout,
    id_gen: IdGenerator,
}

/// Comment with its author's summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub content: String,
    pub author: ActorSummary,
    pub uri: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl CommentResponse {
    fn new(comment: comment::Model, author: ActorSummary) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            content: comment.content,
            author,
            uri: comment.uri,
            created_at: comment.created_at,
        }
    }
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        actor_repo: ActorRepository,
        post_service: PostService,
        fanout: NotificationFanout,
    ) -> Self {
        Self {
            comment_repo,
            actor_repo,
            post_service,
            fanout,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on a post.
    ///
    /// The post author is notified (unless commenting on their own post) and
    /// mentions in `content` are scanned; both happen on the fan-out queue.
    pub async fn create_comment(
        &self,
        post_id: &str,
        author_id: &str,
        content: &str,
    ) -> AppResult<CommentResponse> {
        validate_content(content)?;

        let post = self.post_service.get_post(post_id).await?;
        let author = self.actor_repo.get_by_id(author_id).await?;

        self.insert(&post, &author, content, None).await
    }

    /// Store a reply received through federation.
    ///
    /// Returns `None` if a comment with the same URI is already stored.
    pub async fn create_remote_comment(
        &self,
        post: &post::Model,
        author: &actor::Model,
        content: &str,
        uri: &str,
    ) -> AppResult<Option<CommentResponse>> {
        if self.comment_repo.find_by_uri(uri).await?.is_some() {
            return Ok(None);
        }

        self.insert(post, author, content, Some(uri.to_string()))
            .await
            .map(Some)
    }

    /// Store the comment, bump the post's reply count and queue side effects.
    ///
    /// Once the row is written the call succeeds. A reply count that fails to
    /// update is logged and left one short.
    async fn insert(
        &self,
        post: &post::Model,
        author: &actor::Model,
        content: &str,
        uri: Option<String>,
    ) -> AppResult<CommentResponse> {
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            author_id: Set(author.id.clone()),
            content: Set(content.to_string()),
            uri: Set(uri),
            ..Default::default()
        };

        let comment = self.comment_repo.create(model).await?;

        // The comment is stored; a failed counter update must not report otherwise
        if let Err(e) = self.post_service.increment_reply_count(&post.id).await {
            tracing::error!(
                post_id = %post.id,
                comment_id = %comment.id,
                error = %e,
                "Failed to increment reply count"
            );
        }

        if post.author_id != author.id {
            self.fanout.notify(CreateNotificationInput {
                notification_type: NotificationType::Comment,
                notifiee_id: post.author_id.clone(),
                notifier_id: author.id.clone(),
                post_id: Some(post.id.clone()),
                comment_id: Some(comment.id.clone()),
            });
        }

        self.fanout
            .scan_mentions(&author.id, &post.id, Some(&comment.id), &comment.content);

        Ok(CommentResponse::new(comment, ActorSummary::from(author)))
    }

    /// Delete a comment.
    ///
    /// Returns `false` if the comment does not exist or was removed by a
    /// concurrent call. Only the author may delete a comment.
    pub async fn delete_comment(&self, comment_id: &str, requester_id: &str) -> AppResult<bool> {
        let Some(comment) = self.comment_repo.find_by_id(comment_id).await? else {
            return Ok(false);
        };

        if comment.author_id != requester_id {
            return Err(AppError::Forbidden(
                "Only the author can delete this comment".to_string(),
            ));
        }

        if !self.comment_repo.delete(&comment.id).await? {
            return Ok(false);
        }

        self.post_service
            .decrement_reply_count(&comment.post_id)
            .await?;

        Ok(true)
    }

    /// Get comments on a post, oldest first.
    pub async fn get_comments(
        &self,
        post_id: &str,
        limit: u64,
        since_id: Option<&str>,
    ) -> AppResult<Vec<CommentResponse>> {
        let comments = self
            .comment_repo
            .find_by_post(post_id, limit, since_id)
            .await?;

        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<String, ActorSummary> = self
            .actor_repo
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|a| (a.id.clone(), ActorSummary::from(a)))
            .collect();

        Ok(comments
            .into_iter()
            .map(|c| {
                let author = authors
                    .get(&c.author_id)
                    .cloned()
                    .unwrap_or_else(|| ActorSummary::placeholder(&c.author_id));
                CommentResponse::new(c, author)
            })
            .collect())
    }
}

fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Comment content is required".to_string()));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::Validation(format!(
            "Comment exceeds {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}
