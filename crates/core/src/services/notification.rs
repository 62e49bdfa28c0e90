//! Notification service.

use chrono::{DateTime, FixedOffset};
use murmur_common::{AppResult, IdGenerator};
use murmur_db::{
    entities::notification::{self, NotificationType},
    repositories::{ActorRepository, NotificationRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::actor::ActorSummary;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    actor_repo: ActorRepository,
    id_gen: IdGenerator,
}

/// Input for creating a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNotificationInput {
    pub notification_type: NotificationType,
    /// Recipient.
    pub notifiee_id: String,
    /// Triggering actor.
    pub notifier_id: String,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
}

/// Notification enriched with the notifier's current profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub notifier: ActorSummary,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository, actor_repo: ActorRepository) -> Self {
        Self {
            notification_repo,
            actor_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Persist a notification.
    ///
    /// Returns `Ok(None)` without writing when the recipient is also the
    /// triggering actor.
    pub async fn create_notification(
        &self,
        input: CreateNotificationInput,
    ) -> AppResult<Option<notification::Model>> {
        // Don't notify yourself
        if input.notifiee_id == input.notifier_id {
            return Ok(None);
        }

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            notifiee_id: Set(input.notifiee_id),
            notifier_id: Set(input.notifier_id),
            notification_type: Set(input.notification_type),
            post_id: Set(input.post_id),
            comment_id: Set(input.comment_id),
            is_read: Set(false),
            ..Default::default()
        };

        self.notification_repo.create(model).await.map(Some)
    }

    /// Attach a live summary of the notifier.
    ///
    /// Falls back to a placeholder when the notifier can no longer be loaded.
    pub async fn format_notification_response(
        &self,
        notification: notification::Model,
    ) -> NotificationResponse {
        let notifier = match self.actor_repo.find_by_id(&notification.notifier_id).await {
            Ok(Some(actor)) => ActorSummary::from(&actor),
            Ok(None) => ActorSummary::placeholder(&notification.notifier_id),
            Err(e) => {
                tracing::warn!(
                    notifier_id = %notification.notifier_id,
                    error = %e,
                    "Failed to load notifier"
                );
                ActorSummary::placeholder(&notification.notifier_id)
            }
        };

        NotificationResponse {
            id: notification.id,
            notification_type: notification.notification_type,
            notifier,
            post_id: notification.post_id,
            comment_id: notification.comment_id,
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }

    /// Get notifications for an actor, newest first.
    pub async fn get_notifications(
        &self,
        recipient_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<NotificationResponse>> {
        let notifications = self
            .notification_repo
            .find_by_notifiee(recipient_id, limit, until_id, unread_only)
            .await?;

        let mut responses = Vec::with_capacity(notifications.len());
        for n in notifications {
            responses.push(self.format_notification_response(n).await);
        }
        Ok(responses)
    }

    /// Mark notifications as read. Ids belonging to other actors are ignored.
    pub async fn mark_read(&self, ids: &[String], recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_as_read(ids, recipient_id).await
    }

    /// Mark all of an actor's notifications as read.
    pub async fn mark_all_read(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(recipient_id).await
    }

    /// Count unread notifications.
    pub async fn count_unread(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(recipient_id).await
    }
}
