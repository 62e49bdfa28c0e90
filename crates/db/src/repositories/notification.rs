//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use murmur_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new notification.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get notifications for an actor (paginated, newest first).
    pub async fn find_by_notifiee(
        &self,
        notifiee_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        let mut query = Notification::find()
            .filter(notification::Column::NotifieeId.eq(notifiee_id))
            .order_by_desc(notification::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(notification::Column::Id.lt(id));
        }

        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark the given notifications as read. Ids owned by other actors are skipped.
    pub async fn mark_as_read(&self, ids: &[String], notifiee_id: &str) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Notification::update_many()
            .filter(notification::Column::Id.is_in(ids.to_vec()))
            .filter(notification::Column::NotifieeId.eq(notifiee_id))
            .filter(notification::Column::IsRead.eq(false))
            .col_expr(notification::Column::IsRead, true.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Mark all notifications as read for an actor.
    pub async fn mark_all_as_read(&self, notifiee_id: &str) -> AppResult<u64> {
        let result = Notification::update_many()
            .filter(notification::Column::NotifieeId.eq(notifiee_id))
            .filter(notification::Column::IsRead.eq(false))
            .col_expr(notification::Column::IsRead, true.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Count unread notifications for an actor.
    pub async fn count_unread(&self, notifiee_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::NotifieeId.eq(notifiee_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::notification::NotificationType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_notification(id: &str, notifiee_id: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            notifiee_id: notifiee_id.to_string(),
            notifier_id: "a2".to_string(),
            notification_type: NotificationType::Like,
            post_id: Some("p1".to_string()),
            comment_id: None,
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_notifiee() {
        let n1 = create_test_notification("n2", "a1");
        let n2 = create_test_notification("n1", "a1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n1, n2]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo.find_by_notifiee("a1", 20, None, true).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].notification_type, NotificationType::Like);
    }

    #[tokio::test]
    async fn test_mark_as_read_scoped_to_notifiee() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let db = Arc::new(db);

        let repo = NotificationRepository::new(Arc::clone(&db));
        let updated = repo
            .mark_as_read(&["n1".to_string(), "foreign".to_string()], "a1")
            .await
            .unwrap();

        assert_eq!(updated, 1);
        drop(repo);

        let Ok(conn) = Arc::try_unwrap(db) else {
            panic!("repository still holds the connection");
        };
        let log = conn.into_transaction_log();
        assert_eq!(log.len(), 1);
        assert!(format!("{:?}", log[0]).contains("notifiee_id"));
    }

    #[tokio::test]
    async fn test_mark_as_read_empty_ids_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = NotificationRepository::new(db);

        assert_eq!(repo.mark_as_read(&[], "a1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_as_read() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);

        assert_eq!(repo.mark_all_as_read("a1").await.unwrap(), 3);
    }
}
