//! Comment repository.

use std::sync::Arc;

use crate::entities::{Comment, comment};
use murmur_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a comment by the URI of the federated note it came from.
    pub async fn find_by_uri(&self, uri: &str) -> AppResult<Option<comment::Model>> {
        Comment::find()
            .filter(comment::Column::Uri.eq(uri))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment by ID. Returns whether this call removed it.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Comment::delete_many()
            .filter(comment::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Get comments on a post (paginated, oldest first).
    pub async fn find_by_post(
        &self,
        post_id: &str,
        limit: u64,
        since_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::Id);

        if let Some(id) = since_id {
            query = query.filter(comment::Column::Id.gt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_comment(id: &str, post_id: &str, author_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            content: "nice post".to_string(),
            uri: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_post() {
        let c1 = create_test_comment("c1", "p1", "a1");
        let c2 = create_test_comment("c2", "p1", "a2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c1, c2]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_by_post("p1", 10, None).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "c1");
    }

    #[tokio::test]
    async fn test_find_by_uri_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo
            .find_by_uri("https://remote.test/notes/1")
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_whether_removed() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);

        assert!(repo.delete("c1").await.unwrap());
        assert!(!repo.delete("c1").await.unwrap());
    }
}
