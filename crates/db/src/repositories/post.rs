//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, post};
use murmur_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IdenStatic, QueryFilter,
};

use super::json_set;

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Find a post by federation URI.
    pub async fn find_by_uri(&self, uri: &str) -> AppResult<Option<post::Model>> {
        Post::find()
            .filter(post::Column::Uri.eq(uri))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post. Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Add an actor to the liker set. Returns whether it was added.
    pub async fn add_liker(&self, post_id: &str, actor_id: &str) -> AppResult<bool> {
        self.add_to_set(
            post_id,
            post::Column::LikedBy,
            post::Column::LikeCount,
            actor_id,
        )
        .await
    }

    /// Remove an actor from the liker set. Returns whether it was present.
    pub async fn remove_liker(&self, post_id: &str, actor_id: &str) -> AppResult<bool> {
        self.remove_from_set(
            post_id,
            post::Column::LikedBy,
            post::Column::LikeCount,
            actor_id,
        )
        .await
    }

    /// Add an actor to the sharer set. Returns whether it was added.
    pub async fn add_sharer(&self, post_id: &str, actor_id: &str) -> AppResult<bool> {
        self.add_to_set(
            post_id,
            post::Column::SharedBy,
            post::Column::ShareCount,
            actor_id,
        )
        .await
    }

    /// Remove an actor from the sharer set. Returns whether it was present.
    pub async fn remove_sharer(&self, post_id: &str, actor_id: &str) -> AppResult<bool> {
        self.remove_from_set(
            post_id,
            post::Column::SharedBy,
            post::Column::ShareCount,
            actor_id,
        )
        .await
    }

    /// Increment replies count atomically (single UPDATE query, no fetch).
    pub async fn increment_replies_count(&self, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::RepliesCount,
                json_set::increment(post::Column::RepliesCount.as_str()),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement replies count atomically, never below zero.
    pub async fn decrement_replies_count(&self, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::RepliesCount,
                json_set::decrement(post::Column::RepliesCount.as_str()),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn add_to_set(
        &self,
        post_id: &str,
        set: post::Column,
        counter: post::Column,
        value: &str,
    ) -> AppResult<bool> {
        let result = Post::update_many()
            .col_expr(set, json_set::append(set.as_str(), value))
            .col_expr(counter, json_set::increment(counter.as_str()))
            .filter(post::Column::Id.eq(post_id))
            .filter(json_set::not_contains(set.as_str(), value))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    async fn remove_from_set(
        &self,
        post_id: &str,
        set: post::Column,
        counter: post::Column,
        value: &str,
    ) -> AppResult<bool> {
        let result = Post::update_many()
            .col_expr(set, json_set::remove(set.as_str(), value))
            .col_expr(counter, json_set::decrement(counter.as_str()))
            .filter(post::Column::Id.eq(post_id))
            .filter(json_set::contains(set.as_str(), value))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}
