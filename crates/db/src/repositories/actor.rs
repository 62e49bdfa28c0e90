//! Actor repository.

use std::sync::Arc;

use crate::entities::{Actor, actor};
use murmur_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IdenStatic, QueryFilter,
    TransactionTrait, sea_query::Expr,
};

use super::json_set;

/// Actor repository for database operations.
#[derive(Clone)]
pub struct ActorRepository {
    db: Arc<DatabaseConnection>,
}

impl ActorRepository {
    /// Create a new actor repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an actor by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<actor::Model>> {
        Actor::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an actor by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<actor::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find actors by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<actor::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Actor::find()
            .filter(actor::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an actor by federation URI.
    pub async fn find_by_uri(&self, uri: &str) -> AppResult<Option<actor::Model>> {
        Actor::find()
            .filter(actor::Column::Uri.eq(uri))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find actors by federation URIs.
    pub async fn find_by_uris(&self, uris: &[String]) -> AppResult<Vec<actor::Model>> {
        if uris.is_empty() {
            return Ok(vec![]);
        }

        Actor::find()
            .filter(actor::Column::Uri.is_in(uris.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an actor by username and host (`None` = local).
    pub async fn find_by_username_and_host(
        &self,
        username: &str,
        host: Option<&str>,
    ) -> AppResult<Option<actor::Model>> {
        let mut query =
            Actor::find().filter(actor::Column::UsernameLower.eq(username.to_lowercase()));

        query = match host {
            Some(h) => query.filter(actor::Column::Host.eq(h.to_lowercase())),
            None => query.filter(actor::Column::Host.is_null()),
        };

        query
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new actor.
    pub async fn create(&self, model: actor::ActiveModel) -> AppResult<actor::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an actor.
    pub async fn update(&self, model: actor::ActiveModel) -> AppResult<actor::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Move an actor to `new_uri`, rewriting every follow set that holds its
    /// old URI. Runs in one transaction.
    pub async fn move_uri(&self, actor_id: &str, new_uri: &str) -> AppResult<actor::Model> {
        let db_err = |e: sea_orm::DbErr| AppError::Database(e.to_string());
        let txn = self.db.begin().await.map_err(db_err)?;

        let old_uri = Actor::find_by_id(actor_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::UserNotFound(actor_id.to_string()))?
            .uri;

        Actor::update_many()
            .col_expr(actor::Column::Uri, Expr::value(new_uri))
            .col_expr(actor::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(actor::Column::Id.eq(actor_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        for (set, counter) in [
            (actor::Column::Followers, actor::Column::FollowersCount),
            (actor::Column::Following, actor::Column::FollowingCount),
        ] {
            Actor::update_many()
                .col_expr(set, json_set::replace(set.as_str(), &old_uri, new_uri))
                .col_expr(
                    counter,
                    json_set::shrink_if_contains(counter.as_str(), set.as_str(), new_uri),
                )
                .filter(json_set::contains(set.as_str(), &old_uri))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        let actor = Actor::find_by_id(actor_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::UserNotFound(actor_id.to_string()))?;

        txn.commit().await.map_err(db_err)?;
        Ok(actor)
    }

    /// Add `uri` to the actor's `following` set. Returns whether it was added.
    pub async fn add_following(&self, actor_id: &str, uri: &str) -> AppResult<bool> {
        self.add_to_set(
            actor_id,
            actor::Column::Following,
            actor::Column::FollowingCount,
            uri,
        )
        .await
    }

    /// Remove `uri` from the actor's `following` set. Returns whether it was present.
    pub async fn remove_following(&self, actor_id: &str, uri: &str) -> AppResult<bool> {
        self.remove_from_set(
            actor_id,
            actor::Column::Following,
            actor::Column::FollowingCount,
            uri,
        )
        .await
    }

    /// Add `uri` to the actor's `followers` set. Returns whether it was added.
    pub async fn add_follower(&self, actor_id: &str, uri: &str) -> AppResult<bool> {
        self.add_to_set(
            actor_id,
            actor::Column::Followers,
            actor::Column::FollowersCount,
            uri,
        )
        .await
    }

    /// Remove `uri` from the actor's `followers` set. Returns whether it was present.
    pub async fn remove_follower(&self, actor_id: &str, uri: &str) -> AppResult<bool> {
        self.remove_from_set(
            actor_id,
            actor::Column::Followers,
            actor::Column::FollowersCount,
            uri,
        )
        .await
    }

    async fn add_to_set(
        &self,
        actor_id: &str,
        set: actor::Column,
        counter: actor::Column,
        value: &str,
    ) -> AppResult<bool> {
        let result = Actor::update_many()
            .col_expr(set, json_set::append(set.as_str(), value))
            .col_expr(counter, json_set::increment(counter.as_str()))
            .filter(actor::Column::Id.eq(actor_id))
            .filter(json_set::not_contains(set.as_str(), value))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    async fn remove_from_set(
        &self,
        actor_id: &str,
        set: actor::Column,
        counter: actor::Column,
        value: &str,
    ) -> AppResult<bool> {
        let result = Actor::update_many()
            .col_expr(set, json_set::remove(set.as_str(), value))
            .col_expr(counter, json_set::decrement(counter.as_str()))
            .filter(actor::Column::Id.eq(actor_id))
            .filter(json_set::contains(set.as_str(), value))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}
