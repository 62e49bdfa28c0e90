//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::json_string_set;

/// Post visibility tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    /// Visible everywhere and federated.
    #[sea_orm(string_value = "public")]
    Public,
    /// Visible on this instance only, never federated.
    #[sea_orm(string_value = "local")]
    Local,
    /// Visible to followers of the author.
    #[sea_orm(string_value = "followers")]
    Followers,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Federation URI
    #[sea_orm(unique)]
    pub uri: String,

    #[sea_orm(indexed)]
    pub author_id: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub visibility: Visibility,

    #[sea_orm(default_value = false)]
    pub sensitive: bool,

    #[sea_orm(nullable)]
    pub content_warning: Option<String>,

    /// Attachment references
    #[sea_orm(column_type = "JsonBinary")]
    pub attachments: Json,

    /// Actor IDs that liked this post
    #[sea_orm(column_type = "JsonBinary")]
    pub liked_by: Json,

    /// Actor IDs that shared this post
    #[sea_orm(column_type = "JsonBinary")]
    pub shared_by: Json,

    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    #[sea_orm(default_value = 0)]
    pub share_count: i32,

    /// Number of live comments
    #[sea_orm(default_value = 0)]
    pub replies_count: i32,

    #[sea_orm(default_value = true)]
    pub is_local: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Actor IDs in the liker set.
    #[must_use]
    pub fn liker_ids(&self) -> Vec<String> {
        json_string_set(&self.liked_by)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::actor::Entity",
        from = "Column::AuthorId",
        to = "super::actor::Column::Id"
    )]
    Author,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::actor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
