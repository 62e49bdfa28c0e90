//! Actor entity (local and remote identities).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::json_string_set;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actor")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Federation URI (unique across local and remote actors)
    #[sea_orm(unique)]
    pub uri: String,

    /// `preferredUsername`
    pub username: String,

    pub username_lower: String,

    /// NULL = local actor, Some(host) = remote actor
    #[sea_orm(nullable)]
    pub host: Option<String>,

    /// Display name
    #[sea_orm(nullable)]
    pub name: Option<String>,

    /// Bio
    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// `ActivityPub` inbox URL (remote actors)
    #[sea_orm(nullable)]
    pub inbox: Option<String>,

    /// URIs of actors following this actor
    #[sea_orm(column_type = "JsonBinary")]
    pub followers: Json,

    /// URIs of actors this actor follows
    #[sea_orm(column_type = "JsonBinary")]
    pub following: Json,

    /// Size of `followers` (updated in the same statement as the set)
    #[sea_orm(default_value = 0)]
    pub followers_count: i32,

    /// Size of `following` (updated in the same statement as the set)
    #[sea_orm(default_value = 0)]
    pub following_count: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub public_key_pem: Option<String>,

    /// Local actors only
    #[sea_orm(column_type = "Text", nullable)]
    pub private_key_pem: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether this actor lives on this instance.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.host.is_none()
    }

    /// Follower URIs.
    #[must_use]
    pub fn follower_uris(&self) -> Vec<String> {
        json_string_set(&self.followers)
    }

    /// Followee URIs.
    #[must_use]
    pub fn following_uris(&self) -> Vec<String> {
        json_string_set(&self.following)
    }

    /// `user` for local actors, `user@host` for remote ones.
    #[must_use]
    pub fn acct(&self) -> String {
        match self.host {
            Some(ref host) => format!("{}@{host}", self.username),
            None => self.username.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
