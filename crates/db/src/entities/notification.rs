//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "camelCase")]
pub enum NotificationType {
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "mention")]
    Mention,
    #[sea_orm(string_value = "follow")]
    Follow,
}

impl NotificationType {
    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Mention => "mention",
            Self::Follow => "follow",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The actor receiving the notification
    pub notifiee_id: String,

    /// The actor who triggered the notification
    pub notifier_id: String,

    pub notification_type: NotificationType,

    /// Related post (like, comment, mention)
    #[sea_orm(nullable)]
    pub post_id: Option<String>,

    /// Related comment (comment, mention)
    #[sea_orm(nullable)]
    pub comment_id: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::actor::Entity",
        from = "Column::NotifieeId",
        to = "super::actor::Column::Id",
        on_delete = "Cascade"
    )]
    Notifiee,

    #[sea_orm(
        belongs_to = "super::actor::Entity",
        from = "Column::NotifierId",
        to = "super::actor::Column::Id",
        on_delete = "Cascade"
    )]
    Notifier,

    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,

    #[sea_orm(
        belongs_to = "super::comment::Entity",
        from = "Column::CommentId",
        to = "super::comment::Column::Id",
        on_delete = "Cascade"
    )]
    Comment,
}

impl ActiveModelBehavior for ActiveModel {}
