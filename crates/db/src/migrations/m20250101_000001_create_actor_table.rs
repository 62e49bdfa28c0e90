//! Create actor table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Actor::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Actor::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Actor::Uri).string_len(512).not_null())
                    .col(ColumnDef::new(Actor::Username).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Actor::UsernameLower)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Actor::Host).string_len(256))
                    .col(ColumnDef::new(Actor::Name).string_len(256))
                    .col(ColumnDef::new(Actor::Summary).text())
                    .col(ColumnDef::new(Actor::AvatarUrl).string_len(512))
                    .col(ColumnDef::new(Actor::Inbox).string_len(512))
                    .col(
                        ColumnDef::new(Actor::Followers)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Actor::Following)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Actor::FollowersCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Actor::FollowingCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Actor::PublicKeyPem).text())
                    .col(ColumnDef::new(Actor::PrivateKeyPem).text())
                    .col(
                        ColumnDef::new(Actor::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Actor::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_actor_uri")
                    .table(Actor::Table)
                    .col(Actor::Uri)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: (username_lower, host) for remote actors
        manager
            .create_index(
                Index::create()
                    .name("idx_actor_username_lower_host")
                    .table(Actor::Table)
                    .col(Actor::UsernameLower)
                    .col(Actor::Host)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // NULL hosts never collide in the index above
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_actor_local_username \
                 ON actor (username_lower) WHERE host IS NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Actor::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Actor {
    Table,
    Id,
    Uri,
    Username,
    UsernameLower,
    Host,
    Name,
    Summary,
    AvatarUrl,
    Inbox,
    Followers,
    Following,
    FollowersCount,
    FollowingCount,
    PublicKeyPem,
    PrivateKeyPem,
    CreatedAt,
    UpdatedAt,
}
