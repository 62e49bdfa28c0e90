//! Database migrations.

#![allow(missing_docs)]

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_actor_table;
mod m20250101_000002_create_post_table;
mod m20250101_000003_create_comment_table;
mod m20250101_000004_create_notification_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_actor_table::Migration),
            Box::new(m20250101_000002_create_post_table::Migration),
            Box::new(m20250101_000003_create_comment_table::Migration),
            Box::new(m20250101_000004_create_notification_table::Migration),
        ]
    }
}
