//! Throwaway `PostgreSQL` databases for integration tests.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use tracing::info;

/// Connection settings, read from `TEST_DB_*` variables.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Role allowed to create databases.
    pub username: String,
    /// Password for `username`.
    pub password: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        let var =
            |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self {
            host: var("TEST_DB_HOST", "localhost"),
            port: var("TEST_DB_PORT", "5433").parse().unwrap_or(5433),
            username: var("TEST_DB_USER", "murmur_test"),
            password: var("TEST_DB_PASSWORD", "murmur_test"),
        }
    }
}

impl TestDbConfig {
    /// URL of `database` on the configured server.
    #[must_use]
    pub fn url(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A freshly created and migrated database, dropped by [`TestDatabase::drop_database`].
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    config: TestDbConfig,
    name: String,
}

impl TestDatabase {
    /// Create a uniquely named database and run all migrations on it.
    pub async fn create_unique() -> Result<Self, DbErr> {
        let config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("murmur_test_{}", &suffix[..12]);

        let admin = Database::connect(config.url("postgres")).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{name}\""),
            ))
            .await?;
        admin.close().await?;

        let conn = Database::connect(config.url(&name)).await?;
        crate::migrate(&conn)
            .await
            .map_err(|e| DbErr::Migration(e.to_string()))?;

        info!(database = %name, "Created test database");
        Ok(Self {
            conn: Arc::new(conn),
            config,
            name,
        })
    }

    /// Shared connection, ready to hand to repositories.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Drop the database. Open connections are terminated first.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        drop(self.conn);

        let admin = Database::connect(self.config.url("postgres")).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!(
                    "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
                    self.name
                ),
            ))
            .await
            .ok();
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP DATABASE IF EXISTS \"{}\"", self.name),
            ))
            .await?;
        admin.close().await?;

        info!(database = %self.name, "Dropped test database");
        Ok(())
    }
}
