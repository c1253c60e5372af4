//! Helpers for running repositories against a real `PostgreSQL`.
//!
//! Connection settings come from `TEST_DB_*` environment variables.

use std::sync::Arc;

use sea_orm::{Database, DatabaseConnection, DbErr, EntityTrait};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{audit, audit_category, question, response, survey, survey_category};
use crate::migrations::Migrator;
use crate::repositories::{AuditRepository, SurveyRepository};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Where the test database lives.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login role.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: env_or("TEST_DB_HOST", "localhost"),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: env_or("TEST_DB_USER", "audit_test"),
            password: env_or("TEST_DB_PASSWORD", "audit_test"),
            database: env_or("TEST_DB_NAME", "audit_test"),
        }
    }
}

impl TestDbConfig {
    /// Connection URL of the test database.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// Connection URL of the server's `postgres` maintenance database.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/postgres",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A migrated test database.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    /// Settings used to connect.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect with the default configuration and run pending migrations.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with `config` and run pending migrations.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Connected to test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
        })
    }

    /// Raw connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Survey repository sharing this connection.
    #[must_use]
    pub fn survey_repository(&self) -> SurveyRepository {
        SurveyRepository::new(Arc::clone(&self.conn))
    }

    /// Audit repository sharing this connection.
    #[must_use]
    pub fn audit_repository(&self) -> AuditRepository {
        AuditRepository::new(Arc::clone(&self.conn))
    }

    /// Remove every row, children before parents.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        let conn = self.conn.as_ref();
        response::Entity::delete_many().exec(conn).await?;
        audit_category::Entity::delete_many().exec(conn).await?;
        audit::Entity::delete_many().exec(conn).await?;
        question::Entity::delete_many().exec(conn).await?;
        survey_category::Entity::delete_many().exec(conn).await?;
        survey::Entity::delete_many().exec(conn).await?;

        info!(database = %self.config.database, "Cleaned up test database");
        Ok(())
    }
}
