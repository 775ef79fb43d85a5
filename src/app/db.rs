use anyhow::{Context, Result};
use diesel::{Connection, PgConnection};
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{AsyncDieselConnectionManager, bb8::Pool},
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};

use crate::app::config::DatabaseConfig;

pub type DbPool = Pool<AsyncPgConnection>;

/// Builds the pool and opens its first connection, failing fast on a bad URL.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
    Pool::builder()
        .max_size(config.max_connections)
        .build(manager)
        .await
        .context("Failed to build DB connection pool")
}

/// Builds the pool without connecting. Connections are opened on first checkout.
pub fn create_lazy_pool(config: &DatabaseConfig) -> DbPool {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
    Pool::builder()
        .max_size(config.max_connections)
        .build_unchecked(manager)
}

/// Runs pending migrations on a dedicated blocking connection and returns how many were applied.
pub async fn run_migrations_blocking(migrations: EmbeddedMigrations, url: &str) -> Result<usize> {
    let url = url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn =
            PgConnection::establish(&url).context("Failed to connect to the database for migrations")?;
        let applied = conn
            .run_pending_migrations(migrations)
            .map_err(|err| anyhow::anyhow!(err))
            .context("Failed to run migrations")?;
        Ok::<usize, anyhow::Error>(applied.len())
    })
    .await
    .context("Migration task panicked")?
}
