use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    config::DatabaseConfig,
    error::{AppError, Result},
};

/// Opens the pool and brings the schema up to date before any request is served.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await?;

    run_migrations(&pool).await?;

    tracing::info!(
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Database pool ready"
    );

    Ok(pool)
}

async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrator = sqlx::migrate!();

    migrator
        .run(pool)
        .await
        .map_err(|e| AppError::ConfigError(format!("Failed to run migrations: {}", e)))?;

    tracing::info!(migrations = migrator.iter().count(), "Schema up to date");
    Ok(())
}

pub async fn check_health(pool: &PgPool) -> Result<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
