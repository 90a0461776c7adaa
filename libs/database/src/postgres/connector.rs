use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use super::PostgresConfig;
use crate::common::{RetryConfig, retry_with_backoff};

/// Open a connection pool.
pub async fn connect(config: PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(config.into_connect_options()).await?;
    info!("Connected to PostgreSQL");
    Ok(db)
}

/// Open a connection pool, retrying with backoff while the server is unreachable.
pub async fn connect_with_retry(
    config: PostgresConfig,
    retry: RetryConfig,
) -> Result<DatabaseConnection, DbErr> {
    retry_with_backoff("postgres", || connect(config.clone()), retry).await
}

/// Apply pending migrations from `M`.
pub async fn run_migrations<M: MigratorTrait>(
    db: &DatabaseConnection,
    app_name: &str,
) -> Result<(), DbErr> {
    info!(app = %app_name, "Running database migrations");
    M::up(db, None).await?;
    info!(app = %app_name, "Migrations complete");
    Ok(())
}
