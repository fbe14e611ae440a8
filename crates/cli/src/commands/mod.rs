//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod passport;

use device_warranty_server::config::{ConfigError, ServerConfig, StorageBackend};
use device_warranty_server::db;
use device_warranty_server::services::ServiceError;
use device_warranty_server::state::AppState;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("could not read password: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("commands need a database; unset DW_STORAGE=memory")]
    MemoryStorage,
}

/// Load configuration and connect to `PostgreSQL`.
async fn connect() -> Result<(ServerConfig, PgPool), CliError> {
    let config = ServerConfig::from_env()?;
    let url = match (config.storage, &config.database_url) {
        (StorageBackend::Postgres, Some(url)) => url.clone(),
        _ => return Err(CliError::MemoryStorage),
    };

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&url).await?;
    Ok((config, pool))
}

/// Application state over a live database, as the server would build it.
async fn state() -> Result<AppState, CliError> {
    let (config, pool) = connect().await?;
    Ok(AppState::with_pool(config, pool))
}
