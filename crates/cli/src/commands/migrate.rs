//! Database migration command.
//!
//! ```bash
//! dw-cli migrate
//! ```
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! server library at compile time.

use device_warranty_server::db;

use super::{CliError, connect};

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let (_, pool) = connect().await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
