//! Postgres storage for Pagu.
//!
//! This crate provides:
//! - `SeaORM` entities for units, summaries, history and cycle settings
//! - The schema migration, including one proposal table per stage
//! - [`PgProposalStore`], the production [`pagu_core::store::ProposalStore`]

pub mod entities;
pub mod migration;
pub mod store;

pub use store::PgProposalStore;

use pagu_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Opens a connection pool sized by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    info!(
        max_connections = config.max_connections,
        "database pool ready"
    );
    Ok(db)
}
