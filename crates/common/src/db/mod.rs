//! Persistence layer for reports
//!
//! Provides:
//! - SeaORM entity model for the `reports` table
//! - `ReportStore`, the storage seam the report service is written against
//! - A Postgres-backed repository and an in-memory store
//! - Connection pool management and migrations

mod memory;
pub mod models;
mod repository;

pub use memory::MemoryStore;
pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use crate::reports::{Report, ReportKey, ReportMetadata, ReportType};
use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Edit applied to a stored report while its document is locked
///
/// Returning an error aborts the write and leaves the stored report as it was.
pub type ReportMutation = Box<dyn FnOnce(&mut Report) -> Result<()> + Send>;

/// Report storage
///
/// Writes to one report are serialized: `update` reads, mutates and writes
/// back the document without another writer interleaving.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn get(&self, key: &ReportKey) -> Result<Option<Report>>;

    /// Reports of a type for one state, oldest first
    async fn list_by_state(&self, report_type: ReportType, state: &str)
        -> Result<Vec<ReportMetadata>>;

    async fn insert(&self, report: &Report) -> Result<()>;

    /// Apply `mutate` to the stored report; `None` when no record exists
    async fn update(&self, key: &ReportKey, mutate: ReportMutation) -> Result<Option<Report>>;

    /// Backend reachability, for readiness checks
    async fn ping(&self) -> Result<()>;
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pub primary: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let primary = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");
        Ok(Self { primary })
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }

    /// Apply pending SQL migrations from `dir`
    pub async fn run_migrations(&self, dir: &str) -> Result<()> {
        let migrator = sqlx::migrate::Migrator::new(Path::new(dir))
            .await
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to load migrations from {}: {}", dir, e),
            })?;

        migrator
            .run(self.primary.get_postgres_connection_pool())
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Migration failed: {}", e),
            })?;

        info!(dir = %dir, "Migrations applied");
        Ok(())
    }
}
