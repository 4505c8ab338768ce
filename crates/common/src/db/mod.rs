//! Database layer for DeepScout
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management
//! - Schema bootstrap for fresh databases

pub mod models;
mod repository;

pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
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

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Create the schema if it does not exist yet
    ///
    /// Both binaries call this at startup so either one can come up first
    /// against an empty database.
    pub async fn bootstrap(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(models::ResearchRequestEntity);
        table.if_not_exists();
        self.conn.execute(backend.build(&table)).await?;

        let indexes = [
            Index::create()
                .name("idx_research_requests_status")
                .table(models::ResearchRequestEntity)
                .col(models::ResearchRequestColumn::Status)
                .to_owned(),
            Index::create()
                .name("idx_research_requests_requested_by")
                .table(models::ResearchRequestEntity)
                .col(models::ResearchRequestColumn::RequestedBy)
                .to_owned(),
            Index::create()
                .name("idx_research_requests_area_of_interest")
                .table(models::ResearchRequestEntity)
                .col(models::ResearchRequestColumn::AreaOfInterest)
                .to_owned(),
        ];

        for mut index in indexes {
            index.if_not_exists();
            self.conn.execute(backend.build(&index)).await?;
        }

        info!("Database schema ready");

        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Database ping failed: {}", e),
            })?;

        Ok(())
    }
}
