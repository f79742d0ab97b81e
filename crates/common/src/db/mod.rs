//! Database layer for ContactDesk
//!
//! Provides:
//! - SeaORM entity models
//! - The `Store` trait with SeaORM and in-memory implementations
//! - Connection pool management with startup retry
//! - Schema migrations

mod memory;
pub mod models;
mod repository;
mod store;

pub use memory::MemoryStore;
pub use repository::Repository;
pub use store::{ContactPatch, NewContact, PlanSeed, Store, TenantSeed, UserSeed};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use backoff::ExponentialBackoff;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");
        let primary = connect(&config.url, config).await.map_err(|e| {
            AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e),
            }
        })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");
            let replica_conn = connect(read_url, config).await.map_err(|e| {
                AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e),
                }
            })?;
            Some(replica_conn)
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

/// Connect with exponential backoff bounded by `connect_retry_secs`
async fn connect(
    url: &str,
    config: &DatabaseConfig,
) -> std::result::Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opts = ConnectOptions::new(url.to_owned());
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);

    let policy = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(config.connect_retry_secs)),
        ..ExponentialBackoff::default()
    };

    backoff::future::retry(policy, || {
        let opts = opts.clone();
        async move {
            Database::connect(opts).await.map_err(|e| {
                warn!(error = %e, "Database connection attempt failed, retrying");
                backoff::Error::transient(e)
            })
        }
    })
    .await
}

/// Apply pending migrations from `migrations/` to the primary
pub async fn migrate(pool: &DbPool) -> Result<()> {
    info!("Applying database migrations...");

    sqlx::migrate!("../../migrations")
        .run(pool.write().get_postgres_connection_pool())
        .await
        .map_err(|e| AppError::Migration {
            message: e.to_string(),
        })?;

    info!("Database migrations applied");
    Ok(())
}

/// Build the store selected by configuration
pub async fn connect_store(config: &DatabaseConfig) -> Result<Arc<dyn Store>> {
    if config.is_in_memory() {
        info!("Using in-memory store; data will not persist");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = DbPool::new(config).await?;

    if config.run_migrations {
        migrate(&pool).await?;
    }

    Ok(Arc::new(Repository::new(pool)))
}
