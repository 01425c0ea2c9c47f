use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction};
use sea_orm_migration::MigratorTrait;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns `ServiceError::DatabaseError` if the pool cannot be created
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("backoffice_db.max_connections", config.max_connections as f64);

    let pool = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Database connection establishment failed");
        counter!("backoffice_db.connection_failures", 1);
        ServiceError::DatabaseError(e)
    })?;

    info!("Database connection pool established");
    Ok(pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs the embedded migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    match &result {
        Ok(_) => info!(elapsed = ?start.elapsed(), "Database migrations completed"),
        Err(e) => error!(elapsed = ?start.elapsed(), error = %e, "Database migrations failed"),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = Instant::now();
    let result = pool.ping().await.map_err(ServiceError::DatabaseError);

    match &result {
        Ok(_) => {
            gauge!(
                "backoffice_db.connection_latency_ms",
                start.elapsed().as_millis() as f64
            );
        }
        Err(e) => {
            error!(error = %e, "Database connection check failed");
            counter!("backoffice_db.connection_failures", 1);
        }
    }

    result
}

/// Commits on success, rolls back on failure. The original error is kept
/// even if the rollback itself fails.
pub async fn finish_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    match result {
        Ok(value) => {
            txn.commit().await.map_err(|e| {
                error!(error = %e, "Transaction commit failed");
                counter!("backoffice_db.transaction.commit_failures", 1);
                ServiceError::DatabaseError(e)
            })?;
            counter!("backoffice_db.transaction.committed", 1);
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "Transaction rollback failed");
            }
            counter!("backoffice_db.transaction.rolled_back", 1);
            Err(err)
        }
    }
}

/// Bounds a unit of work. On expiry the future is dropped, which releases
/// any stock leases it holds and rolls back its open transaction.
pub async fn with_deadline<T, F>(deadline: Duration, work: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?deadline, "Unit of work timed out");
            counter!("backoffice_db.transaction.timeouts", 1);
            Err(ServiceError::TransactionTimeout(deadline))
        }
    }
}
