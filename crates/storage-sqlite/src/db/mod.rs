//! Connection pool, migrations and the single-writer actor.

mod write_actor;

pub use write_actor::{spawn_writer, WriteHandle};

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::StorageError;
use folioledger_core::errors::{DatabaseError, Error, Result};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Pool settings, read by the binary and handed down.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: String,
    pub max_connections: u32,
    pub min_idle: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: "./db/folioledger.db".to_string(),
            max_connections: 25,
            min_idle: 5,
        }
    }
}

/// Per-connection pragmas. Foreign keys must be enabled on every connection
/// for the portfolio cascades to fire.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; \
             PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        ))
        .map_err(r2d2::Error::QueryError)
    }
}

/// Creates the database directory if needed and returns the database path.
pub fn init(db_path: &str) -> Result<String> {
    let path = Path::new(db_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "cannot create database directory {}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }
    }
    Ok(db_path.to_string())
}

pub fn create_pool(config: &DbConfig) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(&config.path);
    let pool = Pool::builder()
        .max_size(config.max_connections.max(1))
        .min_idle(Some(config.min_idle.min(config.max_connections)))
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout: Duration::from_secs(5),
        }))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::PoolCreationFailed(e.to_string())))?;
    info!(
        "Database pool ready at {} (max {}, idle {})",
        config.path, config.max_connections, config.min_idle
    );
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    pool.get().map_err(|e| StorageError::from(e).into())
}

pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = get_connection(pool)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::from(StorageError::MigrationFailed(e.to_string())))?;
    if !applied.is_empty() {
        info!("Applied {} database migrations", applied.len());
    }
    Ok(())
}

/// Opens the pool, applies migrations and starts the writer actor.
///
/// Must be called from within a Tokio runtime.
pub fn open(config: &DbConfig) -> Result<(Arc<DbPool>, WriteHandle)> {
    init(&config.path)?;
    let pool = create_pool(config)?;
    run_migrations(&pool)?;
    let writer = spawn_writer(pool.as_ref().clone());
    Ok((pool, writer))
}
