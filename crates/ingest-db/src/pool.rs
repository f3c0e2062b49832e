//! The shared SQLite pool behind the event store.
//!
//! Batch items are stored from several blocking workers at once, each holding
//! its own pooled connection. Every connection runs in WAL mode so lookups
//! never wait on a writer, and carries a busy timeout so writers queue on the
//! database lock instead of failing with `SQLITE_BUSY`.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Path that selects a private in-memory database.
const IN_MEMORY: &str = ":memory:";

/// Sizing and lock-wait settings for [`create_pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// How long a writer waits for the database lock, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Upper bound on connections, and so on concurrently running store calls.
    pub pool_max_size: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),

    /// Each `:memory:` connection is a separate database, so a larger pool
    /// would scatter events across invisible copies.
    #[error("in-memory database requires pool_max_size = 1, got {0}")]
    InMemoryPoolSize(u32),
}

/// Applies the per-connection pragmas the event store relies on.
///
/// File databases must end up in WAL mode; in-memory ones report `memory`.
fn configure_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    if !matches!(journal_mode.as_str(), "wal" | "memory") {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode is {journal_mode}, expected wal")),
        ));
    }

    // Readings reference their event; synchronous=NORMAL is durable under WAL.
    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
}

/// Opens the event database at `db_path`, creating the file if needed.
///
/// # Errors
///
/// - `PoolError::InMemoryPoolSize` if `db_path` is `:memory:` and the pool
///   would hold more than one connection.
/// - `PoolError::PoolInit` if a connection cannot be opened or configured.
pub fn create_pool(db_path: &str, settings: PoolSettings) -> Result<DbPool, PoolError> {
    let manager = if db_path == IN_MEMORY {
        if settings.pool_max_size != 1 {
            return Err(PoolError::InMemoryPoolSize(settings.pool_max_size));
        }
        SqliteConnectionManager::memory()
    } else {
        SqliteConnectionManager::file(db_path)
    };

    let busy_timeout_ms = settings.busy_timeout_ms;
    let manager = manager
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_init(move |conn| configure_connection(conn, busy_timeout_ms));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        pool_max_size = settings.pool_max_size,
        busy_timeout_ms,
        "event database pool ready"
    );

    Ok(pool)
}
