//! Database layer for the ingestion service.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. Every table the event store touches is created
//! through versioned migrations managed by this crate.
//!
//! - **SQLite with WAL mode**: concurrent readers with a single writer, which
//!   matches an ingest-heavy, lookup-light workload.
//! - **`r2d2` connection pool**: bounded connection reuse shared by concurrent
//!   batch items.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema ships with the code that depends on it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbConnection, DbPool, PoolError, PoolSettings};
