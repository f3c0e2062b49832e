//! Error types for event store construction.

/// Errors that can occur while opening an event store.
///
/// Failures of individual store operations are reported as
/// [`ingest_types::ServiceError`] so they can be rendered per item.
#[derive(Debug, thiserror::Error)]
pub enum StoreInitError {
    /// No connection could be checked out of the pool.
    #[error("event store connection error: {0}")]
    Connection(#[from] r2d2::Error),

    /// Schema migrations failed.
    #[error("event store migration error: {0}")]
    Migration(#[from] ingest_db::MigrationError),
}
