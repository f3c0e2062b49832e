//! Event persistence for the ingestion service.
//!
//! The HTTP layer only ever talks to the [`EventStore`] trait, so handlers can
//! be exercised against substituted fakes. [`SqliteEventStore`] is the
//! production implementation on top of the `ingest-db` pool.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ingest_store::{EventStore, SqliteEventStore};
//!
//! let store = SqliteEventStore::open(pool)?;
//! let id = store.add_event(event, &ctx)?;
//! let stored = store.event_by_id(&id, &ctx)?;
//! ```

mod error;
mod sqlite;
mod store;

pub use error::StoreInitError;
pub use sqlite::SqliteEventStore;
pub use store::EventStore;
