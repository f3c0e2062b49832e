//! The event store contract consumed by the HTTP layer.

use ingest_types::{Event, RequestContext, ServiceError};

/// Persistence operations for events.
///
/// Implementations must be safe for concurrent, independent calls: a single
/// batch request may invoke [`EventStore::add_event`] from several worker
/// threads at once.
pub trait EventStore: Send + Sync {
    /// Stores `event` and returns the identifier it was stored under.
    ///
    /// An empty `event.id` asks the store to assign one.
    ///
    /// # Errors
    ///
    /// Returns a `ServiceError` whose kind classifies the failure
    /// (`DuplicateId`, `UnprocessableEntity`, `DatabaseError`, ...).
    fn add_event(&self, event: Event, ctx: &RequestContext) -> Result<String, ServiceError>;

    /// Fetches the event stored under `id`, readings included.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::EntityDoesNotExist` when no such event exists, or
    /// another kind for infrastructure failures.
    fn event_by_id(&self, id: &str, ctx: &RequestContext) -> Result<Event, ServiceError>;
}
