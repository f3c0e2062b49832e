//! Single-event lookup for `GET /api/v2/event/id/{id}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ingest_store::EventStore;
use ingest_types::{ErrorKind, Event, RequestContext};

use crate::dto::{error_response, EventDto, EventResponse};

/// Outcome of one lookup. Built per request and discarded after rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// The event exists.
    Found(Event),
    /// The store has no event with the requested id.
    NotFound { message: String, status_code: u16 },
    /// Any other store failure.
    Error { message: String, status_code: u16 },
}

/// Queries the store for `id`.
///
/// A missing event is a routine outcome and is logged at debug level only.
/// Every other failure is logged at error level plus a debug-level detail.
pub fn lookup_event(store: &dyn EventStore, id: &str, ctx: &RequestContext) -> LookupOutcome {
    match store.event_by_id(id, ctx) {
        Ok(event) => LookupOutcome::Found(event),
        Err(err) => {
            let missing = err.kind() == ErrorKind::EntityDoesNotExist;
            if !missing {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    event_id = %id,
                    kind = %err.kind(),
                    status = err.status_code(),
                    "{}",
                    err
                );
            }
            tracing::debug!(
                correlation_id = %ctx.correlation_id,
                event_id = %id,
                "{}",
                err.debug_messages()
            );

            let message = err.message().to_string();
            let status_code = err.status_code();
            if missing {
                LookupOutcome::NotFound {
                    message,
                    status_code,
                }
            } else {
                LookupOutcome::Error {
                    message,
                    status_code,
                }
            }
        }
    }
}

impl IntoResponse for LookupOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::Found(event) => (
                StatusCode::OK,
                Json(EventResponse::new(EventDto::from(&event))),
            )
                .into_response(),
            Self::NotFound {
                message,
                status_code,
            }
            | Self::Error {
                message,
                status_code,
            } => error_response(message, status_code),
        }
    }
}
