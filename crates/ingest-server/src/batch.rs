//! Per-item processing and response aggregation for batch ingestion.
//!
//! Every decoded item is stored independently: a store error becomes a
//! [`ItemOutcome::Failure`] for that item only and never aborts its siblings.
//! Items may complete in any order, but outcomes are written into a slot
//! indexed by input position, so the response always lines up with the
//! request array.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ingest_store::EventStore;
use ingest_types::{ErrorKind, Event, RequestContext, ServiceError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::dto::BaseResponse;

/// One decoded, validated batch element.
#[derive(Debug, Clone)]
pub struct ItemRequest {
    /// Client-supplied `requestId`; opaque and possibly empty.
    pub correlation_token: String,
    /// The event to create.
    pub payload: Event,
}

/// Result of processing one [`ItemRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The store accepted the event.
    Success {
        correlation_token: String,
        assigned_id: String,
    },
    /// The store rejected the event.
    Failure {
        correlation_token: String,
        message: String,
        status_code: u16,
    },
}

impl ItemOutcome {
    /// Returns the correlation token echoed back to the client.
    pub fn correlation_token(&self) -> &str {
        match self {
            Self::Success {
                correlation_token, ..
            }
            | Self::Failure {
                correlation_token, ..
            } => correlation_token,
        }
    }

    fn failed(correlation_token: String, err: &ServiceError) -> Self {
        Self::Failure {
            correlation_token,
            message: err.message().to_string(),
            status_code: err.status_code(),
        }
    }
}

/// Stores a single item.
///
/// On failure, logs the error at error level and its diagnostic detail at
/// debug level. Nothing is logged on success.
pub fn process_item(store: &dyn EventStore, item: ItemRequest, ctx: &RequestContext) -> ItemOutcome {
    let ItemRequest {
        correlation_token,
        payload,
    } = item;

    match store.add_event(payload, ctx) {
        Ok(assigned_id) => ItemOutcome::Success {
            correlation_token,
            assigned_id,
        },
        Err(err) => {
            tracing::error!(
                correlation_id = %ctx.correlation_id,
                request_id = %correlation_token,
                kind = %err.kind(),
                status = err.status_code(),
                "{}",
                err
            );
            tracing::debug!(
                correlation_id = %ctx.correlation_id,
                request_id = %correlation_token,
                "{}",
                err.debug_messages()
            );
            ItemOutcome::failed(correlation_token, &err)
        }
    }
}

/// Stores every item of a batch, at most `max_concurrency` at a time.
///
/// The returned vector has exactly one outcome per input item, in input
/// order. An item whose worker never reports back (e.g. the store panicked)
/// is reported as a `ServerError` failure.
pub async fn process_batch(
    store: Arc<dyn EventStore>,
    items: Vec<ItemRequest>,
    ctx: &RequestContext,
    max_concurrency: usize,
) -> Vec<ItemOutcome> {
    let tokens: Vec<String> = items
        .iter()
        .map(|item| item.correlation_token.clone())
        .collect();
    let mut slots: Vec<Option<ItemOutcome>> = vec![None; items.len()];

    let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let span = tracing::Span::current();
    let mut workers = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let store = store.clone();
        let ctx = ctx.clone();
        let span = span.clone();
        workers.spawn_blocking(move || {
            let _permit = permit;
            let outcome = span.in_scope(|| process_item(store.as_ref(), item, &ctx));
            (index, outcome)
        });
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(e) => {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    "batch item worker failed: {}",
                    e
                );
            }
        }
    }

    slots
        .into_iter()
        .zip(tokens)
        .map(|(slot, token)| {
            slot.unwrap_or_else(|| {
                let err = ServiceError::new(ErrorKind::ServerError, "failed to process event");
                ItemOutcome::failed(token, &err)
            })
        })
        .collect()
}

/// The single response to a decoded batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponseEnvelope {
    /// Transport status; always 207 for a decoded batch.
    pub status: StatusCode,
    /// One record per input item, in input order.
    pub records: Vec<BaseResponse>,
}

/// Folds outcomes into the batch envelope.
pub fn aggregate(outcomes: Vec<ItemOutcome>) -> BatchResponseEnvelope {
    let records = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            ItemOutcome::Success {
                correlation_token,
                assigned_id,
            } => BaseResponse::new(correlation_token, "", StatusCode::CREATED.as_u16())
                .with_id(assigned_id),
            ItemOutcome::Failure {
                correlation_token,
                message,
                status_code,
            } => BaseResponse::new(correlation_token, message, status_code),
        })
        .collect();

    BatchResponseEnvelope {
        status: StatusCode::MULTI_STATUS,
        records,
    }
}

impl IntoResponse for BatchResponseEnvelope {
    fn into_response(self) -> Response {
        (self.status, Json(self.records)).into_response()
    }
}
