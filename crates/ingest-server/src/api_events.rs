//! Event API handlers.
//!
//! Provides:
//! - `POST /api/v2/event`: batch creation, answered with `207 Multi-Status`
//! - `GET /api/v2/event/id/{id}`: single-event lookup

use crate::batch::{aggregate, process_batch};
use crate::dto::error_response;
use crate::lookup::{lookup_event, LookupOutcome};
use crate::reader::read_add_event_requests;
use crate::AppState;
use axum::{
    body::Body,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use ingest_types::{RequestContext, ServiceError};
use std::sync::Arc;

/// Logs a rejected batch body: the error itself, then its detail at debug.
pub(crate) fn log_decode_error(err: &ServiceError, ctx: &RequestContext) {
    tracing::error!(
        correlation_id = %ctx.correlation_id,
        kind = %err.kind(),
        status = err.status_code(),
        "{}",
        err
    );
    tracing::debug!(
        correlation_id = %ctx.correlation_id,
        "{}",
        err.debug_messages()
    );
}

/// Handler for `POST /api/v2/event`.
///
/// A body that fails to decode is rejected as a whole and nothing is stored.
/// Otherwise every item is stored independently and the response is `207`
/// with one record per item, in request order.
pub async fn add_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let items = match read_add_event_requests(&headers, body, state.max_body_bytes, &ctx).await {
        Ok(items) => items,
        Err(err) => {
            log_decode_error(&err, &ctx);
            return error_response(err.message(), err.status_code());
        }
    };

    let outcomes = process_batch(state.store.clone(), items, &ctx, state.max_concurrency).await;
    aggregate(outcomes).into_response()
}

/// Handler for `GET /api/v2/event/id/{id}`.
pub async fn event_by_id_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let store = state.store.clone();
    let worker_ctx = ctx.clone();
    let span = tracing::Span::current();

    let outcome = tokio::task::spawn_blocking(move || {
        span.in_scope(|| lookup_event(store.as_ref(), &id, &worker_ctx))
    })
    .await
    .unwrap_or_else(|e| {
        tracing::error!(
            correlation_id = %ctx.correlation_id,
            "event lookup task failed: {}",
            e
        );
        LookupOutcome::Error {
            message: "failed to query event".to_string(),
            status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    });

    outcome.into_response()
}

#[cfg(test)]
mod tests {
    use super::log_decode_error;
    use crate::reader::read_add_event_requests;
    use crate::test_support::{capture_logs, FakeStore};
    use crate::{app, AppState};
    use axum::body::Body;
    use axum::http::{HeaderMap, Request, StatusCode};
    use ingest_types::RequestContext;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn malformed_body_never_reaches_the_store() {
        let store = Arc::new(FakeStore::new());
        let application = app(AppState::new(store.clone(), 4, 1024 * 1024));

        let response = application
            .oneshot(
                Request::builder()
                    .uri("/api/v2/event")
                    .method("POST")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"[{"apiVersion": "v2", "event": {"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            json!({ "apiVersion": "v2", "message": "failed to decode JSON", "statusCode": 400 })
        );
        assert_eq!(store.add_calls(), 0);
    }

    #[tokio::test]
    async fn every_item_reaches_the_store_once() {
        let store = Arc::new(FakeStore::new());
        let application = app(AppState::new(store.clone(), 2, 1024 * 1024));

        let item = |token: &str, device: &str| {
            json!({
                "apiVersion": "v2",
                "requestId": token,
                "event": {
                    "deviceName": device,
                    "profileName": "p",
                    "sourceName": "s",
                    "origin": 1,
                    "readings": [{
                        "deviceName": device,
                        "resourceName": "r",
                        "profileName": "p",
                        "valueType": "Int32",
                        "value": "7"
                    }]
                }
            })
        };
        let body = json!([item("a", "d1"), item("b", "d2"), item("c", "d3")]);

        let response = application
            .oneshot(
                Request::builder()
                    .uri("/api/v2/event")
                    .method("POST")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        assert_eq!(store.add_calls(), 3);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json[1], json!({ "apiVersion": "v2", "requestId": "b", "statusCode": 201, "id": "id-d2" }));
    }

    #[tokio::test]
    async fn rejected_body_is_logged_at_error_with_serde_detail_at_debug() {
        let ctx = RequestContext::new("decode-log-test");
        let err = read_add_event_requests(
            &HeaderMap::new(),
            Body::from(r#"[{"apiVersion": "v2", "event": {"#),
            1024,
            &ctx,
        )
        .await
        .expect_err("truncated body should be rejected");

        let ((), logs) = capture_logs(|| log_decode_error(&err, &ctx));

        assert_eq!(logs.count("ERROR"), 1);
        assert_eq!(logs.messages("ERROR")[0], "ContractInvalid: failed to decode JSON");
        assert_eq!(logs.count("DEBUG"), 1);
        let detail = &logs.messages("DEBUG")[0];
        assert!(detail.contains("caused by:"), "missing detail: {detail}");
        assert!(detail.contains("EOF while parsing"), "missing serde error: {detail}");
    }
}
