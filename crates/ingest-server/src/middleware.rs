//! Request correlation middleware.

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use ingest_types::RequestContext;
use tracing::Instrument;

/// Header carrying the correlation identifier in both directions.
pub const CORRELATION_HEADER: &str = "X-Correlation-ID";

/// Attaches a [`RequestContext`] to every request.
///
/// The inbound `X-Correlation-ID` is reused when present and non-blank;
/// otherwise a UUID v4 is generated. The identifier is recorded on a span
/// wrapping the rest of the request and echoed on the response.
pub async fn correlation_middleware(mut req: Request<Body>, next: Next) -> Response {
    let ctx = req
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(RequestContext::new)
        .unwrap_or_else(RequestContext::generate);

    let span = tracing::info_span!(
        "request",
        correlation_id = %ctx.correlation_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    req.extensions_mut().insert(ctx.clone());

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&ctx.correlation_id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }

    response
}
