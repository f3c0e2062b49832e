//! Request-scoped context.

/// Values that live for exactly one inbound request.
///
/// Created by the correlation middleware and passed explicitly to every
/// component (decoder, processor, store) so log lines and store calls can be
/// tied back to the originating HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Correlation identifier echoed in the `X-Correlation-ID` header.
    pub correlation_id: String,
}

impl RequestContext {
    /// Builds a context with the given correlation identifier.
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
        }
    }

    /// Builds a context with a freshly generated UUID v4 correlation identifier.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}
