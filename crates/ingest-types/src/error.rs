//! Service-wide error type with status-code classification.

/// Classification of a [`ServiceError`].
///
/// Each kind maps to exactly one HTTP status code. Callers branch on the kind
/// (never on the message) when an outcome needs special treatment, e.g.
/// lookups treat [`ErrorKind::EntityDoesNotExist`] as a routine result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request body or one of its items violates the request contract.
    ContractInvalid,
    /// The requested entity is not in the store.
    EntityDoesNotExist,
    /// An entity with the same identifier already exists.
    DuplicateId,
    /// The request body exceeds the configured size limit.
    PayloadTooLarge,
    /// The request body is not in a supported media type.
    UnsupportedMediaType,
    /// The item is well-formed but its content cannot be stored.
    UnprocessableEntity,
    /// The backing database failed.
    DatabaseError,
    /// Any other internal failure.
    ServerError,
}

impl ErrorKind {
    /// Returns the HTTP status code associated with this kind.
    pub fn status_code(self) -> u16 {
        match self {
            Self::ContractInvalid => 400,
            Self::EntityDoesNotExist => 404,
            Self::DuplicateId => 409,
            Self::PayloadTooLarge => 413,
            Self::UnsupportedMediaType => 415,
            Self::UnprocessableEntity => 422,
            Self::DatabaseError | Self::ServerError => 500,
        }
    }

    /// Returns a stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContractInvalid => "ContractInvalid",
            Self::EntityDoesNotExist => "EntityDoesNotExist",
            Self::DuplicateId => "DuplicateId",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::UnsupportedMediaType => "UnsupportedMediaType",
            Self::UnprocessableEntity => "UnprocessableEntity",
            Self::DatabaseError => "DatabaseError",
            Self::ServerError => "ServerError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error surfaced to clients as a message plus status code.
///
/// `message` is user-facing. `detail` carries diagnostic context (the
/// underlying cause) that is logged at debug level and never sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    detail: Option<String>,
}

impl ServiceError {
    /// Creates an error without diagnostic detail.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches diagnostic detail, typically the `Display` of a lower-level error.
    pub fn with_detail(mut self, detail: impl std::fmt::Display) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    /// Returns the error's classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Returns the diagnostic detail, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Renders the multi-line diagnostic explanation used for debug logs.
    pub fn debug_messages(&self) -> String {
        let mut out = format!(
            "kind={} status={} message={}",
            self.kind,
            self.status_code(),
            self.message
        );
        if let Some(detail) = &self.detail {
            out.push_str("\n  caused by: ");
            out.push_str(detail);
        }
        out
    }
}
