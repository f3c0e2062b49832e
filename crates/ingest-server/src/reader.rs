//! Batch decoder for `POST /api/v2/event`.
//!
//! Turns the raw request body into an ordered list of [`ItemRequest`]s, or
//! rejects the whole body with a single [`ServiceError`]. Nothing is stored
//! unless every item decodes and validates.

use axum::body::Body;
use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use http_body_util::LengthLimitError;
use ingest_types::{ErrorKind, Event, Reading, RequestContext, ServiceError, ValueType};

use crate::batch::ItemRequest;
use crate::dto::{AddEventRequest, EventDto, ReadingDto};

/// Reads, parses, validates and maps a batch body.
///
/// `body` is consumed and dropped before this returns, on every path.
///
/// # Errors
///
/// - `UnsupportedMediaType` if a non-JSON `Content-Type` is declared.
/// - `PayloadTooLarge` if the body exceeds `max_body_bytes`.
/// - `ContractInvalid` for unreadable bodies, malformed JSON, or any item
///   that fails validation.
pub async fn read_add_event_requests(
    headers: &HeaderMap,
    body: Body,
    max_body_bytes: usize,
    ctx: &RequestContext,
) -> Result<Vec<ItemRequest>, ServiceError> {
    check_content_type(headers)?;

    let bytes = axum::body::to_bytes(body, max_body_bytes)
        .await
        .map_err(|e| {
            let inner = e.into_inner();
            if inner.is::<LengthLimitError>() {
                ServiceError::new(
                    ErrorKind::PayloadTooLarge,
                    format!("request body exceeds {max_body_bytes} bytes"),
                )
            } else {
                ServiceError::new(ErrorKind::ContractInvalid, "failed to read request body")
                    .with_detail(inner)
            }
        })?;

    let requests: Vec<AddEventRequest> = serde_json::from_slice(&bytes).map_err(|e| {
        ServiceError::new(ErrorKind::ContractInvalid, "failed to decode JSON").with_detail(e)
    })?;

    tracing::trace!(
        correlation_id = %ctx.correlation_id,
        items = requests.len(),
        "decoded batch body"
    );

    requests
        .into_iter()
        .enumerate()
        .map(|(index, request)| to_item_request(index, request))
        .collect()
}

fn check_content_type(headers: &HeaderMap) -> Result<(), ServiceError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };
    let essence = value
        .to_str()
        .ok()
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some("application/json") => Ok(()),
        _ => Err(ServiceError::new(
            ErrorKind::UnsupportedMediaType,
            "request body must be application/json",
        )
        .with_detail(format!("content-type: {value:?}"))),
    }
}

fn invalid(index: usize, message: impl std::fmt::Display) -> ServiceError {
    ServiceError::new(
        ErrorKind::ContractInvalid,
        format!("request {index}: {message}"),
    )
}

fn require(index: usize, field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(invalid(index, format_args!("{field} is required")));
    }
    Ok(())
}

fn to_item_request(index: usize, request: AddEventRequest) -> Result<ItemRequest, ServiceError> {
    require(index, "apiVersion", &request.api_version)?;
    let payload = to_event(index, request.event)?;
    Ok(ItemRequest {
        correlation_token: request.request_id,
        payload,
    })
}

fn to_event(index: usize, dto: EventDto) -> Result<Event, ServiceError> {
    if !dto.id.is_empty() && uuid::Uuid::parse_str(&dto.id).is_err() {
        return Err(invalid(index, format_args!("event.id {:?} is not a UUID", dto.id)));
    }
    require(index, "event.deviceName", &dto.device_name)?;
    require(index, "event.profileName", &dto.profile_name)?;
    require(index, "event.sourceName", &dto.source_name)?;
    if dto.origin == 0 {
        return Err(invalid(index, "event.origin is required"));
    }
    if dto.readings.is_empty() {
        return Err(invalid(index, "event.readings must contain at least one reading"));
    }

    let origin = dto.origin;
    let readings = dto
        .readings
        .into_iter()
        .enumerate()
        .map(|(position, reading)| to_reading(index, position, origin, reading))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Event {
        id: dto.id,
        device_name: dto.device_name,
        profile_name: dto.profile_name,
        source_name: dto.source_name,
        origin,
        readings,
        tags: dto.tags,
    })
}

fn to_reading(
    index: usize,
    position: usize,
    event_origin: i64,
    dto: ReadingDto,
) -> Result<Reading, ServiceError> {
    let field = |name: &str| format!("event.readings[{position}].{name}");

    require(index, &field("deviceName"), &dto.device_name)?;
    require(index, &field("resourceName"), &dto.resource_name)?;
    require(index, &field("profileName"), &dto.profile_name)?;
    let value_type: ValueType = dto
        .value_type
        .parse()
        .map_err(|e| invalid(index, format_args!("{}: {e}", field("valueType"))))?;

    let binary_value = if value_type == ValueType::Binary {
        let encoded = dto
            .binary_value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| invalid(index, format_args!("{} is required", field("binaryValue"))))?;
        let decoded = BASE64.decode(encoded).map_err(|e| {
            invalid(index, format_args!("{} is not valid base64", field("binaryValue")))
                .with_detail(e)
        })?;
        require(index, &field("mediaType"), &dto.media_type)?;
        Some(decoded)
    } else {
        if dto.value.is_empty() {
            return Err(invalid(index, format_args!("{} is required", field("value"))));
        }
        None
    };

    Ok(Reading {
        id: dto.id,
        origin: if dto.origin == 0 { event_origin } else { dto.origin },
        device_name: dto.device_name,
        resource_name: dto.resource_name,
        profile_name: dto.profile_name,
        value_type,
        value: dto.value,
        binary_value,
        media_type: dto.media_type,
        units: dto.units,
    })
}
