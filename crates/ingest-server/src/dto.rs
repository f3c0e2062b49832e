//! JSON request and response bodies.
//!
//! Field names are camelCase on the wire. Optional response fields are
//! omitted when empty, so a successful creation record carries no `message`
//! and a lookup failure carries no `requestId`.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ingest_types::{Event, Reading, API_VERSION};
use serde::{Deserialize, Deserializer, Serialize};

/// Reads an optional JSON string, treating `null` like an absent field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One element of the `POST /api/v2/event` request array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEventRequest {
    /// Must be non-empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub api_version: String,
    /// Client correlation token, echoed back in the matching result record.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub request_id: String,
    /// The event to store.
    pub event: EventDto,
}

/// Wire form of an [`Event`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub profile_name: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub origin: i64,
    #[serde(default)]
    pub readings: Vec<ReadingDto>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Wire form of a [`Reading`]. `binaryValue` is base64.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub origin: i64,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub resource_name: String,
    #[serde(default)]
    pub profile_name: String,
    #[serde(default)]
    pub value_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_value: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub units: String,
}

impl From<&Reading> for ReadingDto {
    fn from(reading: &Reading) -> Self {
        Self {
            id: reading.id.clone(),
            origin: reading.origin,
            device_name: reading.device_name.clone(),
            resource_name: reading.resource_name.clone(),
            profile_name: reading.profile_name.clone(),
            value_type: reading.value_type.as_str().to_string(),
            value: reading.value.clone(),
            binary_value: reading.binary_value.as_ref().map(|b| BASE64.encode(b)),
            media_type: reading.media_type.clone(),
            units: reading.units.clone(),
        }
    }
}

impl From<&Event> for EventDto {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            device_name: event.device_name.clone(),
            profile_name: event.profile_name.clone(),
            source_name: event.source_name.clone(),
            origin: event.origin,
            readings: event.readings.iter().map(ReadingDto::from).collect(),
            tags: event.tags.clone(),
        }
    }
}

/// Result record shared by batch items and error responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResponse {
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub status_code: u16,
    /// Present only on successful creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl BaseResponse {
    pub fn new(request_id: impl Into<String>, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            request_id: request_id.into(),
            message: message.into(),
            status_code,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Renders a single error record. Codes outside the HTTP range become 500
/// in both the status line and the body.
pub fn error_response(message: impl Into<String>, status_code: u16) -> Response {
    let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(BaseResponse::new("", message, status.as_u16())),
    )
        .into_response()
}

/// Body of a successful `GET /api/v2/event/id/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub status_code: u16,
    pub event: EventDto,
}

impl EventResponse {
    pub fn new(event: EventDto) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            request_id: String::new(),
            message: String::new(),
            status_code: 200,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_record_omits_empty_message() {
        let record = BaseResponse::new("a", "", 201).with_id("E1");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "apiVersion": "v2", "requestId": "a", "statusCode": 201, "id": "E1" })
        );
    }

    #[test]
    fn failure_record_without_request_id_omits_it() {
        let record = BaseResponse::new("", "event with id x does not exist", 404);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "apiVersion": "v2",
                "message": "event with id x does not exist",
                "statusCode": 404
            })
        );
    }

    #[test]
    fn add_event_request_tolerates_missing_optional_fields() {
        let parsed: AddEventRequest = serde_json::from_value(json!({
            "apiVersion": "v2",
            "event": {
                "deviceName": "d",
                "readings": [{ "resourceName": "r", "valueType": "Int8", "value": "1" }]
            }
        }))
        .unwrap();

        assert!(parsed.request_id.is_empty());
        assert!(parsed.event.id.is_empty());
        assert_eq!(parsed.event.origin, 0);
        assert_eq!(parsed.event.readings[0].value_type, "Int8");
        assert!(parsed.event.readings[0].binary_value.is_none());
    }

    #[test]
    fn null_request_id_reads_as_empty() {
        let parsed: AddEventRequest = serde_json::from_value(json!({
            "apiVersion": "v2",
            "requestId": null,
            "event": { "deviceName": "d" }
        }))
        .unwrap();

        assert_eq!(parsed.request_id, "");
        assert_eq!(parsed.api_version, "v2");
    }

    #[tokio::test]
    async fn error_response_uses_one_status_for_line_and_body() {
        let response = error_response("event with id x does not exist", 404);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = error_response("odd store code", 42);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let record: BaseResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(record, BaseResponse::new("", "odd store code", 500));
    }
}
