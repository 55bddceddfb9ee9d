//! Turns an untyped bus payload into a typed [`ValidatedEvent`].
//!
//! Validation is permissive: anything that is a JSON object yields a valid
//! event, with missing or blank fields replaced by [`UNKNOWN_FIELD_VALUE`].
//! Only a payload that is not an object is rejected.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::contract::{EventEnvelope, ImagePushEvent, UNKNOWN_FIELD_VALUE};

const DETAIL_FIELD: &str = "detail";
const REPOSITORY_KEYS: [&str; 2] = ["repository", "repository-name"];
const IMAGE_TAG_KEYS: [&str; 2] = ["imageTag", "image-tag"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid image push event: {reason}")]
pub struct InvalidEvent {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedEvent {
    Valid {
        event: ImagePushEvent,
        envelope: EventEnvelope,
    },
    Invalid(InvalidEvent),
}

impl ValidatedEvent {
    pub fn into_result(self) -> Result<(ImagePushEvent, EventEnvelope), InvalidEvent> {
        match self {
            Self::Valid { event, envelope } => Ok((event, envelope)),
            Self::Invalid(invalid) => Err(invalid),
        }
    }
}

pub fn validate_event(payload: &Value, received_at: DateTime<Utc>) -> ValidatedEvent {
    let Some(object) = payload.as_object() else {
        return ValidatedEvent::Invalid(InvalidEvent {
            reason: format!("payload must be a JSON object, got {}", json_type(payload)),
        });
    };

    let detail = normalize_detail(object.get(DETAIL_FIELD));
    let event = ImagePushEvent {
        repository: extract_field(detail.as_ref(), &REPOSITORY_KEYS),
        image_tag: extract_field(detail.as_ref(), &IMAGE_TAG_KEYS),
        received_at,
    };

    ValidatedEvent::Valid {
        event,
        envelope: extract_envelope(object),
    }
}

fn normalize_detail(detail: Option<&Value>) -> Option<Map<String, Value>> {
    match detail? {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

fn extract_field(detail: Option<&Map<String, Value>>, keys: &[&str]) -> String {
    detail
        .and_then(|map| {
            keys.iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .find(|value| !value.trim().is_empty())
        })
        .unwrap_or(UNKNOWN_FIELD_VALUE)
        .to_string()
}

fn extract_envelope(object: &Map<String, Value>) -> EventEnvelope {
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    EventEnvelope {
        event_id: text("id"),
        source: text("source"),
        detail_type: text("detail-type"),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn received_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn valid(payload: Value) -> (ImagePushEvent, EventEnvelope) {
        validate_event(&payload, received_at())
            .into_result()
            .expect("payload should validate")
    }

    #[test]
    fn extracts_repository_and_tag_from_detail() {
        let (event, _) = valid(json!({
            "detail": {"repository": "sample-app-repo", "imageTag": "20250101-1200-abc123"}
        }));

        assert_eq!(event.repository, "sample-app-repo");
        assert_eq!(event.image_tag, "20250101-1200-abc123");
        assert_eq!(event.received_at, received_at());
    }

    #[test]
    fn missing_detail_defaults_both_fields_to_unknown() {
        let (event, _) = valid(json!({"source": "custom.pipeline"}));

        assert_eq!(event.repository, UNKNOWN_FIELD_VALUE);
        assert_eq!(event.image_tag, UNKNOWN_FIELD_VALUE);
    }

    #[test]
    fn blank_and_non_string_fields_default_to_unknown() {
        let (event, _) = valid(json!({"detail": {"repository": "  ", "imageTag": 42}}));

        assert_eq!(event.repository, UNKNOWN_FIELD_VALUE);
        assert_eq!(event.image_tag, UNKNOWN_FIELD_VALUE);
    }

    #[test]
    fn values_are_kept_as_sent() {
        let (event, _) = valid(json!({"detail": {"repository": " repo ", "imageTag": "v1\n"}}));

        assert_eq!(event.repository, " repo ");
        assert_eq!(event.image_tag, "v1\n");
    }

    #[test]
    fn decodes_string_encoded_detail() {
        let (event, _) = valid(json!({
            "detail": "{\"repository\":\"sample-app-repo\",\"imageTag\":\"t-1\"}"
        }));

        assert_eq!(event.repository, "sample-app-repo");
        assert_eq!(event.image_tag, "t-1");
    }

    #[test]
    fn undecodable_detail_string_is_treated_as_missing() {
        let (event, _) = valid(json!({"detail": "not json"}));
        assert_eq!(event.image_tag, UNKNOWN_FIELD_VALUE);
    }

    #[test]
    fn accepts_ecr_push_field_names_as_fallback() {
        let (event, _) = valid(json!({
            "detail": {"repository-name": "ecr-repo", "image-tag": "latest"}
        }));

        assert_eq!(event.repository, "ecr-repo");
        assert_eq!(event.image_tag, "latest");
    }

    #[test]
    fn primary_field_names_win_over_fallback() {
        let (event, _) = valid(json!({
            "detail": {"repository": "primary", "repository-name": "fallback", "imageTag": "t"}
        }));
        assert_eq!(event.repository, "primary");
    }

    #[test]
    fn extracts_envelope_metadata() {
        let (_, envelope) = valid(json!({
            "id": "evt-1",
            "source": "custom.pipeline",
            "detail-type": "ImagePushed",
            "detail": {}
        }));

        assert_eq!(envelope.event_id.as_deref(), Some("evt-1"));
        assert_eq!(envelope.source.as_deref(), Some("custom.pipeline"));
        assert_eq!(envelope.detail_type.as_deref(), Some("ImagePushed"));
    }

    #[test]
    fn rejects_non_object_payloads() {
        for payload in [json!([1, 2]), json!("text"), json!(null), json!(7)] {
            let result = validate_event(&payload, received_at());
            assert!(matches!(result, ValidatedEvent::Invalid(_)), "{payload}");
        }
    }

    #[test]
    fn rejection_reason_names_the_payload_type() {
        let invalid = validate_event(&json!([]), received_at())
            .into_result()
            .expect_err("array payload should be rejected");
        assert_eq!(invalid.reason, "payload must be a JSON object, got array");
    }
}
