use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_FIELD_VALUE: &str = "unknown";
pub const NOTIFICATION_SUBJECT: &str = "New Docker Image Pushed";

pub const IMAGE_TAG_ATTRIBUTE: &str = "imageTag";
pub const REPOSITORY_ATTRIBUTE: &str = "repository";
pub const TIMESTAMP_ATTRIBUTE: &str = "timestamp";

/// A validated "image pushed" notification.
///
/// `received_at` is stamped by the handler, never copied from the emitter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImagePushEvent {
    pub repository: String,
    pub image_tag: String,
    pub received_at: DateTime<Utc>,
}

/// Optional bus metadata carried alongside the event body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,
}

/// The durable artifact written once per image tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub image_tag: String,
    pub repository: String,
    pub timestamp: String,
}

impl ImageRecord {
    pub fn from_event(event: &ImagePushEvent, written_at: DateTime<Utc>) -> Self {
        Self {
            image_tag: event.image_tag.clone(),
            repository: event.repository.clone(),
            timestamp: format_timestamp(written_at),
        }
    }

    /// String-typed attributes as stored, keyed by attribute name.
    pub fn attributes(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            (IMAGE_TAG_ATTRIBUTE, self.image_tag.clone()),
            (REPOSITORY_ATTRIBUTE, self.repository.clone()),
            (TIMESTAMP_ATTRIBUTE, self.timestamp.clone()),
        ])
    }

    /// `repository:tag` reference used in logs and notification bodies.
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.repository, self.image_tag)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
}

impl NotificationMessage {
    pub fn for_record(record: &ImageRecord) -> Self {
        Self {
            subject: NOTIFICATION_SUBJECT.to_string(),
            body: format!(
                "New image pushed: {} at {}",
                record.image_reference(),
                record.timestamp
            ),
        }
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
