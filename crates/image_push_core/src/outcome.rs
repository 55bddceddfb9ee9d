//! Terminal outcomes and the failure taxonomy of a single invocation.
//!
//! Processing moves `Received → Validated → Persisted → Notified`. Exactly one
//! [`ProcessingOutcome`] is produced per invocation; only `Failed` asks the
//! delivery mechanism to redeliver.

use serde::{Deserialize, Serialize};

use crate::contract::{ImagePushEvent, ImageRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingOutcome {
    Completed,
    CompletedWithNotificationFailure,
    RejectedInvalidEvent,
    Failed,
}

impl ProcessingOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CompletedWithNotificationFailure => "completed_with_notification_failure",
            Self::RejectedInvalidEvent => "rejected_invalid_event",
            Self::Failed => "failed",
        }
    }

    /// Whether the durable side effect is known to have happened.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithNotificationFailure)
    }

    /// Whether the caller should redeliver the event.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Received,
    Validated,
    Persisted,
    Notified,
}

impl ProcessingStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Persisted => "persisted",
            Self::Notified => "notified",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidEvent,
    Persistence,
    Notification,
    Timeout,
    Unexpected,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidEvent => "invalid_event",
            Self::Persistence => "persistence_failure",
            Self::Notification => "notification_failure",
            Self::Timeout => "timeout",
            Self::Unexpected => "unexpected",
        }
    }

    pub fn retryable(self) -> bool {
        matches!(self, Self::Persistence | Self::Timeout | Self::Unexpected)
    }

    /// Terminal outcome this failure produces.
    pub fn outcome(self) -> ProcessingOutcome {
        match self {
            Self::InvalidEvent => ProcessingOutcome::RejectedInvalidEvent,
            Self::Notification => ProcessingOutcome::CompletedWithNotificationFailure,
            Self::Persistence | Self::Timeout | Self::Unexpected => ProcessingOutcome::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureDetail {
    pub kind: FailureKind,
    /// Last stage reached before the failure.
    pub stage: ProcessingStage,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingReport {
    pub outcome: ProcessingOutcome,
    pub stage_reached: ProcessingStage,
    /// The validated event, once validation has succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<ImagePushEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ImageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
}

impl ProcessingReport {
    pub fn completed(record: ImageRecord) -> Self {
        Self {
            outcome: ProcessingOutcome::Completed,
            stage_reached: ProcessingStage::Notified,
            event: None,
            record: Some(record),
            failure: None,
        }
    }

    pub fn failed(
        kind: FailureKind,
        stage: ProcessingStage,
        record: Option<ImageRecord>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            outcome: kind.outcome(),
            stage_reached: stage,
            event: None,
            record,
            failure: Some(FailureDetail {
                kind,
                stage,
                message: message.into(),
            }),
        }
    }

    pub fn with_event(mut self, event: ImagePushEvent) -> Self {
        self.event = Some(event);
        self
    }

    /// `(image_tag, repository)` of whatever the invocation got far enough to know.
    pub fn image_identity(&self) -> Option<(&str, &str)> {
        if let Some(record) = &self.record {
            return Some((record.image_tag.as_str(), record.repository.as_str()));
        }
        self.event
            .as_ref()
            .map(|event| (event.image_tag.as_str(), event.repository.as_str()))
    }
}
