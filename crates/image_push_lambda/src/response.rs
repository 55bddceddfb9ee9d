use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::runtime::outcome::{FailureKind, ProcessingOutcome, ProcessingReport, ProcessingStage};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub outcome: ProcessingOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{} during {} stage: {message}", .kind.as_str(), .stage.as_str())]
    Processing {
        kind: FailureKind,
        stage: ProcessingStage,
        image_tag: Option<String>,
        repository: Option<String>,
        message: String,
    },
    #[error("handler misconfigured: {0}")]
    Config(#[from] ConfigError),
}

impl HandlerError {
    pub fn retryable(&self) -> bool {
        match self {
            Self::Processing { kind, .. } => kind.retryable(),
            Self::Config(_) => true,
        }
    }

    /// `(image_tag, repository)` for log context, when known.
    pub fn image_identity(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Self::Processing {
                image_tag,
                repository,
                ..
            } => (image_tag.as_deref(), repository.as_deref()),
            Self::Config(_) => (None, None),
        }
    }
}

pub fn into_invocation_result(report: ProcessingReport) -> Result<HandlerResponse, HandlerError> {
    let status_code = match report.outcome {
        ProcessingOutcome::Completed | ProcessingOutcome::CompletedWithNotificationFailure => 200,
        ProcessingOutcome::RejectedInvalidEvent => 400,
        ProcessingOutcome::Failed => {
            let (image_tag, repository) = match report.image_identity() {
                Some((image_tag, repository)) => {
                    (Some(image_tag.to_string()), Some(repository.to_string()))
                }
                None => (None, None),
            };
            let (kind, stage, message) = match report.failure {
                Some(failure) => (failure.kind, failure.stage, failure.message),
                None => (
                    FailureKind::Unexpected,
                    report.stage_reached,
                    "processing failed without detail".to_string(),
                ),
            };
            return Err(HandlerError::Processing {
                kind,
                stage,
                image_tag,
                repository,
                message,
            });
        }
    };

    let (image_tag, repository, timestamp) = match report.record {
        Some(record) => (
            Some(record.image_tag),
            Some(record.repository),
            Some(record.timestamp),
        ),
        None => (None, None, None),
    };

    Ok(HandlerResponse {
        status_code,
        outcome: report.outcome,
        image_tag,
        repository,
        timestamp,
        message: report.failure.map(|failure| failure.message),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::runtime::contract::{ImagePushEvent, ImageRecord};

    fn sample_record() -> ImageRecord {
        ImageRecord {
            image_tag: "20250101-1200-abc123".to_string(),
            repository: "sample-app-repo".to_string(),
            timestamp: "2025-01-01T12:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn completed_report_returns_ok_response() {
        let response = into_invocation_result(ProcessingReport::completed(sample_record()))
            .expect("completed report should succeed");

        assert_eq!(response.status_code, 200);
        assert_eq!(response.outcome, ProcessingOutcome::Completed);
        assert_eq!(response.image_tag.as_deref(), Some("20250101-1200-abc123"));
        assert!(response.message.is_none());
    }

    #[test]
    fn degraded_report_is_not_an_invocation_error() {
        let report = ProcessingReport::failed(
            FailureKind::Notification,
            ProcessingStage::Persisted,
            Some(sample_record()),
            "topic missing",
        );

        let response = into_invocation_result(report).expect("degraded report should succeed");
        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.outcome,
            ProcessingOutcome::CompletedWithNotificationFailure
        );
        assert_eq!(response.message.as_deref(), Some("topic missing"));
    }

    #[test]
    fn rejected_report_returns_bad_request() {
        let report = ProcessingReport::failed(
            FailureKind::InvalidEvent,
            ProcessingStage::Received,
            None,
            "payload must be a JSON object, got array",
        );

        let response = into_invocation_result(report).expect("rejection should not error");
        assert_eq!(response.status_code, 400);
        assert!(response.image_tag.is_none());
    }

    #[test]
    fn failed_report_surfaces_retryable_error() {
        let report = ProcessingReport::failed(
            FailureKind::Persistence,
            ProcessingStage::Validated,
            None,
            "record store throttled error: slow down",
        );

        let error = into_invocation_result(report).expect_err("failure should error");
        assert!(error.retryable());
        assert_eq!(
            error.to_string(),
            "persistence_failure during validated stage: record store throttled error: slow down"
        );
    }

    #[test]
    fn failed_report_carries_validated_event_identity() {
        let event = ImagePushEvent {
            repository: "sample-app-repo".to_string(),
            image_tag: "20250101-1200-abc123".to_string(),
            received_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        };
        let report = ProcessingReport::failed(
            FailureKind::Timeout,
            ProcessingStage::Validated,
            None,
            "processing exceeded 20ms while validated",
        )
        .with_event(event);

        match into_invocation_result(report).expect_err("timeout should error") {
            HandlerError::Processing {
                image_tag,
                repository,
                ..
            } => {
                assert_eq!(image_tag.as_deref(), Some("20250101-1200-abc123"));
                assert_eq!(repository.as_deref(), Some("sample-app-repo"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn response_serializes_with_status_code_key() {
        let response = into_invocation_result(ProcessingReport::completed(sample_record()))
            .expect("completed report should succeed");
        let value = serde_json::to_value(response).expect("response should serialize");

        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["outcome"], "completed");
        assert_eq!(value["imageTag"], "20250101-1200-abc123");
    }
}
