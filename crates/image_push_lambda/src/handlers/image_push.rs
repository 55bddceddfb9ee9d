use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::adapters::notification_channel::NotificationChannel;
use crate::adapters::record_store::{PutOutcome, RecordStore, WriteMode};
use crate::config::HandlerConfig;
use crate::runtime::contract::{EventEnvelope, ImagePushEvent, ImageRecord, NotificationMessage};
use crate::runtime::fingerprint::event_fingerprint;
use crate::runtime::outcome::{FailureKind, ProcessingReport, ProcessingStage};
use crate::runtime::validation::{validate_event, ValidatedEvent};
use crate::telemetry::COMPONENT;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerSettings {
    pub write_mode: WriteMode,
    pub timeout: Duration,
}

impl From<&HandlerConfig> for HandlerSettings {
    fn from(config: &HandlerConfig) -> Self {
        Self {
            write_mode: config.write_mode,
            timeout: config.timeout,
        }
    }
}

pub struct ImagePushHandler<S, N, C = SystemClock> {
    store: S,
    channel: N,
    clock: C,
    settings: HandlerSettings,
}

/// What the invocation had achieved when it was last observed.
#[derive(Debug, Clone)]
struct Progress {
    stage: ProcessingStage,
    event: Option<ImagePushEvent>,
    record: Option<ImageRecord>,
}

impl<S, N> ImagePushHandler<S, N, SystemClock>
where
    S: RecordStore,
    N: NotificationChannel,
{
    pub fn new(store: S, channel: N, settings: HandlerSettings) -> Self {
        Self {
            store,
            channel,
            clock: SystemClock,
            settings,
        }
    }
}

impl<S, N, C> ImagePushHandler<S, N, C>
where
    S: RecordStore,
    N: NotificationChannel,
    C: Clock,
{
    pub fn with_clock<T: Clock>(self, clock: T) -> ImagePushHandler<S, N, T> {
        ImagePushHandler {
            store: self.store,
            channel: self.channel,
            clock,
            settings: self.settings,
        }
    }

    pub fn settings(&self) -> HandlerSettings {
        self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn channel(&self) -> &N {
        &self.channel
    }

    pub async fn handle(&self, payload: &Value) -> ProcessingReport {
        self.handle_within(payload, self.settings.timeout).await
    }

    /// Like [`Self::handle`], but never runs past the caller's remaining time.
    pub async fn handle_with_deadline(
        &self,
        payload: &Value,
        remaining: Option<Duration>,
    ) -> ProcessingReport {
        let budget = remaining.map_or(self.settings.timeout, |remaining| {
            remaining.min(self.settings.timeout)
        });
        self.handle_within(payload, budget).await
    }

    async fn handle_within(&self, payload: &Value, budget: Duration) -> ProcessingReport {
        let progress = Mutex::new(Progress {
            stage: ProcessingStage::Received,
            event: None,
            record: None,
        });

        match tokio::time::timeout(budget, self.process(payload, &progress)).await {
            Ok(report) => report,
            Err(_) => {
                let snapshot = match progress.lock() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                timed_out_report(snapshot, budget)
            }
        }
    }

    async fn process(&self, payload: &Value, progress: &Mutex<Progress>) -> ProcessingReport {
        let received_at = self.clock.now();
        info!(
            component = COMPONENT,
            event = "event_received",
            received_at = %received_at.to_rfc3339(),
            "event received"
        );

        let (event, envelope) = match validate_event(payload, received_at) {
            ValidatedEvent::Valid { event, envelope } => (event, envelope),
            ValidatedEvent::Invalid(invalid) => {
                warn!(
                    component = COMPONENT,
                    event = "event_rejected",
                    outcome = "rejected_invalid_event",
                    error = %invalid,
                    "event rejected"
                );
                return ProcessingReport::failed(
                    FailureKind::InvalidEvent,
                    ProcessingStage::Received,
                    None,
                    invalid.reason,
                );
            }
        };

        let fingerprint = event_fingerprint(&event.repository, &event.image_tag);
        log_validated(&event, &envelope, &fingerprint);
        record_progress(progress, ProcessingStage::Validated, Some(&event), None);

        let attempted = ImageRecord::from_event(&event, self.clock.now());
        let record = match self.store.put_record(&attempted, self.settings.write_mode).await {
            Ok(PutOutcome::Written) => {
                info!(
                    component = COMPONENT,
                    event = "record_persisted",
                    image_tag = %attempted.image_tag,
                    repository = %attempted.repository,
                    fingerprint = %fingerprint,
                    write_mode = self.settings.write_mode.as_str(),
                    "record persisted"
                );
                attempted
            }
            Ok(PutOutcome::AlreadyPresent(existing)) => {
                info!(
                    component = COMPONENT,
                    event = "record_already_present",
                    image_tag = %existing.image_tag,
                    repository = %existing.repository,
                    stored_timestamp = %existing.timestamp,
                    fingerprint = %fingerprint,
                    write_mode = self.settings.write_mode.as_str(),
                    "record already present"
                );
                existing
            }
            Err(store_error) => {
                error!(
                    component = COMPONENT,
                    event = "persistence_failed",
                    image_tag = %event.image_tag,
                    repository = %event.repository,
                    fingerprint = %fingerprint,
                    stage = ProcessingStage::Validated.as_str(),
                    error_kind = store_error.kind.as_str(),
                    error = %store_error,
                    outcome = "failed",
                    "persistence failed"
                );
                return ProcessingReport::failed(
                    FailureKind::Persistence,
                    ProcessingStage::Validated,
                    None,
                    store_error.to_string(),
                )
                .with_event(event);
            }
        };
        record_progress(progress, ProcessingStage::Persisted, None, Some(&record));

        let message = NotificationMessage::for_record(&record);
        if let Err(notify_error) = self.channel.publish(&message).await {
            warn!(
                component = COMPONENT,
                event = "notification_failed",
                image_tag = %record.image_tag,
                repository = %record.repository,
                fingerprint = %fingerprint,
                stage = ProcessingStage::Persisted.as_str(),
                error = %notify_error,
                outcome = "completed_with_notification_failure",
                "notification failed"
            );
            return ProcessingReport::failed(
                FailureKind::Notification,
                ProcessingStage::Persisted,
                Some(record),
                notify_error.to_string(),
            )
            .with_event(event);
        }
        record_progress(progress, ProcessingStage::Notified, None, None);
        info!(
            component = COMPONENT,
            event = "notification_published",
            image_tag = %record.image_tag,
            subject = %message.subject,
            "notification published"
        );

        info!(
            component = COMPONENT,
            event = "processing_completed",
            image_tag = %record.image_tag,
            repository = %record.repository,
            fingerprint = %fingerprint,
            outcome = "completed",
            "processing completed"
        );
        ProcessingReport::completed(record)
    }
}

fn log_validated(event: &ImagePushEvent, envelope: &EventEnvelope, fingerprint: &str) {
    info!(
        component = COMPONENT,
        event = "event_validated",
        image_tag = %event.image_tag,
        repository = %event.repository,
        fingerprint = %fingerprint,
        event_id = envelope.event_id.as_deref().unwrap_or("-"),
        source = envelope.source.as_deref().unwrap_or("-"),
        detail_type = envelope.detail_type.as_deref().unwrap_or("-"),
        "event validated"
    );
}

fn record_progress(
    progress: &Mutex<Progress>,
    stage: ProcessingStage,
    event: Option<&ImagePushEvent>,
    record: Option<&ImageRecord>,
) {
    let mut guard = match progress.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.stage = stage;
    if let Some(event) = event {
        guard.event = Some(event.clone());
    }
    if let Some(record) = record {
        guard.record = Some(record.clone());
    }
}

/// Running out of time is always retryable, whatever stage was reached.
fn timed_out_report(progress: Progress, budget: Duration) -> ProcessingReport {
    let message = format!(
        "processing exceeded {}ms while {}",
        budget.as_millis(),
        progress.stage.as_str()
    );
    let (image_tag, repository) = match (&progress.record, &progress.event) {
        (Some(record), _) => (record.image_tag.as_str(), record.repository.as_str()),
        (None, Some(event)) => (event.image_tag.as_str(), event.repository.as_str()),
        (None, None) => ("-", "-"),
    };

    error!(
        component = COMPONENT,
        event = "processing_timed_out",
        image_tag = %image_tag,
        repository = %repository,
        stage = progress.stage.as_str(),
        budget_ms = budget.as_millis() as u64,
        outcome = "failed",
        "processing timed out"
    );

    let report =
        ProcessingReport::failed(FailureKind::Timeout, progress.stage, progress.record, message);
    match progress.event {
        Some(event) => report.with_event(event),
        None => report,
    }
}
