#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use image_push_lambda::adapters::notification_channel::{NotificationChannel, NotificationError};
use image_push_lambda::adapters::record_store::{
    PutOutcome, RecordStore, RecordStoreError, StoreErrorKind, WriteMode,
};
use image_push_lambda::handlers::image_push::{Clock, HandlerSettings, ImagePushHandler};
use image_push_lambda::runtime::contract::{ImageRecord, NotificationMessage};

/// Key-value store keyed by image tag, with optional failure injection.
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, ImageRecord>>,
    put_calls: Mutex<usize>,
    failure: Option<StoreErrorKind>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            put_calls: Mutex::new(0),
            failure: None,
        }
    }

    pub fn failing(kind: StoreErrorKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::new()
        }
    }

    pub fn records(&self) -> Vec<ImageRecord> {
        self.records
            .lock()
            .expect("poisoned mutex")
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, image_tag: &str) -> Option<ImageRecord> {
        self.records
            .lock()
            .expect("poisoned mutex")
            .get(image_tag)
            .cloned()
    }

    pub fn put_calls(&self) -> usize {
        *self.put_calls.lock().expect("poisoned mutex")
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put_record(
        &self,
        record: &ImageRecord,
        mode: WriteMode,
    ) -> Result<PutOutcome, RecordStoreError> {
        *self.put_calls.lock().expect("poisoned mutex") += 1;
        if let Some(kind) = self.failure {
            return Err(RecordStoreError::new(kind, "simulated store failure"));
        }

        let mut records = self.records.lock().expect("poisoned mutex");
        if mode == WriteMode::IfAbsent {
            if let Some(existing) = records.get(&record.image_tag) {
                return Ok(PutOutcome::AlreadyPresent(existing.clone()));
            }
        }
        records.insert(record.image_tag.clone(), record.clone());
        Ok(PutOutcome::Written)
    }
}

/// Captures every publish attempt, optionally failing them.
pub struct RecordingChannel {
    attempts: Mutex<Vec<NotificationMessage>>,
    fail: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn attempts(&self) -> Vec<NotificationMessage> {
        self.attempts.lock().expect("poisoned mutex").clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn publish(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        self.attempts
            .lock()
            .expect("poisoned mutex")
            .push(message.clone());
        if self.fail {
            return Err(NotificationError::new("simulated publish failure"));
        }
        Ok(())
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clock whose reading can be moved forward between deliveries.
#[derive(Clone)]
pub struct SharedClock(Arc<Mutex<DateTime<Utc>>>);

impl SharedClock {
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(at)))
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.0.lock().expect("poisoned mutex") = at;
    }
}

impl Clock for SharedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("poisoned mutex")
    }
}

pub fn processing_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

pub fn default_settings() -> HandlerSettings {
    HandlerSettings {
        write_mode: WriteMode::Upsert,
        timeout: Duration::from_secs(5),
    }
}

pub fn build_handler(
    store: InMemoryRecordStore,
    channel: RecordingChannel,
    settings: HandlerSettings,
) -> ImagePushHandler<InMemoryRecordStore, RecordingChannel, FixedClock> {
    ImagePushHandler::new(store, channel, settings).with_clock(FixedClock(processing_time()))
}
