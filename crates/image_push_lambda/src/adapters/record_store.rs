use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::runtime::contract::ImageRecord;

/// How a record is written when one already exists for the tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite unconditionally; redeliveries rewrite the same fact.
    #[default]
    Upsert,
    /// Write only when no record exists; an existing record counts as success.
    IfAbsent,
}

impl WriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::IfAbsent => "if_absent",
        }
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(Self::Upsert),
            "if_absent" | "if-absent" => Ok(Self::IfAbsent),
            other => Err(format!(
                "unsupported write mode '{other}', expected 'upsert' or 'if_absent'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    /// A conditional write found an existing record; carries the stored copy.
    AlreadyPresent(ImageRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Timeout,
    Throttled,
    AccessDenied,
    Unavailable,
    Other,
}

impl StoreErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Throttled => "throttled",
            Self::AccessDenied => "access_denied",
            Self::Unavailable => "unavailable",
            Self::Other => "other",
        }
    }
}

/// A failed durable write. Every kind is retryable by redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record store {} error: {message}", kind.as_str())]
pub struct RecordStoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl RecordStoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_record(
        &self,
        record: &ImageRecord,
        mode: WriteMode,
    ) -> Result<PutOutcome, RecordStoreError>;
}
