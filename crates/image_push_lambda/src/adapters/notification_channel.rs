use async_trait::async_trait;
use thiserror::Error;

use crate::runtime::contract::NotificationMessage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to publish notification: {message}")]
pub struct NotificationError {
    pub message: String,
}

impl NotificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Fan-out endpoint; delivery to individual subscribers is its concern.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn publish(&self, message: &NotificationMessage) -> Result<(), NotificationError>;
}
