use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;

use crate::adapters::notification_channel::{NotificationChannel, NotificationError};
use crate::runtime::contract::NotificationMessage;

/// Publishes notifications to an SNS topic.
#[derive(Clone)]
pub struct SnsNotificationChannel {
    topic_arn: String,
    client: aws_sdk_sns::Client,
}

impl SnsNotificationChannel {
    pub fn new(client: aws_sdk_sns::Client, topic_arn: impl Into<String>) -> Self {
        Self {
            topic_arn: topic_arn.into(),
            client,
        }
    }
}

#[async_trait]
impl NotificationChannel for SnsNotificationChannel {
    async fn publish(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(&message.subject)
            .message(&message.body)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| {
                NotificationError::new(format!(
                    "sns publish to {} failed: {}",
                    self.topic_arn,
                    DisplayErrorContext(&error)
                ))
            })
    }
}
