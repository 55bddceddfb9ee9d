use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValuesOnConditionCheckFailure};

use crate::adapters::record_store::{
    PutOutcome, RecordStore, RecordStoreError, StoreErrorKind, WriteMode,
};
use crate::runtime::contract::{
    ImageRecord, IMAGE_TAG_ATTRIBUTE, REPOSITORY_ATTRIBUTE, TIMESTAMP_ATTRIBUTE,
};

const IF_ABSENT_CONDITION: &str = "attribute_not_exists(#tag)";

/// Writes image records into a DynamoDB table keyed by `imageTag`.
#[derive(Clone)]
pub struct DynamoDbRecordStore {
    table_name: String,
    client: aws_sdk_dynamodb::Client,
}

impl DynamoDbRecordStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            client,
        }
    }
}

#[async_trait]
impl RecordStore for DynamoDbRecordStore {
    async fn put_record(
        &self,
        record: &ImageRecord,
        mode: WriteMode,
    ) -> Result<PutOutcome, RecordStoreError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record_item(record)));

        if mode == WriteMode::IfAbsent {
            request = request
                .condition_expression(IF_ABSENT_CONDITION)
                .expression_attribute_names("#tag", IMAGE_TAG_ATTRIBUTE)
                .return_values_on_condition_check_failure(
                    ReturnValuesOnConditionCheckFailure::AllOld,
                );
        }

        match request.send().await {
            Ok(_) => Ok(PutOutcome::Written),
            Err(error) => map_put_error(error),
        }
    }
}

fn record_item(record: &ImageRecord) -> HashMap<String, AttributeValue> {
    record
        .attributes()
        .into_iter()
        .map(|(name, value)| (name.to_string(), AttributeValue::S(value)))
        .collect()
}

fn record_from_item(item: &HashMap<String, AttributeValue>) -> Option<ImageRecord> {
    let text = |name: &str| item.get(name)?.as_s().ok().cloned();
    Some(ImageRecord {
        image_tag: text(IMAGE_TAG_ATTRIBUTE)?,
        repository: text(REPOSITORY_ATTRIBUTE)?,
        timestamp: text(TIMESTAMP_ATTRIBUTE)?,
    })
}

fn map_put_error<R>(error: SdkError<PutItemError, R>) -> Result<PutOutcome, RecordStoreError>
where
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let kind = match &error {
        SdkError::TimeoutError(_) => StoreErrorKind::Timeout,
        SdkError::DispatchFailure(failure) if failure.is_timeout() => StoreErrorKind::Timeout,
        SdkError::DispatchFailure(_) => StoreErrorKind::Unavailable,
        SdkError::ServiceError(service) => match service.err() {
            PutItemError::ConditionalCheckFailedException(conflict) => {
                return match conflict.item().and_then(record_from_item) {
                    Some(existing) => Ok(PutOutcome::AlreadyPresent(existing)),
                    None => Err(RecordStoreError::new(
                        StoreErrorKind::Other,
                        "conditional write rejected without returning the stored item",
                    )),
                };
            }
            other => classify_error_code(other.code()),
        },
        _ => StoreErrorKind::Other,
    };

    Err(RecordStoreError::new(
        kind,
        format!("failed to put item: {}", DisplayErrorContext(&error)),
    ))
}

pub(crate) fn classify_error_code(code: Option<&str>) -> StoreErrorKind {
    match code {
        Some(
            "ProvisionedThroughputExceededException"
            | "RequestLimitExceeded"
            | "ThrottlingException",
        ) => StoreErrorKind::Throttled,
        Some(
            "AccessDeniedException" | "UnrecognizedClientException" | "ExpiredTokenException",
        ) => StoreErrorKind::AccessDenied,
        Some("InternalServerError" | "ServiceUnavailable") => StoreErrorKind::Unavailable,
        _ => StoreErrorKind::Other,
    }
}
