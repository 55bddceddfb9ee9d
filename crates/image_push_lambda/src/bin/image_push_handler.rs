use std::time::{Duration, SystemTime, UNIX_EPOCH};

use image_push_lambda::adapters::dynamodb::DynamoDbRecordStore;
use image_push_lambda::adapters::sns::SnsNotificationChannel;
use image_push_lambda::config::HandlerConfig;
use image_push_lambda::handlers::image_push::{HandlerSettings, ImagePushHandler};
use image_push_lambda::response::{into_invocation_result, HandlerError, HandlerResponse};
use image_push_lambda::telemetry::{init_tracing, COMPONENT};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

/// Time kept back from the Lambda deadline so the response can still be sent.
const DEADLINE_SAFETY_MARGIN: Duration = Duration::from_millis(250);

type AwsImagePushHandler = ImagePushHandler<DynamoDbRecordStore, SnsNotificationChannel>;

async fn handle_request(
    handler: &AwsImagePushHandler,
    event: LambdaEvent<Value>,
) -> Result<HandlerResponse, Error> {
    let remaining = remaining_budget(event.context.deadline, unix_millis_now());
    info!(
        component = COMPONENT,
        event = "invocation_started",
        request_id = %event.context.request_id,
        remaining_ms = remaining.map(|value| value.as_millis() as u64),
        "invocation started"
    );

    let report = handler.handle_with_deadline(&event.payload, remaining).await;
    into_invocation_result(report).map_err(|handler_error| {
        let (image_tag, repository) = handler_error.image_identity();
        error!(
            component = COMPONENT,
            event = "invocation_failed",
            request_id = %event.context.request_id,
            image_tag = image_tag.unwrap_or("-"),
            repository = repository.unwrap_or("-"),
            retryable = handler_error.retryable(),
            error = %handler_error,
            "invocation failed"
        );
        Error::from(handler_error)
    })
}

fn remaining_budget(deadline_ms: u64, now_ms: u64) -> Option<Duration> {
    if deadline_ms == 0 {
        return None;
    }
    let remaining = Duration::from_millis(deadline_ms.saturating_sub(now_ms));
    Some(remaining.saturating_sub(DEADLINE_SAFETY_MARGIN))
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = HandlerConfig::from_env().map_err(|config_error| {
        error!(
            component = COMPONENT,
            event = "configuration_invalid",
            error = %config_error,
            "configuration invalid"
        );
        Error::from(HandlerError::from(config_error))
    })?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let handler = ImagePushHandler::new(
        DynamoDbRecordStore::new(aws_sdk_dynamodb::Client::new(&aws_config), &config.table_name),
        SnsNotificationChannel::new(aws_sdk_sns::Client::new(&aws_config), &config.topic_arn),
        HandlerSettings::from(&config),
    );

    info!(
        component = COMPONENT,
        event = "handler_initialized",
        table = %config.table_name,
        topic = %config.topic_arn,
        write_mode = config.write_mode.as_str(),
        timeout_ms = config.timeout.as_millis() as u64,
        "handler initialized"
    );

    let shared_handler = &handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(shared_handler, event).await
    }))
    .await
}
