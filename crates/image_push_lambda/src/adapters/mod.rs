pub mod dynamodb;
pub mod notification_channel;
pub mod record_store;
pub mod sns;
