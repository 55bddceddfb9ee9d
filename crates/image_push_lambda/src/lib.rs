//! AWS-oriented adapters and handlers for image push post-processing.
//!
//! This crate owns runtime integration details (Lambda handler, DynamoDB and
//! SNS adapters, configuration, telemetry) and exposes a single runtime module
//! boundary for the domain primitives in `image_push_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod response;
pub mod runtime;
pub mod telemetry;
