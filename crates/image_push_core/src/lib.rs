//! Shared image push domain primitives.
//!
//! This crate owns event validation, record and notification construction,
//! and outcome classification. It intentionally excludes AWS SDK and Lambda
//! runtime concerns; those live in `image_push_lambda`.

pub mod contract;
pub mod fingerprint;
pub mod outcome;
pub mod validation;
