//! Re-exports of the domain crate so binaries depend on one module boundary.

pub use image_push_core::{contract, fingerprint, outcome, validation};
