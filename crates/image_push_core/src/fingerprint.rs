use sha2::{Digest, Sha256};

/// Stable hex digest of the idempotency identity of a push.
///
/// Redeliveries of the same push share a fingerprint, which lets log queries
/// group them without relying on bus-assigned event ids.
pub fn event_fingerprint(repository: &str, image_tag: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repository.as_bytes());
    hasher.update([0u8]);
    hasher.update(image_tag.as_bytes());
    format!("{:x}", hasher.finalize())
}
