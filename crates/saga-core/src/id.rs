use sha2::{Digest, Sha256};

use crate::types::{VersionId, VERSION_ID_LEN};

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Buffer ID format: `buf_<ulid>`
pub fn new_buffer_id() -> String {
    format!("buf_{}", ulid::Ulid::new().to_string().to_lowercase())
}

/// Generate a fresh version id: the first 7 hex chars of the SHA-256 of a
/// new ULID. Content-independent; per-buffer uniqueness is enforced where
/// versions are created (regenerate on collision).
pub fn new_version_id() -> VersionId {
    let ulid = ulid::Ulid::new().to_string();
    sha256_hex(ulid.as_bytes())[..VERSION_ID_LEN].to_string()
}

pub fn now_utc() -> time::OffsetDateTime {
    time::OffsetDateTime::now_utc()
}

/// RFC 3339 rendering for human-facing timestamps.
pub fn format_rfc3339(ts: time::OffsetDateTime) -> String {
    ts.format(&time::format_description::well_known::Rfc3339)
        .expect("RFC3339 formatting should not fail")
}
