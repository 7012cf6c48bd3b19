use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::id::{new_version_id, now_utc};
use crate::types::{Item, VersionId};

/// An immutable snapshot of a buffer's content.
///
/// Once created, `id`, `content`, and `parent_id` never change; only
/// `tags` may grow. `timestamp` orders versions for pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub content: Vec<Item>,
    pub message: String,
    pub parent_id: Option<VersionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Version {
    /// Snapshot `content` with a fresh id and the current timestamp.
    pub fn new(
        content: Vec<Item>,
        message: impl Into<String>,
        parent_id: Option<VersionId>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            id: new_version_id(),
            content,
            message: message.into(),
            parent_id,
            tags: Vec::new(),
            metadata,
            timestamp: now_utc(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
