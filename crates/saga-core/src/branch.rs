use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{EngineError, Result};
use crate::id::now_utc;
use crate::types::{BranchName, VersionId};

/// A named, movable pointer into a buffer's version table.
///
/// `head_version_id` always refers to an existing version in the same
/// buffer; branches hold ids, never direct references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: BranchName,
    pub head_version_id: VersionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_branch: Option<BranchName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Branch {
    pub fn new(
        name: impl Into<BranchName>,
        head_version_id: VersionId,
        parent_branch: Option<BranchName>,
        description: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            head_version_id,
            parent_branch,
            description,
            created_at: now_utc(),
        }
    }
}

/// Validate a branch or tag name: 1-64 chars from [A-Za-z0-9._/-].
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 {
        return Err(EngineError::InvalidName(format!(
            "{name:?}: must be 1-64 characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' || c == '/')
    {
        return Err(EngineError::InvalidName(format!(
            "{name:?}: only [A-Za-z0-9._/-] allowed"
        )));
    }
    Ok(())
}

/// Buffer names follow the branch rule minus `/`.
pub fn validate_buffer_name(name: &str) -> Result<()> {
    validate_branch_name(name)?;
    if name.contains('/') {
        return Err(EngineError::InvalidName(format!(
            "{name:?}: '/' not allowed in buffer names"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_new_sets_pointer() {
        let b = Branch::new("feat/x", "abc1234".to_string(), Some("main".to_string()), None);
        assert_eq!(b.name, "feat/x");
        assert_eq!(b.head_version_id, "abc1234");
        assert_eq!(b.parent_branch.as_deref(), Some("main"));
    }

    #[test]
    fn valid_branch_names() {
        for name in ["main", "feat/x", "release-1.0", "a_b", "x"] {
            assert!(validate_branch_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn invalid_branch_names() {
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name(&"x".repeat(65)).is_err());
        assert!(validate_branch_name("has space").is_err());
        assert!(validate_branch_name("émoji").is_err());
    }

    #[test]
    fn buffer_names_reject_slash() {
        assert!(validate_buffer_name("scratch").is_ok());
        assert!(validate_buffer_name("a/b").is_err());
    }
}
