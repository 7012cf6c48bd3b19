use serde::{Deserialize, Serialize};

use saga_core::{Branch, BranchName, Item, Version};

/// Serialized form of a buffer for persistence collaborators.
///
/// `name`, `current_branch`, `branches`, and `versions` are the stable
/// interop surface; `working_content` and `dirty` carry the uncommitted
/// state so a round-trip reproduces the buffer exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferExport {
    pub name: String,
    pub current_branch: BranchName,
    pub branches: Vec<Branch>,
    pub versions: Vec<Version>,
    #[serde(default)]
    pub working_content: Vec<Item>,
    #[serde(default)]
    pub dirty: bool,
}

impl BufferExport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_roundtrip() {
        let export = BufferExport {
            name: "t".to_string(),
            current_branch: "main".to_string(),
            branches: vec![Branch::new("main", "abc1234".to_string(), None, None)],
            versions: vec![Version::new(
                vec![json!({"id": "1"})],
                "Initial commit",
                None,
                serde_json::Map::new(),
            )],
            working_content: vec![json!({"id": "1"})],
            dirty: false,
        };
        let json = export.to_json().unwrap();
        let back = BufferExport::from_json(&json).unwrap();
        assert_eq!(back.name, "t");
        assert_eq!(back.branches.len(), 1);
        assert_eq!(back.versions.len(), 1);
        assert_eq!(back.working_content, export.working_content);
    }

    #[test]
    fn missing_working_state_defaults() {
        let json = r#"{
            "name": "t",
            "current_branch": "main",
            "branches": [],
            "versions": []
        }"#;
        let export = BufferExport::from_json(json).unwrap();
        assert!(export.working_content.is_empty());
        assert!(!export.dirty);
    }
}
