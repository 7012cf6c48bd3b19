use serde_json::Value;

/// Version ID: fixed-length lowercase hex, content-independent.
pub type VersionId = String;

/// Branch name (e.g. "main", "feat/x")
pub type BranchName = String;

/// An opaque content item. Items are deep-copied (`clone`) at every API
/// boundary and compared by deep equality.
pub type Item = Value;

/// Branch every buffer starts on. It can never be deleted.
pub const DEFAULT_BRANCH: &str = "main";

/// Pseudo-ref naming the uncommitted working content in diffs.
pub const WORKING_REF: &str = "working";

/// Length of a version id.
pub const VERSION_ID_LEN: usize = 7;
