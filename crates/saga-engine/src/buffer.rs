use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use saga_core::id::{new_buffer_id, new_version_id};
use saga_core::merge::combine;
use saga_core::{
    validate_branch_name, Branch, BranchName, EngineError, Item, MergeResult, MergeStrategy,
    Result, Version, VersionId, DEFAULT_BRANCH,
};

use crate::export::BufferExport;

/// A named, versioned container for an ordered item collection.
///
/// Versions live in an append-only table keyed by id; branches and tags
/// hold only ids, never direct references, so pruning and cycle-freedom
/// are structural. Content crossing the API boundary is always cloned
/// (`Item` clones are deep).
#[derive(Debug, Clone)]
pub struct Buffer {
    id: String,
    name: String,
    current_branch: BranchName,
    working_content: Vec<Item>,
    dirty: bool,
    versions: HashMap<VersionId, Version>,
    branches: HashMap<BranchName, Branch>,
}

impl Buffer {
    /// Create a buffer seeded with `initial_content`: version 1 is the
    /// "Initial commit" and `main` points at it.
    pub(crate) fn create(name: impl Into<String>, initial_content: Vec<Item>) -> Self {
        let name = name.into();
        let mut buffer = Self {
            id: new_buffer_id(),
            name,
            current_branch: DEFAULT_BRANCH.to_string(),
            working_content: initial_content.clone(),
            dirty: false,
            versions: HashMap::new(),
            branches: HashMap::new(),
        };
        let initial = Version::new(initial_content, "Initial commit", None, Map::new());
        let head = buffer.insert_version(initial);
        buffer.branches.insert(
            DEFAULT_BRANCH.to_string(),
            Branch::new(DEFAULT_BRANCH, head, None, None),
        );
        buffer
    }

    // ── Accessors ──

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_branch(&self) -> &str {
        &self.current_branch
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Deep copy of the working content.
    pub fn working_content(&self) -> Vec<Item> {
        self.working_content.clone()
    }

    pub fn item_count(&self) -> usize {
        self.working_content.len()
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Id of the version the current branch points at.
    pub fn head_version_id(&self) -> VersionId {
        self.head_version().id.clone()
    }

    /// The version the current branch points at.
    ///
    /// Every mutation below maintains the invariant that the current
    /// branch exists and its HEAD resolves.
    fn head_version(&self) -> &Version {
        self.branches
            .get(&self.current_branch)
            .and_then(|b| self.versions.get(&b.head_version_id))
            .expect("current branch HEAD must resolve")
    }

    fn set_current_head(&mut self, version_id: VersionId) {
        if let Some(branch) = self.branches.get_mut(&self.current_branch) {
            branch.head_version_id = version_id;
        }
    }

    /// Insert a version, regenerating the id on the rare collision.
    fn insert_version(&mut self, mut version: Version) -> VersionId {
        while self.versions.contains_key(&version.id) {
            version.id = new_version_id();
        }
        let id = version.id.clone();
        self.versions.insert(id.clone(), version);
        id
    }

    // ── Working content ──

    pub(crate) fn set_working(&mut self, items: Vec<Item>, max_items: usize) -> Result<()> {
        if items.len() > max_items {
            return Err(EngineError::CapacityExceeded {
                requested: items.len(),
                limit: max_items,
            });
        }
        self.working_content = items;
        self.dirty = true;
        Ok(())
    }

    /// Append items; an empty append changes nothing and does not mark
    /// the buffer dirty.
    pub(crate) fn append(&mut self, items: Vec<Item>, max_items: usize) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let requested = self.working_content.len() + items.len();
        if requested > max_items {
            return Err(EngineError::CapacityExceeded {
                requested,
                limit: max_items,
            });
        }
        self.working_content.extend(items);
        self.dirty = true;
        Ok(())
    }

    pub(crate) fn clear_working(&mut self) {
        self.working_content.clear();
        self.dirty = true;
    }

    // ── Version control ──

    /// Snapshot the working content as a new version on the current
    /// branch and advance its HEAD.
    pub(crate) fn commit(
        &mut self,
        message: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Result<Version> {
        if !self.dirty {
            return Err(EngineError::NothingToCommit(self.name.clone()));
        }
        let parent = self.head_version().id.clone();
        let version = Version::new(
            self.working_content.clone(),
            message,
            Some(parent),
            metadata,
        );
        let id = self.insert_version(version);
        self.set_current_head(id.clone());
        self.dirty = false;
        Ok(self.versions[&id].clone())
    }

    /// Resolve a version id or tag to its version. One resolution path
    /// for the whole API: ids win over tags.
    pub fn resolve_ref(&self, reference: &str) -> Result<&Version> {
        if let Some(version) = self.versions.get(reference) {
            return Ok(version);
        }
        self.versions
            .values()
            .find(|v| v.has_tag(reference))
            .ok_or_else(|| EngineError::RefNotFound(reference.to_string()))
    }

    pub fn get_version(&self, reference: &str) -> Option<Version> {
        self.resolve_ref(reference).ok().cloned()
    }

    /// Alias a version with a tag, unique within the buffer. Tagged
    /// versions are protected from pruning.
    pub(crate) fn tag(&mut self, version_ref: &str, tag_name: &str) -> Result<()> {
        validate_branch_name(tag_name)?;
        let id = self.resolve_ref(version_ref)?.id.clone();
        if self.versions.values().any(|v| v.has_tag(tag_name)) {
            return Err(EngineError::TagExists(tag_name.to_string()));
        }
        if let Some(version) = self.versions.get_mut(&id) {
            version.tags.push(tag_name.to_string());
        }
        Ok(())
    }

    /// Walk the parent chain from the current branch HEAD backward,
    /// most-recent first. Stops early if an ancestor was pruned.
    pub fn history(&self, limit: Option<usize>) -> Vec<Version> {
        let max = limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        let mut cursor = Some(self.head_version().id.clone());
        while let Some(id) = cursor {
            if out.len() >= max {
                break;
            }
            match self.versions.get(&id) {
                Some(version) => {
                    out.push(version.clone());
                    cursor = version.parent_id.clone();
                }
                None => break,
            }
        }
        out
    }

    // ── Checkout & rollback ──

    /// Non-destructive preview: replace the working content with a
    /// historical version's content. The branch HEAD does not move.
    pub(crate) fn checkout(&mut self, reference: &str) -> Result<Vec<Item>> {
        let content = self.resolve_ref(reference)?.content.clone();
        self.working_content = content.clone();
        self.dirty = false;
        Ok(content)
    }

    /// Move the current branch HEAD `steps` hops up the parent chain and
    /// restore that version's content. Unreachable versions are left for
    /// pruning to reclaim.
    pub(crate) fn rollback(&mut self, steps: usize) -> Result<Version> {
        let mut cursor = self.head_version().clone();
        let mut taken = 0;
        while taken < steps {
            match cursor.parent_id.as_ref().and_then(|id| self.versions.get(id)) {
                Some(parent) => {
                    cursor = parent.clone();
                    taken += 1;
                }
                None => {
                    return Err(EngineError::CannotRollback {
                        steps,
                        available: taken,
                    })
                }
            }
        }
        self.set_current_head(cursor.id.clone());
        self.working_content = cursor.content.clone();
        self.dirty = false;
        Ok(cursor)
    }

    /// Reset the working content to the current branch HEAD. History is
    /// untouched.
    pub(crate) fn discard_changes(&mut self) {
        self.working_content = self.head_version().content.clone();
        self.dirty = false;
    }

    // ── Branching ──

    /// Fork a branch at the current HEAD.
    pub(crate) fn create_branch(
        &mut self,
        branch_name: &str,
        description: Option<String>,
        max_branches: usize,
    ) -> Result<Branch> {
        validate_branch_name(branch_name)?;
        if self.branches.contains_key(branch_name) {
            return Err(EngineError::BranchExists(branch_name.to_string()));
        }
        if self.branches.len() >= max_branches {
            return Err(EngineError::BranchLimitExceeded {
                limit: max_branches,
            });
        }
        let head = self.head_version().id.clone();
        let branch = Branch::new(
            branch_name,
            head,
            Some(self.current_branch.clone()),
            description,
        );
        self.branches.insert(branch_name.to_string(), branch.clone());
        Ok(branch)
    }

    /// Switch to another branch and load its HEAD content. Switching to
    /// the branch already checked out is a no-op success.
    pub(crate) fn switch_branch(&mut self, branch_name: &str) -> Result<()> {
        if branch_name == self.current_branch {
            return Ok(());
        }
        let branch = self
            .branches
            .get(branch_name)
            .ok_or_else(|| EngineError::BranchNotFound(branch_name.to_string()))?;
        if self.dirty {
            return Err(EngineError::DirtyState(self.name.clone()));
        }
        let content = self
            .versions
            .get(&branch.head_version_id)
            .ok_or_else(|| EngineError::RefNotFound(branch.head_version_id.clone()))?
            .content
            .clone();
        self.current_branch = branch_name.to_string();
        self.working_content = content;
        self.dirty = false;
        Ok(())
    }

    /// Remove a branch pointer. Its reachable versions stay in the
    /// version table until pruning reclaims them.
    pub(crate) fn delete_branch(&mut self, branch_name: &str) -> Result<()> {
        if !self.branches.contains_key(branch_name) {
            return Err(EngineError::BranchNotFound(branch_name.to_string()));
        }
        if branch_name == self.current_branch {
            return Err(EngineError::IsCurrentBranch(branch_name.to_string()));
        }
        if branch_name == DEFAULT_BRANCH {
            return Err(EngineError::CannotDeleteMain);
        }
        self.branches.remove(branch_name);
        Ok(())
    }

    pub fn list_branches(&self) -> Vec<Branch> {
        let mut branches: Vec<Branch> = self.branches.values().cloned().collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        branches
    }

    pub fn get_branch(&self, branch_name: &str) -> Option<Branch> {
        self.branches.get(branch_name).cloned()
    }

    // ── Merge ──

    /// Merge `source_branch` into the current branch. Compares the two
    /// HEAD contents only (no recorded common ancestor). A conflicting
    /// `auto` merge creates no version and returns the provisional
    /// content for caller-driven resolution.
    pub(crate) fn merge_from(
        &mut self,
        source_branch: &str,
        message: Option<String>,
        strategy: MergeStrategy,
    ) -> Result<MergeResult> {
        if self.dirty {
            return Err(EngineError::DirtyState(self.name.clone()));
        }
        let source = self
            .branches
            .get(source_branch)
            .ok_or_else(|| EngineError::BranchNotFound(source_branch.to_string()))?;
        let source_head_id = source.head_version_id.clone();

        let target_head = self.head_version();
        if source_head_id == target_head.id {
            return Ok(MergeResult {
                success: true,
                new_version_id: None,
                conflicts: Vec::new(),
                merged_content: target_head.content.clone(),
                details: Some("already up to date".to_string()),
            });
        }

        let base = target_head.content.clone();
        let target_head_id = target_head.id.clone();
        let other = self
            .versions
            .get(&source_head_id)
            .ok_or_else(|| EngineError::RefNotFound(source_head_id.clone()))?
            .content
            .clone();

        let (merged, conflicts) = combine(&base, &other, strategy);
        if !conflicts.is_empty() {
            let details = format!("{} conflicts require resolution", conflicts.len());
            return Ok(MergeResult {
                success: false,
                new_version_id: None,
                conflicts,
                merged_content: merged,
                details: Some(details),
            });
        }

        let message = message.unwrap_or_else(|| {
            format!(
                "Merge branch '{source_branch}' into {} ({strategy})",
                self.current_branch
            )
        });
        let mut metadata = Map::new();
        metadata.insert(
            "source_branch".to_string(),
            Value::String(source_branch.to_string()),
        );
        metadata.insert(
            "strategy".to_string(),
            Value::String(strategy.to_string()),
        );

        let version = Version::new(merged.clone(), message, Some(target_head_id), metadata);
        let id = self.insert_version(version);
        self.set_current_head(id.clone());
        self.working_content = merged.clone();
        self.dirty = false;

        Ok(MergeResult {
            success: true,
            new_version_id: Some(id),
            conflicts: Vec::new(),
            merged_content: merged,
            details: None,
        })
    }

    // ── Pruning ──

    /// Remove the oldest versions until the table is at or below
    /// `max_versions`. Tagged versions and branch HEADs are never
    /// removed. Returns the removed ids.
    pub(crate) fn prune(&mut self, max_versions: usize) -> Vec<VersionId> {
        let heads: HashSet<VersionId> = self
            .branches
            .values()
            .map(|b| b.head_version_id.clone())
            .collect();
        let mut removed = Vec::new();
        while self.versions.len() > max_versions {
            let oldest = self
                .versions
                .values()
                .filter(|v| v.tags.is_empty() && !heads.contains(&v.id))
                .min_by_key(|v| v.timestamp)
                .map(|v| v.id.clone());
            match oldest {
                Some(id) => {
                    self.versions.remove(&id);
                    removed.push(id);
                }
                None => break,
            }
        }
        removed
    }

    // ── Export ──

    /// The stable interop shape consumed by persistence collaborators.
    pub fn export(&self) -> BufferExport {
        let mut versions: Vec<Version> = self.versions.values().cloned().collect();
        versions.sort_by_key(|v| v.timestamp);
        BufferExport {
            name: self.name.clone(),
            current_branch: self.current_branch.clone(),
            branches: self.list_branches(),
            versions,
            working_content: self.working_content.clone(),
            dirty: self.dirty,
        }
    }

    /// Rebuild a buffer from its export form, checking referential
    /// integrity before installing anything.
    pub(crate) fn from_export(export: BufferExport) -> Result<Self> {
        let versions: HashMap<VersionId, Version> = export
            .versions
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();
        let branches: HashMap<BranchName, Branch> = export
            .branches
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();

        if !branches.contains_key(&export.current_branch) {
            return Err(EngineError::BranchNotFound(export.current_branch));
        }
        for branch in branches.values() {
            if !versions.contains_key(&branch.head_version_id) {
                return Err(EngineError::RefNotFound(branch.head_version_id.clone()));
            }
        }

        Ok(Self {
            id: new_buffer_id(),
            name: export.name,
            current_branch: export.current_branch,
            working_content: export.working_content,
            dirty: export.dirty,
            versions,
            branches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(ids: &[&str]) -> Vec<Item> {
        ids.iter().map(|id| json!({"id": id})).collect()
    }

    #[test]
    fn create_seeds_initial_commit_on_main() {
        let buffer = Buffer::create("t", items(&["1"]));
        assert_eq!(buffer.current_branch(), "main");
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.version_count(), 1);
        let history = buffer.history(None);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "Initial commit");
        assert!(history[0].parent_id.is_none());
        assert_eq!(history[0].content, items(&["1"]));
    }

    #[test]
    fn commit_advances_head_and_clears_dirty() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        buffer.append(items(&["2"]), 1000).unwrap();
        assert!(buffer.is_dirty());
        let version = buffer.commit("add 2", Map::new()).unwrap();
        assert!(!buffer.is_dirty());
        assert_eq!(version.content, items(&["1", "2"]));
        let history = buffer.history(None);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, version.id);
        assert_eq!(history[1].message, "Initial commit");
    }

    #[test]
    fn commit_without_changes_is_refused() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        let err = buffer.commit("noop", Map::new()).unwrap_err();
        assert!(matches!(err, EngineError::NothingToCommit(_)));
    }

    #[test]
    fn committed_content_is_isolated_from_working_mutation() {
        let mut buffer = Buffer::create("t", Vec::new());
        buffer
            .set_working(vec![json!({"id": "1", "text": "original"})], 1000)
            .unwrap();
        let version = buffer.commit("c1", Map::new()).unwrap();

        // Mutate through the working path and re-read the stored version.
        buffer
            .set_working(vec![json!({"id": "1", "text": "changed"})], 1000)
            .unwrap();
        let stored = buffer.get_version(&version.id).unwrap();
        assert_eq!(stored.content[0]["text"], "original");
    }

    #[test]
    fn append_empty_does_not_dirty() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        buffer.append(Vec::new(), 1000).unwrap();
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn capacity_rejection_leaves_state_intact() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        let err = buffer.set_working(items(&["a", "b", "c"]), 2).unwrap_err();
        assert!(matches!(err, EngineError::CapacityExceeded { .. }));
        assert_eq!(buffer.working_content(), items(&["1"]));
        assert!(!buffer.is_dirty());

        let err = buffer.append(items(&["x", "y"]), 2).unwrap_err();
        assert!(matches!(
            err,
            EngineError::CapacityExceeded {
                requested: 3,
                limit: 2
            }
        ));
        assert_eq!(buffer.working_content(), items(&["1"]));
    }

    #[test]
    fn tag_resolves_through_single_ref_path() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        let initial = buffer.history(None)[0].clone();
        buffer.tag(&initial.id, "v1").unwrap();
        let by_tag = buffer.get_version("v1").unwrap();
        assert_eq!(by_tag.id, initial.id);

        // Tags are themselves valid refs for further tagging.
        buffer.tag("v1", "stable").unwrap();
        assert_eq!(buffer.get_version("stable").unwrap().id, initial.id);
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        let initial = buffer.history(None)[0].id.clone();
        buffer.tag(&initial, "v1").unwrap();
        let err = buffer.tag(&initial, "v1").unwrap_err();
        assert!(matches!(err, EngineError::TagExists(_)));
    }

    #[test]
    fn tag_on_unknown_ref_fails() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        let err = buffer.tag("nope", "v1").unwrap_err();
        assert!(matches!(err, EngineError::RefNotFound(_)));
    }

    #[test]
    fn history_respects_limit() {
        let mut buffer = Buffer::create("t", Vec::new());
        for i in 0..5 {
            buffer.set_working(items(&[&i.to_string()]), 1000).unwrap();
            buffer.commit(format!("c{i}"), Map::new()).unwrap();
        }
        assert_eq!(buffer.history(None).len(), 6);
        assert_eq!(buffer.history(Some(2)).len(), 2);
        assert_eq!(buffer.history(Some(2))[0].message, "c4");
    }

    #[test]
    fn checkout_previews_without_moving_head() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        let initial = buffer.history(None)[0].id.clone();
        buffer.append(items(&["2"]), 1000).unwrap();
        let head = buffer.commit("add 2", Map::new()).unwrap();

        buffer.checkout(&initial).unwrap();
        assert_eq!(buffer.working_content(), items(&["1"]));
        assert!(!buffer.is_dirty());
        // HEAD still at the newer commit.
        assert_eq!(buffer.history(Some(1))[0].id, head.id);
    }

    #[test]
    fn checkout_unknown_ref_fails() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        assert!(matches!(
            buffer.checkout("missing").unwrap_err(),
            EngineError::RefNotFound(_)
        ));
    }

    #[test]
    fn rollback_moves_head_and_restores_content() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        buffer.append(items(&["2"]), 1000).unwrap();
        buffer.commit("add 2", Map::new()).unwrap();

        let version = buffer.rollback(1).unwrap();
        assert_eq!(buffer.working_content().len(), 1);
        assert_eq!(buffer.working_content(), version.content);
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.history(None)[0].message, "Initial commit");
    }

    #[test]
    fn rollback_past_root_fails() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        let err = buffer.rollback(2).unwrap_err();
        assert!(matches!(
            err,
            EngineError::CannotRollback {
                steps: 2,
                available: 0
            }
        ));
        // State untouched.
        assert_eq!(buffer.history(None).len(), 1);
    }

    #[test]
    fn discard_restores_head_content() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        buffer.append(items(&["2"]), 1000).unwrap();
        buffer.discard_changes();
        assert_eq!(buffer.working_content(), items(&["1"]));
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.version_count(), 1);
    }

    #[test]
    fn branch_forks_at_current_head() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        let head = buffer.history(None)[0].id.clone();
        let branch = buffer.create_branch("feat", None, 10).unwrap();
        assert_eq!(branch.head_version_id, head);
        assert_eq!(branch.parent_branch.as_deref(), Some("main"));
    }

    #[test]
    fn branch_limit_and_duplicates() {
        let mut buffer = Buffer::create("t", Vec::new());
        buffer.create_branch("a", None, 2).unwrap();
        assert!(matches!(
            buffer.create_branch("a", None, 2).unwrap_err(),
            EngineError::BranchExists(_)
        ));
        assert!(matches!(
            buffer.create_branch("b", None, 2).unwrap_err(),
            EngineError::BranchLimitExceeded { limit: 2 }
        ));
    }

    #[test]
    fn switch_refuses_dirty_state() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        buffer.create_branch("feat", None, 10).unwrap();
        buffer.append(items(&["2"]), 1000).unwrap();
        assert!(matches!(
            buffer.switch_branch("feat").unwrap_err(),
            EngineError::DirtyState(_)
        ));
        // Same-branch switch is a no-op even while dirty.
        buffer.switch_branch("main").unwrap();
        assert!(buffer.is_dirty());
    }

    #[test]
    fn branches_diverge_independently() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        buffer.create_branch("f", None, 10).unwrap();
        buffer.switch_branch("f").unwrap();
        buffer.append(items(&["x"]), 1000).unwrap();
        buffer.commit("add x", Map::new()).unwrap();

        buffer.switch_branch("main").unwrap();
        assert_eq!(buffer.working_content(), items(&["1"]));
        assert_eq!(buffer.history(None).len(), 1);
    }

    #[test]
    fn delete_branch_rules() {
        let mut buffer = Buffer::create("t", Vec::new());
        buffer.create_branch("feat", None, 10).unwrap();
        assert!(matches!(
            buffer.delete_branch("missing").unwrap_err(),
            EngineError::BranchNotFound(_)
        ));
        assert!(matches!(
            buffer.delete_branch("main").unwrap_err(),
            EngineError::IsCurrentBranch(_)
        ));
        buffer.switch_branch("feat").unwrap();
        assert!(matches!(
            buffer.delete_branch("main").unwrap_err(),
            EngineError::CannotDeleteMain
        ));
        assert!(matches!(
            buffer.delete_branch("feat").unwrap_err(),
            EngineError::IsCurrentBranch(_)
        ));
        buffer.switch_branch("main").unwrap();
        buffer.delete_branch("feat").unwrap();
        assert!(buffer.get_branch("feat").is_none());
        // Versions reachable from the deleted branch remain in the table.
        assert_eq!(buffer.version_count(), 1);
    }

    #[test]
    fn merge_same_head_is_already_up_to_date() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        buffer.create_branch("f", None, 10).unwrap();
        let result = buffer.merge_from("f", None, MergeStrategy::Auto).unwrap();
        assert!(result.success);
        assert!(result.new_version_id.is_none());
        assert_eq!(result.details.as_deref(), Some("already up to date"));
        assert_eq!(buffer.version_count(), 1);
    }

    #[test]
    fn merge_conflict_creates_no_version() {
        let mut buffer = Buffer::create("t", vec![json!({"id": "1", "text": "base"})]);
        buffer.create_branch("f", None, 10).unwrap();

        buffer.switch_branch("f").unwrap();
        buffer
            .set_working(vec![json!({"id": "1", "text": "from f"})], 1000)
            .unwrap();
        buffer.commit("f change", Map::new()).unwrap();

        buffer.switch_branch("main").unwrap();
        buffer
            .set_working(vec![json!({"id": "1", "text": "from main"})], 1000)
            .unwrap();
        buffer.commit("main change", Map::new()).unwrap();

        let versions_before = buffer.version_count();
        let result = buffer.merge_from("f", None, MergeStrategy::Auto).unwrap();
        assert!(!result.success);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].index, 0);
        assert_eq!(buffer.version_count(), versions_before);
        // Provisional content keeps the target value.
        assert_eq!(result.merged_content[0]["text"], "from main");
    }

    #[test]
    fn clean_auto_merge_commits_with_metadata() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        buffer.create_branch("f", None, 10).unwrap();

        buffer.switch_branch("f").unwrap();
        buffer.append(items(&["2"]), 1000).unwrap();
        buffer.commit("add 2", Map::new()).unwrap();

        buffer.switch_branch("main").unwrap();
        let result = buffer.merge_from("f", None, MergeStrategy::Auto).unwrap();
        assert!(result.success);
        let id = result.new_version_id.unwrap();
        let merged = buffer.get_version(&id).unwrap();
        assert_eq!(merged.content, items(&["1", "2"]));
        assert_eq!(merged.metadata["source_branch"], "f");
        assert_eq!(merged.metadata["strategy"], "auto");
        assert_eq!(buffer.working_content(), items(&["1", "2"]));
        assert!(!buffer.is_dirty());
        // Source branch HEAD is untouched.
        let source = buffer.get_branch("f").unwrap();
        assert_ne!(source.head_version_id, id);
    }

    #[test]
    fn merge_ours_into_self_is_idempotent() {
        let mut buffer = Buffer::create("t", items(&["1", "2"]));
        buffer.create_branch("f", None, 10).unwrap();
        buffer.switch_branch("f").unwrap();
        let result = buffer.merge_from("f", None, MergeStrategy::Ours).unwrap();
        assert!(result.success);
        assert_eq!(result.merged_content, items(&["1", "2"]));
        assert_eq!(buffer.working_content(), items(&["1", "2"]));
    }

    #[test]
    fn merge_union_dedups() {
        let mut buffer = Buffer::create("t", items(&["1", "2"]));
        buffer.create_branch("f", None, 10).unwrap();
        buffer.switch_branch("f").unwrap();
        buffer.set_working(items(&["2", "3"]), 1000).unwrap();
        buffer.commit("f content", Map::new()).unwrap();
        buffer.switch_branch("main").unwrap();

        let result = buffer.merge_from("f", None, MergeStrategy::Union).unwrap();
        assert!(result.success);
        assert_eq!(result.merged_content, items(&["1", "2", "3"]));
    }

    #[test]
    fn prune_removes_oldest_unprotected() {
        let mut buffer = Buffer::create("t", items(&["0"]));
        let initial = buffer.history(None)[0].id.clone();
        buffer.tag(&initial, "genesis").unwrap();

        for i in 1..=6 {
            buffer.set_working(items(&[&i.to_string()]), 1000).unwrap();
            buffer.commit(format!("c{i}"), Map::new()).unwrap();
        }
        assert_eq!(buffer.version_count(), 7);

        let removed = buffer.prune(3);
        assert_eq!(buffer.version_count(), 3);
        assert_eq!(removed.len(), 4);
        // Tagged initial version and the branch HEAD survive.
        assert!(buffer.get_version("genesis").is_some());
        assert!(buffer.get_version(&buffer.history(Some(1))[0].id.clone()).is_some());
        assert!(!removed.contains(&initial));
    }

    #[test]
    fn prune_stops_when_only_protected_remain() {
        let mut buffer = Buffer::create("t", items(&["0"]));
        let initial = buffer.history(None)[0].id.clone();
        buffer.tag(&initial, "keep").unwrap();
        buffer.set_working(items(&["1"]), 1000).unwrap();
        buffer.commit("c1", Map::new()).unwrap();

        // Limit of zero: both versions are protected, nothing is removed.
        let removed = buffer.prune(0);
        assert!(removed.is_empty());
        assert_eq!(buffer.version_count(), 2);
    }

    #[test]
    fn export_import_roundtrip() {
        let mut buffer = Buffer::create("t", items(&["1"]));
        buffer.append(items(&["2"]), 1000).unwrap();
        buffer.commit("add 2", Map::new()).unwrap();
        buffer.create_branch("feat", Some("wip".to_string()), 10).unwrap();
        buffer.append(items(&["3"]), 1000).unwrap();

        let export = buffer.export();
        let restored = Buffer::from_export(export).unwrap();
        assert_eq!(restored.name(), "t");
        assert_eq!(restored.working_content(), buffer.working_content());
        assert_eq!(restored.version_count(), buffer.version_count());
        assert_eq!(restored.branch_count(), buffer.branch_count());
        assert_eq!(restored.current_branch(), buffer.current_branch());
        assert_eq!(restored.is_dirty(), buffer.is_dirty());
    }

    #[test]
    fn import_rejects_dangling_branch_head() {
        let buffer = Buffer::create("t", items(&["1"]));
        let mut export = buffer.export();
        export.branches[0].head_version_id = "0000000".to_string();
        assert!(matches!(
            Buffer::from_export(export).unwrap_err(),
            EngineError::RefNotFound(_)
        ));
    }

    #[test]
    fn import_rejects_unknown_current_branch() {
        let buffer = Buffer::create("t", items(&["1"]));
        let mut export = buffer.export();
        export.current_branch = "ghost".to_string();
        assert!(matches!(
            Buffer::from_export(export).unwrap_err(),
            EngineError::BranchNotFound(_)
        ));
    }
}
