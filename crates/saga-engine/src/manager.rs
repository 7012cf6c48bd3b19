use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use saga_core::{
    diff_contents, validate_buffer_name, Branch, Diff, EngineError, Item, MergeResult,
    MergeStrategy, Result, Version, VersionId, WORKING_REF,
};

use crate::buffer::Buffer;
use crate::config::EngineConfig;
use crate::export::BufferExport;

/// Point-in-time counters for monitoring and UI collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferStats {
    pub name: String,
    pub item_count: usize,
    pub version_count: usize,
    pub branch_count: usize,
    pub current_branch: String,
}

/// Owns zero or more buffers and exposes the whole engine API, keyed by
/// buffer name.
///
/// The manager is an explicit, externally-owned handle: no process-wide
/// singleton, no interior mutability. `&mut self` on every mutating
/// method is the serialization discipline a multi-threaded host must
/// respect; reads take `&self` and never mutate.
#[derive(Debug, Default)]
pub struct BufferManager {
    config: EngineConfig,
    buffers: HashMap<String, Buffer>,
}

impl BufferManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            buffers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn log(&self, message: &str) {
        if self.config.verbose {
            info!("{message}");
        } else {
            debug!("{message}");
        }
    }

    fn buffer(&self, name: &str) -> Result<&Buffer> {
        self.buffers
            .get(name)
            .ok_or_else(|| EngineError::BufferNotFound(name.to_string()))
    }

    fn buffer_mut(&mut self, name: &str) -> Result<&mut Buffer> {
        self.buffers
            .get_mut(name)
            .ok_or_else(|| EngineError::BufferNotFound(name.to_string()))
    }

    // ── Lifecycle ──

    /// Create a buffer, optionally seeded with initial content. The seed
    /// becomes the "Initial commit" on a fresh `main` branch.
    pub fn create_buffer(
        &mut self,
        name: &str,
        initial_content: Option<Vec<Item>>,
    ) -> Result<&Buffer> {
        validate_buffer_name(name)?;
        if self.buffers.contains_key(name) {
            return Err(EngineError::BufferExists(name.to_string()));
        }
        let initial = initial_content.unwrap_or_default();
        if initial.len() > self.config.max_buffer_items {
            return Err(EngineError::CapacityExceeded {
                requested: initial.len(),
                limit: self.config.max_buffer_items,
            });
        }
        let buffer = Buffer::create(name, initial);
        self.buffers.insert(name.to_string(), buffer);
        self.log(&format!("created buffer {name}"));
        Ok(&self.buffers[name])
    }

    pub fn get_buffer(&self, name: &str) -> Option<&Buffer> {
        self.buffers.get(name)
    }

    pub fn has_buffer(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    /// Remove a buffer. Returns whether it existed.
    pub fn delete_buffer(&mut self, name: &str) -> bool {
        let existed = self.buffers.remove(name).is_some();
        if existed {
            self.log(&format!("deleted buffer {name}"));
        }
        existed
    }

    /// Immutable views of all buffers, ordered by name.
    pub fn list_buffers(&self) -> Vec<&Buffer> {
        let mut buffers: Vec<&Buffer> = self.buffers.values().collect();
        buffers.sort_by(|a, b| a.name().cmp(b.name()));
        buffers
    }

    /// Drop all buffers (test/reset use).
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.log("cleared all buffers");
    }

    // ── Working content ──

    pub fn get_working_content(&self, name: &str) -> Result<Vec<Item>> {
        Ok(self.buffer(name)?.working_content())
    }

    pub fn set_working_content(&mut self, name: &str, items: Vec<Item>) -> Result<()> {
        let max_items = self.config.max_buffer_items;
        self.buffer_mut(name)?.set_working(items, max_items)
    }

    pub fn append_to_buffer(&mut self, name: &str, items: Vec<Item>) -> Result<()> {
        let max_items = self.config.max_buffer_items;
        self.buffer_mut(name)?.append(items, max_items)
    }

    pub fn clear_working_content(&mut self, name: &str) -> Result<()> {
        self.buffer_mut(name)?.clear_working();
        Ok(())
    }

    pub fn is_dirty(&self, name: &str) -> Result<bool> {
        Ok(self.buffer(name)?.is_dirty())
    }

    // ── Version control ──

    /// Commit the working content on the current branch, then prune old
    /// versions past the configured limit.
    pub fn commit(
        &mut self,
        name: &str,
        message: impl Into<String>,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Version> {
        let max_versions = self.config.max_versions;
        let buffer = self.buffer_mut(name)?;
        let version = buffer.commit(message, metadata.unwrap_or_default())?;
        let pruned = buffer.prune(max_versions);
        self.log(&format!(
            "committed {} on {name} (pruned {})",
            version.id,
            pruned.len()
        ));
        Ok(version)
    }

    pub fn tag(&mut self, name: &str, version_ref: &str, tag_name: &str) -> Result<()> {
        self.buffer_mut(name)?.tag(version_ref, tag_name)?;
        self.log(&format!("tagged {version_ref} as {tag_name} in {name}"));
        Ok(())
    }

    pub fn get_history(&self, name: &str, limit: Option<usize>) -> Result<Vec<Version>> {
        Ok(self.buffer(name)?.history(limit))
    }

    pub fn get_version(&self, name: &str, reference: &str) -> Result<Option<Version>> {
        Ok(self.buffer(name)?.get_version(reference))
    }

    // ── Checkout & rollback ──

    pub fn checkout(&mut self, name: &str, reference: &str) -> Result<Vec<Item>> {
        let content = self.buffer_mut(name)?.checkout(reference)?;
        self.log(&format!("checked out {reference} in {name}"));
        Ok(content)
    }

    pub fn rollback(&mut self, name: &str, steps: usize) -> Result<Version> {
        let version = self.buffer_mut(name)?.rollback(steps)?;
        self.log(&format!("rolled back {name} to {}", version.id));
        Ok(version)
    }

    pub fn discard_changes(&mut self, name: &str) -> Result<()> {
        self.buffer_mut(name)?.discard_changes();
        Ok(())
    }

    // ── Branching ──

    pub fn create_branch(
        &mut self,
        name: &str,
        branch_name: &str,
        description: Option<String>,
    ) -> Result<Branch> {
        let max_branches = self.config.max_branches;
        let branch = self
            .buffer_mut(name)?
            .create_branch(branch_name, description, max_branches)?;
        self.log(&format!("created branch {branch_name} in {name}"));
        Ok(branch)
    }

    pub fn switch_branch(&mut self, name: &str, branch_name: &str) -> Result<()> {
        self.buffer_mut(name)?.switch_branch(branch_name)?;
        self.log(&format!("switched {name} to {branch_name}"));
        Ok(())
    }

    pub fn list_branches(&self, name: &str) -> Result<Vec<Branch>> {
        Ok(self.buffer(name)?.list_branches())
    }

    pub fn get_branch(&self, name: &str, branch_name: &str) -> Result<Option<Branch>> {
        Ok(self.buffer(name)?.get_branch(branch_name))
    }

    pub fn delete_branch(&mut self, name: &str, branch_name: &str) -> Result<()> {
        self.buffer_mut(name)?.delete_branch(branch_name)?;
        self.log(&format!("deleted branch {branch_name} in {name}"));
        Ok(())
    }

    // ── Diff ──

    /// Positional diff of two refs. Either side may be a version id, a
    /// tag, or the literal `"working"` for the uncommitted content.
    pub fn diff(&self, name: &str, from_ref: &str, to_ref: &str) -> Result<Diff> {
        let buffer = self.buffer(name)?;
        let (from, from_label) = Self::diff_side(buffer, from_ref)?;
        let (to, to_label) = Self::diff_side(buffer, to_ref)?;
        Ok(diff_contents(&from, &to, &from_label, &to_label))
    }

    /// Diff of the current branch HEAD against the working content.
    pub fn diff_working(&self, name: &str) -> Result<Diff> {
        let head_id = self.buffer(name)?.head_version_id();
        self.diff(name, &head_id, WORKING_REF)
    }

    fn diff_side(buffer: &Buffer, reference: &str) -> Result<(Vec<Item>, String)> {
        if reference == WORKING_REF {
            return Ok((buffer.working_content(), WORKING_REF.to_string()));
        }
        let version = buffer.resolve_ref(reference)?;
        Ok((version.content.clone(), version.id.clone()))
    }

    // ── Merge ──

    /// Merge `source_branch` into the buffer's current branch. A merge
    /// that commits counts as a commit and triggers pruning.
    pub fn merge(
        &mut self,
        name: &str,
        source_branch: &str,
        message: Option<String>,
        strategy: MergeStrategy,
    ) -> Result<MergeResult> {
        let max_versions = self.config.max_versions;
        let buffer = self.buffer_mut(name)?;
        let result = buffer.merge_from(source_branch, message, strategy)?;
        if result.new_version_id.is_some() {
            buffer.prune(max_versions);
        }
        self.log(&format!(
            "merge {source_branch} into {name}: success={} conflicts={}",
            result.success,
            result.conflicts.len()
        ));
        Ok(result)
    }

    // ── Maintenance ──

    /// Prune a buffer directly. Commits invoke this automatically.
    pub fn prune(&mut self, name: &str) -> Result<Vec<VersionId>> {
        let max_versions = self.config.max_versions;
        let removed = self.buffer_mut(name)?.prune(max_versions);
        if !removed.is_empty() {
            self.log(&format!("pruned {} versions from {name}", removed.len()));
        }
        Ok(removed)
    }

    pub fn get_stats(&self, name: &str) -> Result<BufferStats> {
        let buffer = self.buffer(name)?;
        Ok(BufferStats {
            name: buffer.name().to_string(),
            item_count: buffer.item_count(),
            version_count: buffer.version_count(),
            branch_count: buffer.branch_count(),
            current_branch: buffer.current_branch().to_string(),
        })
    }

    // ── Export / import ──

    pub fn export(&self, name: &str) -> Result<BufferExport> {
        Ok(self.buffer(name)?.export())
    }

    /// Load a buffer from its export form under the exported name.
    pub fn import(&mut self, export: BufferExport) -> Result<&Buffer> {
        let name = export.name.clone();
        if self.buffers.contains_key(&name) {
            return Err(EngineError::BufferExists(name));
        }
        let buffer = Buffer::from_export(export)?;
        self.buffers.insert(name.clone(), buffer);
        self.log(&format!("imported buffer {name}"));
        Ok(&self.buffers[&name])
    }
}
