use serde::{Deserialize, Serialize};

use crate::types::Item;

/// A positional modification: same index on both sides, unequal items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffEntry {
    pub index: usize,
    pub before: Item,
    pub after: Item,
}

/// A positional two-snapshot comparison (not a text diff). Derived, never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diff {
    pub from_version: String,
    pub to_version: String,
    pub added: Vec<Item>,
    pub removed: Vec<Item>,
    pub modified: Vec<DiffEntry>,
    pub summary: String,
}

/// Compare two snapshots position by position.
///
/// Shared indices with unequal items are modifications; the tail of the
/// longer side is `added` (when `to` is longer) or `removed` (when `from`
/// is longer).
pub fn diff_contents(from: &[Item], to: &[Item], from_ref: &str, to_ref: &str) -> Diff {
    let n = from.len().min(to.len());

    let mut modified = Vec::new();
    for i in 0..n {
        if from[i] != to[i] {
            modified.push(DiffEntry {
                index: i,
                before: from[i].clone(),
                after: to[i].clone(),
            });
        }
    }

    let added: Vec<Item> = to[n..].to_vec();
    let removed: Vec<Item> = from[n..].to_vec();

    let summary = format!(
        "+{} added, -{} removed, ~{} modified",
        added.len(),
        removed.len(),
        modified.len()
    );

    Diff {
        from_version: from_ref.to_string(),
        to_version: to_ref.to_string(),
        added,
        removed,
        modified,
        summary,
    }
}
