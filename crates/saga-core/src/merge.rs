use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Item, VersionId};

/// Conflict-resolution strategy for merging one branch into another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Positional walk over both heads; unequal shared indices conflict.
    #[default]
    Auto,
    /// Keep the target branch content unchanged.
    Ours,
    /// Take the source branch content in full.
    Theirs,
    /// Target content then source content, de-duplicated by deep equality.
    Union,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Auto => "auto",
            MergeStrategy::Ours => "ours",
            MergeStrategy::Theirs => "theirs",
            MergeStrategy::Union => "union",
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(MergeStrategy::Auto),
            "ours" => Ok(MergeStrategy::Ours),
            "theirs" => Ok(MergeStrategy::Theirs),
            "union" => Ok(MergeStrategy::Union),
            other => Err(format!("unknown merge strategy: {other}")),
        }
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positional disagreement between the two branch heads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub index: usize,
    pub target_value: Item,
    pub source_value: Item,
}

/// Outcome of a merge attempt. Derived, never stored (except for the new
/// version it may create).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_version_id: Option<VersionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<Conflict>,
    pub merged_content: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Combine the target head content (`base`) with the source head content
/// (`other`) under a strategy. Only `Auto` can produce conflicts; on a
/// conflicting index the target value is kept in the provisional result.
pub fn combine(
    base: &[Item],
    other: &[Item],
    strategy: MergeStrategy,
) -> (Vec<Item>, Vec<Conflict>) {
    match strategy {
        MergeStrategy::Ours => (base.to_vec(), Vec::new()),
        MergeStrategy::Theirs => (other.to_vec(), Vec::new()),
        MergeStrategy::Union => {
            let mut merged: Vec<Item> = Vec::new();
            for item in base.iter().chain(other.iter()) {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            (merged, Vec::new())
        }
        MergeStrategy::Auto => {
            let mut merged = Vec::new();
            let mut conflicts = Vec::new();
            for i in 0..base.len().max(other.len()) {
                match (base.get(i), other.get(i)) {
                    (Some(b), Some(o)) if b == o => merged.push(b.clone()),
                    (Some(b), Some(o)) => {
                        conflicts.push(Conflict {
                            index: i,
                            target_value: b.clone(),
                            source_value: o.clone(),
                        });
                        merged.push(b.clone());
                    }
                    (Some(b), None) => merged.push(b.clone()),
                    (None, Some(o)) => merged.push(o.clone()),
                    (None, None) => {}
                }
            }
            (merged, conflicts)
        }
    }
}
