use serde::{Deserialize, Serialize};

/// Construction-time options for a [`BufferManager`](crate::BufferManager).
/// All defaults are usable with zero configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Versions kept per buffer before pruning kicks in.
    #[serde(default = "default_max_versions")]
    pub max_versions: usize,
    /// Branches allowed per buffer.
    #[serde(default = "default_max_branches")]
    pub max_branches: usize,
    /// Soft cap on working-content items per buffer.
    #[serde(default = "default_max_buffer_items")]
    pub max_buffer_items: usize,
    /// Emit state transitions at `info` instead of `debug`.
    #[serde(default)]
    pub verbose: bool,
}

fn default_max_versions() -> usize {
    100
}

fn default_max_branches() -> usize {
    10
}

fn default_max_buffer_items() -> usize {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_versions: default_max_versions(),
            max_branches: default_max_branches(),
            max_buffer_items: default_max_buffer_items(),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_versions, 100);
        assert_eq!(config.max_branches, 10);
        assert_eq!(config.max_buffer_items, 1000);
        assert!(!config.verbose);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_versions": 5}"#).unwrap();
        assert_eq!(config.max_versions, 5);
        assert_eq!(config.max_branches, 10);
    }
}
