//! Persistence tuning knobs.

use serde::{Deserialize, Serialize};

const DEFAULT_AUTOSAVE_RETENTION: usize = 8;

/// How hard file writes try to reach stable storage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteDurability {
    /// Temp file plus atomic rename, no fsync.
    #[default]
    BestEffort,
    /// Temp file, fsync, rename, then a best-effort directory fsync.
    Durable,
}

/// Options consumed by save and snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistOptions {
    /// Number of autosave snapshots kept; older ones are deleted.
    pub autosave_retention: usize,
    /// Move pruned entity files to `trash/<kind>/` instead of deleting them.
    pub trash_pruned_files: bool,
    pub durability: WriteDurability,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            autosave_retention: DEFAULT_AUTOSAVE_RETENTION,
            trash_pruned_files: true,
            durability: WriteDurability::default(),
        }
    }
}

impl PersistOptions {
    /// Parses options from JSON. Missing fields take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{PersistOptions, WriteDurability};

    #[test]
    fn partial_json_keeps_defaults() {
        let options = PersistOptions::from_json_str(r#"{"durability":"durable"}"#).unwrap();
        assert_eq!(options.durability, WriteDurability::Durable);
        assert_eq!(options.autosave_retention, 8);
        assert!(options.trash_pruned_files);
    }

    #[test]
    fn unknown_durability_is_rejected() {
        assert!(PersistOptions::from_json_str(r#"{"durability":"paranoid"}"#).is_err());
    }
}
