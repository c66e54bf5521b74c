//! On-disk project layout.

use crate::model::entity::EntityKind;
use std::path::{Path, PathBuf};

/// Tree, metadata and settings file at the project root.
pub const INDEX_FILE: &str = "index.json";
/// Directory holding timestamped autosave snapshots.
pub const AUTOSAVE_DIR: &str = "autosave";
/// Directory holding pruned entity files.
pub const TRASH_DIR: &str = "trash";

const ENTITY_FILE_EXT: &str = "json";

/// Path builder for one project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    pub fn entity_path(&self, kind: EntityKind, id: &str) -> PathBuf {
        self.kind_dir(kind).join(entity_file_name(id))
    }

    pub fn autosave_dir(&self) -> PathBuf {
        self.root.join(AUTOSAVE_DIR)
    }

    pub fn trash_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(TRASH_DIR).join(kind.dir_name())
    }
}

/// `<id>.json`
pub fn entity_file_name(id: &str) -> String {
    format!("{id}.{ENTITY_FILE_EXT}")
}

/// Record id for an entity file name, or `None` for files the loader ignores
/// (dot-files, temp files, other extensions).
pub fn entity_id_from_file_name(file_name: &str) -> Option<&str> {
    if file_name.starts_with('.') {
        return None;
    }
    let stem = file_name.strip_suffix(ENTITY_FILE_EXT)?.strip_suffix('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(stem)
}
