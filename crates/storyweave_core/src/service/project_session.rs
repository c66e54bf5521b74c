//! Open-project session.
//!
//! # Responsibility
//! - Own one loaded `Document` together with its on-disk location.
//! - Carry the optimistic-concurrency baseline between saves.
//!
//! # Invariants
//! - The baseline only advances after a successful load or save.
//! - A failed save or reload leaves document and baseline untouched.

use crate::model::document::Document;
use crate::model::entity::EntityKind;
use crate::persist::{
    create_project, load_project, save_project, PersistOptions, PersistResult,
};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// One open project: document, path, and mtime baseline.
#[derive(Debug)]
pub struct ProjectSession {
    root: PathBuf,
    document: Document,
    expected_last_modified: i64,
    options: PersistOptions,
    pruned_on_load: Vec<(EntityKind, String)>,
}

impl ProjectSession {
    /// Loads the project at `root`.
    pub fn open(root: impl Into<PathBuf>, options: PersistOptions) -> PersistResult<Self> {
        let root = root.into();
        let loaded = load_project(&root)?;
        info!(
            "event=session_open module=service status=ok last_modified={}",
            loaded.last_modified
        );
        Ok(Self {
            root,
            document: loaded.document,
            expected_last_modified: loaded.last_modified,
            options,
            pruned_on_load: loaded.pruned_orphans,
        })
    }

    /// Writes `document` as a new project at `root` and opens it.
    pub fn create(
        root: impl Into<PathBuf>,
        document: Document,
        options: PersistOptions,
    ) -> PersistResult<Self> {
        let root = root.into();
        let expected_last_modified = create_project(&root, &document, &options)?;
        Ok(Self {
            root,
            document,
            expected_last_modified,
            options,
            pruned_on_load: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn expected_last_modified(&self) -> i64 {
        self.expected_last_modified
    }

    pub fn options(&self) -> &PersistOptions {
        &self.options
    }

    /// Orphan records dropped by the most recent load.
    pub fn pruned_on_load(&self) -> &[(EntityKind, String)] {
        &self.pruned_on_load
    }

    /// Saves the document. On success the returned mtime becomes the new
    /// baseline; on `Conflict` the caller should offer `reload`.
    pub fn save(&mut self, new_autosave: bool) -> PersistResult<i64> {
        let last_modified = save_project(
            &self.root,
            &self.document,
            self.expected_last_modified,
            new_autosave,
            &self.options,
        )?;
        debug!(
            "event=session_save module=service status=ok previous={} last_modified={last_modified}",
            self.expected_last_modified
        );
        self.expected_last_modified = last_modified;
        Ok(last_modified)
    }

    /// Discards in-memory state and reloads from disk.
    ///
    /// Queues `DocumentEvent::Replaced` on success.
    pub fn reload(&mut self) -> PersistResult<()> {
        let loaded = load_project(&self.root)?;
        self.document.replace_with(loaded.document);
        self.expected_last_modified = loaded.last_modified;
        self.pruned_on_load = loaded.pruned_orphans;
        info!(
            "event=session_reload module=service status=ok last_modified={}",
            loaded.last_modified
        );
        Ok(())
    }
}
