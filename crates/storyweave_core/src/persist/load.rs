//! Project loading.
//!
//! # Responsibility
//! - Read `index.json` and every entity directory into one `Document`.
//! - Capture the `index.json` mtime as the optimistic-concurrency baseline.
//!
//! # Invariants
//! - File-backed records replace inline `index.json` maps for that kind.
//! - The returned document has passed `validate_document`.

use super::fs_io::{io_error, list_entity_files, mtime_millis};
use super::layout::{entity_file_name, ProjectLayout, INDEX_FILE};
use super::wire::{PersistedIndex, PersistedStory};
use super::{PersistError, PersistResult};
use crate::model::document::Document;
use crate::model::entity::{EntityKind, EntityRecord};
use crate::model::new_entity_id;
use crate::schema::{validate_document, ValidationError};
use crate::store::entity_store::{EntityStore, EntityStores};
use crate::store::tree_store::TreeStore;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// A loaded, validated project.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub document: Document,
    /// `index.json` mtime in epoch milliseconds, read before its content.
    pub last_modified: i64,
    /// Structural records dropped because no tree node referenced them.
    pub pruned_orphans: Vec<(EntityKind, String)>,
}

/// Loads the project rooted at `root`.
///
/// # Errors
/// - `MalformedProject` when `index.json` is missing or not a JSON object.
/// - `SchemaViolation` when any file does not match the document schema,
///   a record id differs from its file stem, or a node has no record.
/// - `Io` when an entity directory or file cannot be read.
///
/// # Side effects
/// - Emits `project_load` logging events with counts and duration.
pub fn load_project(root: impl AsRef<Path>) -> PersistResult<LoadedProject> {
    let started_at = Instant::now();
    info!("event=project_load module=persist status=start");

    let layout = ProjectLayout::new(root.as_ref());
    match load_inner(&layout) {
        Ok(loaded) => {
            info!(
                "event=project_load module=persist status=ok nodes={} records={} pruned={} duration_ms={}",
                loaded.document.tree().len(),
                loaded.document.entities().total_len(),
                loaded.pruned_orphans.len(),
                started_at.elapsed().as_millis()
            );
            Ok(loaded)
        }
        Err(err) => {
            error!(
                "event=project_load module=persist status=error duration_ms={} error_code={}",
                started_at.elapsed().as_millis(),
                err.code()
            );
            Err(err)
        }
    }
}

fn load_inner(layout: &ProjectLayout) -> PersistResult<LoadedProject> {
    let index_path = layout.index_path();
    let malformed = |reason: String| PersistError::MalformedProject {
        path: index_path.clone(),
        reason,
    };

    let Some(last_modified) = mtime_millis(&index_path)? else {
        return Err(malformed(format!("{INDEX_FILE} not found")));
    };
    let raw = fs::read_to_string(&index_path).map_err(|err| malformed(err.to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|err| malformed(format!("invalid json: {err}")))?;
    if !value.is_object() {
        return Err(malformed("top-level value is not an object".to_string()));
    }
    let index: PersistedIndex =
        serde_json::from_value(value).map_err(|err| shape_error(INDEX_FILE.to_string(), err))?;

    let PersistedIndex { story, language } = index;
    let PersistedStory {
        structure,
        item,
        scene,
        book,
        arc,
        chapter,
        characters,
        locations,
        plot_points,
        mut meta,
    } = story;

    if meta.id.trim().is_empty() {
        meta.id = new_entity_id();
        info!("event=project_load module=persist status=assigned_story_id");
    }

    let entities = EntityStores {
        item: read_kind(layout, item)?,
        scene: read_kind(layout, scene)?,
        book: read_kind(layout, book)?,
        arc: read_kind(layout, arc)?,
        chapter: read_kind(layout, chapter)?,
        characters: read_kind(layout, characters)?,
        locations: read_kind(layout, locations)?,
        plot_points: read_kind(layout, plot_points)?,
        languages: read_kind(layout, language.languages)?,
    };

    let tree = TreeStore::from_forest(structure)
        .map_err(|err| PersistError::SchemaViolation(ValidationError::Tree(err)))?;
    let mut document = Document::from_parts(meta, tree, entities);

    let pruned_orphans = document.prune_orphan_records();
    for (kind, id) in &pruned_orphans {
        warn!("event=project_load module=persist status=pruned_orphan kind={kind} id={id}");
    }

    validate_document(&document)?;
    Ok(LoadedProject {
        document,
        last_modified,
        pruned_orphans,
    })
}

/// Reads `<kind>/*.json`, or falls back to the inline map when the
/// directory does not exist yet.
fn read_kind<T: EntityRecord>(
    layout: &ProjectLayout,
    inline: Option<BTreeMap<String, T>>,
) -> PersistResult<EntityStore<T>> {
    let dir = layout.kind_dir(T::KIND);
    let Some(files) = list_entity_files(&dir)? else {
        return Ok(EntityStore::from_map(inline.unwrap_or_default()));
    };
    if inline.as_ref().is_some_and(|map| !map.is_empty()) {
        debug!(
            "event=project_load module=persist status=inline_replaced kind={}",
            T::KIND
        );
    }

    let mut records = BTreeMap::new();
    for (id, path) in files {
        let location = format!("{}/{}", T::KIND.dir_name(), entity_file_name(&id));
        let raw = fs::read_to_string(&path).map_err(io_error(&path))?;
        let record: T = serde_json::from_str(&raw).map_err(|err| shape_error(location, err))?;
        if record.id() != id {
            return Err(PersistError::SchemaViolation(ValidationError::KeyMismatch {
                kind: T::KIND,
                key: id,
                id: record.id().to_string(),
            }));
        }
        records.insert(id, record);
    }
    Ok(EntityStore::from_map(records))
}

fn shape_error(location: String, err: serde_json::Error) -> PersistError {
    PersistError::SchemaViolation(ValidationError::Shape {
        location,
        message: err.to_string(),
    })
}
