//! Project saving.
//!
//! # Responsibility
//! - Write every record to `<kind>/<id>.json` and prune files of deleted ids.
//! - Write the stripped `index.json` last and return its new mtime.
//!
//! # Invariants
//! - Nothing is written when validation or the mtime check fails.
//! - `index.json` never carries entity maps after a save.

use super::fs_io::{io_error, list_entity_files, move_to_trash, mtime_millis, write_json};
use super::layout::ProjectLayout;
use super::snapshot::take_snapshot;
use super::wire::PersistedIndex;
use super::{PersistError, PersistOptions, PersistResult};
use crate::model::document::Document;
use crate::model::entity::EntityRecord;
use crate::schema::validate_document;
use crate::store::entity_store::{EntityStore, EntityStores};
use log::{debug, error, info, warn};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
struct WriteStats {
    written: usize,
    pruned: usize,
}

impl std::ops::AddAssign for WriteStats {
    fn add_assign(&mut self, rhs: Self) {
        self.written += rhs.written;
        self.pruned += rhs.pruned;
    }
}

/// Saves `document` over the project at `root`.
///
/// `expected_last_modified` is the `index.json` mtime observed at the last
/// load or save. When `new_autosave` is set, the previous on-disk state is
/// copied into a retained snapshot first.
///
/// Returns the new `index.json` mtime, the baseline for the next save.
///
/// # Errors
/// - `SchemaViolation` when the document fails validation.
/// - `Conflict` when `index.json` changed (or vanished) since the baseline.
/// - `Io`/`Json` on write failures; earlier files may already be replaced.
pub fn save_project(
    root: impl AsRef<Path>,
    document: &Document,
    expected_last_modified: i64,
    new_autosave: bool,
    options: &PersistOptions,
) -> PersistResult<i64> {
    let started_at = Instant::now();
    let mode = if new_autosave { "autosave" } else { "save" };
    info!("event=project_save module=persist status=start mode={mode}");

    let layout = ProjectLayout::new(root.as_ref());
    let result = save_inner(
        &layout,
        document,
        expected_last_modified,
        new_autosave,
        options,
    );
    match &result {
        Ok((last_modified, stats)) => info!(
            "event=project_save module=persist status=ok mode={mode} written={} pruned={} last_modified={last_modified} duration_ms={}",
            stats.written,
            stats.pruned,
            started_at.elapsed().as_millis()
        ),
        Err(err) if err.is_conflict() => warn!(
            "event=project_save module=persist status=conflict mode={mode} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=project_save module=persist status=error mode={mode} duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
    result.map(|(last_modified, _)| last_modified)
}

/// Writes a brand-new project at `root`. Returns the initial baseline.
///
/// # Errors
/// - `AlreadyExists` when `root` already holds an `index.json`.
pub fn create_project(
    root: impl AsRef<Path>,
    document: &Document,
    options: &PersistOptions,
) -> PersistResult<i64> {
    let layout = ProjectLayout::new(root.as_ref());
    info!("event=project_create module=persist status=start");

    validate_document(document)?;
    let index_path = layout.index_path();
    if mtime_millis(&index_path)?.is_some() {
        warn!("event=project_create module=persist status=error error_code=already_exists");
        return Err(PersistError::AlreadyExists(index_path));
    }
    fs::create_dir_all(layout.root()).map_err(io_error(layout.root()))?;

    let stats = write_entities(&layout, document.entities(), options)?;
    let last_modified = write_index(&layout, document, options)?;
    info!(
        "event=project_create module=persist status=ok written={} last_modified={last_modified}",
        stats.written
    );
    Ok(last_modified)
}

fn save_inner(
    layout: &ProjectLayout,
    document: &Document,
    expected_last_modified: i64,
    new_autosave: bool,
    options: &PersistOptions,
) -> PersistResult<(i64, WriteStats)> {
    validate_document(document)?;

    let actual = mtime_millis(&layout.index_path())?;
    if actual != Some(expected_last_modified) {
        return Err(PersistError::Conflict {
            expected: expected_last_modified,
            actual,
        });
    }

    if new_autosave {
        take_snapshot(layout, options)?;
    }

    let stats = write_entities(layout, document.entities(), options)?;
    let last_modified = write_index(layout, document, options)?;
    Ok((last_modified, stats))
}

fn write_entities(
    layout: &ProjectLayout,
    entities: &EntityStores,
    options: &PersistOptions,
) -> PersistResult<WriteStats> {
    let mut stats = WriteStats::default();
    stats += write_kind(layout, &entities.item, options)?;
    stats += write_kind(layout, &entities.scene, options)?;
    stats += write_kind(layout, &entities.book, options)?;
    stats += write_kind(layout, &entities.arc, options)?;
    stats += write_kind(layout, &entities.chapter, options)?;
    stats += write_kind(layout, &entities.characters, options)?;
    stats += write_kind(layout, &entities.locations, options)?;
    stats += write_kind(layout, &entities.plot_points, options)?;
    stats += write_kind(layout, &entities.languages, options)?;
    Ok(stats)
}

/// Writes every record of one kind, then prunes files of ids no longer held.
fn write_kind<T: EntityRecord>(
    layout: &ProjectLayout,
    store: &EntityStore<T>,
    options: &PersistOptions,
) -> PersistResult<WriteStats> {
    let mut stats = WriteStats::default();
    for (id, record) in store.iter() {
        write_json(&layout.entity_path(T::KIND, id), record, options.durability)?;
        stats.written += 1;
    }

    let Some(files) = list_entity_files(&layout.kind_dir(T::KIND))? else {
        return Ok(stats);
    };
    for (id, path) in files {
        if store.contains(&id) {
            continue;
        }
        if options.trash_pruned_files {
            move_to_trash(&path, &layout.trash_dir(T::KIND))?;
        } else {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(PersistError::Io { path, source }),
            }
        }
        debug!(
            "event=project_save module=persist status=pruned kind={} id={id}",
            T::KIND
        );
        stats.pruned += 1;
    }
    Ok(stats)
}

fn write_index(
    layout: &ProjectLayout,
    document: &Document,
    options: &PersistOptions,
) -> PersistResult<i64> {
    let index_path = layout.index_path();
    write_json(
        &index_path,
        &PersistedIndex::stripped(document),
        options.durability,
    )?;
    mtime_millis(&index_path)?.ok_or_else(|| PersistError::Io {
        path: index_path.clone(),
        source: io::Error::new(io::ErrorKind::NotFound, "index vanished after write"),
    })
}
