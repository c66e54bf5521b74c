//! Rolling autosave snapshots under `autosave/<epoch-millis>/`.

use super::fs_io::{copy_dir_files, io_error};
use super::layout::{ProjectLayout, INDEX_FILE};
use super::{PersistError, PersistOptions, PersistResult};
use crate::clock::now_millis;
use crate::model::entity::EntityKind;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub path: PathBuf,
    /// Epoch milliseconds encoded in the directory name.
    pub taken_at: i64,
}

/// Snapshots of the project at `root`, newest first.
///
/// Entries whose name is not an integer are ignored.
pub fn list_snapshots(root: impl AsRef<Path>) -> PersistResult<Vec<SnapshotInfo>> {
    let layout = ProjectLayout::new(root.as_ref());
    list_in(&layout.autosave_dir())
}

/// Copies the current on-disk project (index plus kind directories) into a
/// new snapshot, then drops snapshots beyond `autosave_retention`.
///
/// Returns `None` when there is nothing to snapshot or retention is zero.
pub(crate) fn take_snapshot(
    layout: &ProjectLayout,
    options: &PersistOptions,
) -> PersistResult<Option<SnapshotInfo>> {
    if options.autosave_retention == 0 {
        return Ok(None);
    }
    let index_path = layout.index_path();
    if !index_path.is_file() {
        return Ok(None);
    }

    let autosave_dir = layout.autosave_dir();
    fs::create_dir_all(&autosave_dir).map_err(io_error(&autosave_dir))?;
    let (path, taken_at) = claim_snapshot_dir(&autosave_dir, now_millis())?;

    let index_copy = path.join(INDEX_FILE);
    fs::copy(&index_path, &index_copy).map_err(io_error(&index_copy))?;
    let mut files = 1;
    for kind in EntityKind::ALL {
        files += copy_dir_files(&layout.kind_dir(kind), &path.join(kind.dir_name()))?;
    }
    info!("event=autosave_snapshot module=persist status=ok taken_at={taken_at} files={files}");

    enforce_retention(&autosave_dir, options.autosave_retention)?;
    Ok(Some(SnapshotInfo { path, taken_at }))
}

fn claim_snapshot_dir(autosave_dir: &Path, now_ms: i64) -> PersistResult<(PathBuf, i64)> {
    let mut taken_at = now_ms;
    loop {
        let candidate = autosave_dir.join(taken_at.to_string());
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((candidate, taken_at)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => taken_at += 1,
            Err(source) => {
                return Err(PersistError::Io {
                    path: candidate,
                    source,
                })
            }
        }
    }
}

fn enforce_retention(autosave_dir: &Path, retention: usize) -> PersistResult<()> {
    for stale in list_in(autosave_dir)?.into_iter().skip(retention) {
        fs::remove_dir_all(&stale.path).map_err(io_error(&stale.path))?;
        debug!(
            "event=autosave_snapshot module=persist status=expired taken_at={}",
            stale.taken_at
        );
    }
    Ok(())
}

fn list_in(autosave_dir: &Path) -> PersistResult<Vec<SnapshotInfo>> {
    let entries = match fs::read_dir(autosave_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(PersistError::Io {
                path: autosave_dir.to_path_buf(),
                source,
            })
        }
    };

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_error(autosave_dir))?;
        if !entry.file_type().map_err(io_error(&entry.path()))?.is_dir() {
            continue;
        }
        let Some(taken_at) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<i64>().ok())
        else {
            continue;
        };
        snapshots.push(SnapshotInfo {
            path: entry.path(),
            taken_at,
        });
    }
    snapshots.sort_by(|left, right| right.taken_at.cmp(&left.taken_at));
    Ok(snapshots)
}
