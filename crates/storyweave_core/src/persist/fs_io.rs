//! Filesystem primitives for persistence: atomic writes, mtime reads,
//! entity directory listing.

use super::layout::entity_id_from_file_name;
use super::{PersistError, PersistResult, WriteDurability};
use crate::clock::epoch_millis;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes `contents` to `path` through a dot-prefixed temp file and rename.
///
/// Readers never observe a half-written file. The temp name starts with `.`
/// so the loader skips leftovers from a crash.
pub(crate) fn write_atomic(
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> PersistResult<()> {
    let Some(parent) = path.parent() else {
        return Err(PersistError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };
    let Some(file_name) = path.file_name() else {
        return Err(PersistError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };
    fs::create_dir_all(parent).map_err(io_error(parent))?;

    let tmp_path = parent.join(format!(
        ".{}.{}.{}.tmp",
        file_name.to_string_lossy(),
        process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(io_error(&tmp_path))?;
    file.write_all(contents).map_err(io_error(&tmp_path))?;
    if durability == WriteDurability::Durable {
        file.sync_all().map_err(io_error(&tmp_path))?;
    }
    drop(file);

    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(PersistError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent).map_err(io_error(parent))?;
            dir.sync_all().map_err(io_error(parent))?;
        }
    }
    Ok(())
}

/// Pretty-printed JSON, two-space indent, then `write_atomic`.
pub(crate) fn write_json<T: Serialize>(
    path: &Path,
    value: &T,
    durability: WriteDurability,
) -> PersistResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &bytes, durability)
}

/// Modification time of `path` in epoch milliseconds, `None` when absent.
pub(crate) fn mtime_millis(path: &Path) -> PersistResult<Option<i64>> {
    match fs::metadata(path) {
        Ok(metadata) => {
            let modified = metadata.modified().map_err(io_error(path))?;
            Ok(Some(epoch_millis(modified)))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PersistError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Entity files in `dir` as `(id, path)`, sorted by id.
///
/// Returns `None` when the directory does not exist. Dot-files, non-`.json`
/// entries and subdirectories are skipped.
pub(crate) fn list_entity_files(dir: &Path) -> PersistResult<Option<Vec<(String, PathBuf)>>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_error(dir))?;
        let file_type = entry.file_type().map_err(io_error(&entry.path()))?;
        if !file_type.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(id) = entity_id_from_file_name(file_name) {
            files.push((id.to_string(), entry.path()));
        }
    }
    files.sort_by(|left, right| left.0.cmp(&right.0));
    Ok(Some(files))
}

/// Copies every regular file of `src` into `dst` (flat, non-recursive).
/// Missing `src` copies nothing.
pub(crate) fn copy_dir_files(src: &Path, dst: &Path) -> PersistResult<usize> {
    let entries = match fs::read_dir(src) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(PersistError::Io {
                path: src.to_path_buf(),
                source,
            })
        }
    };
    fs::create_dir_all(dst).map_err(io_error(dst))?;

    let mut copied = 0;
    for entry in entries {
        let entry = entry.map_err(io_error(src))?;
        let path = entry.path();
        if !entry.file_type().map_err(io_error(&path))?.is_file() {
            continue;
        }
        let target = dst.join(entry.file_name());
        fs::copy(&path, &target).map_err(io_error(&target))?;
        copied += 1;
    }
    Ok(copied)
}

/// Moves `file` into `trash_dir`, replacing an older trashed copy.
pub(crate) fn move_to_trash(file: &Path, trash_dir: &Path) -> PersistResult<()> {
    let Some(file_name) = file.file_name() else {
        return Ok(());
    };
    fs::create_dir_all(trash_dir).map_err(io_error(trash_dir))?;
    let target = trash_dir.join(file_name);
    if fs::rename(file, &target).is_ok() {
        return Ok(());
    }
    fs::copy(file, &target).map_err(io_error(&target))?;
    fs::remove_file(file).map_err(io_error(file))
}

#[cfg(test)]
mod tests {
    use super::{list_entity_files, mtime_millis, write_atomic};
    use crate::persist::WriteDurability;
    use std::fs;

    #[test]
    fn atomic_write_replaces_content_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene").join("s1.json");
        write_atomic(&path, b"{\"v\":1}", WriteDurability::BestEffort).unwrap();
        write_atomic(&path, b"{\"v\":2}", WriteDurability::Durable).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"v\":2}");
        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["s1.json".to_string()]);
    }

    #[test]
    fn missing_paths_report_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(mtime_millis(&dir.path().join("index.json")).unwrap(), None);
        assert!(list_entity_files(&dir.path().join("scene"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn listing_skips_hidden_foreign_and_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join(".a.json.1.0.tmp"), "{}").unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let ids: Vec<String> = list_entity_files(dir.path())
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
