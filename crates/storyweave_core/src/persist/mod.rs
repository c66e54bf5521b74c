//! File-based project persistence.
//!
//! # Responsibility
//! - Split a `Document` into `index.json` plus one `<kind>/<id>.json` per record.
//! - Reassemble, validate and return a `Document` from such a directory.
//! - Detect concurrent external edits by comparing `index.json` mtime.
//!
//! # Invariants
//! - Validation and conflict checks happen before any disk write.
//! - `index.json` is written last, after every entity file of every kind.
//! - A failed load never yields a partial document.
//!
//! Writes are not transactional across files; a crash mid-save can leave new
//! entity files next to an old `index.json`. Autosave snapshots are the
//! recovery path for that case.

mod fs_io;
mod layout;
mod load;
mod options;
mod save;
mod snapshot;
mod wire;

use crate::schema::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub use layout::{ProjectLayout, AUTOSAVE_DIR, INDEX_FILE, TRASH_DIR};
pub use load::{load_project, LoadedProject};
pub use options::{PersistOptions, WriteDurability};
pub use save::{create_project, save_project};
pub use snapshot::{list_snapshots, SnapshotInfo};

/// Result type used by persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors from project load/save.
#[derive(Debug)]
pub enum PersistError {
    /// `index.json` is missing, unreadable, or not JSON.
    MalformedProject { path: PathBuf, reason: String },
    /// Content parsed but does not satisfy the document schema.
    SchemaViolation(ValidationError),
    /// `index.json` changed on disk since the caller's baseline.
    Conflict { expected: i64, actual: Option<i64> },
    /// Refusing to initialize over an existing project.
    AlreadyExists(PathBuf),
    /// Filesystem failure on a specific path.
    Io { path: PathBuf, source: io::Error },
    /// Encoding or decoding JSON for a specific file failed.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl PersistError {
    /// Whether the caller should offer a reload rather than a data fix.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::SchemaViolation(_))
    }

    /// Stable short code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedProject { .. } => "malformed_project",
            Self::SchemaViolation(_) => "schema_violation",
            Self::Conflict { .. } => "conflict",
            Self::AlreadyExists(_) => "already_exists",
            Self::Io { .. } => "io",
            Self::Json { .. } => "json",
        }
    }
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedProject { path, reason } => write!(
                f,
                "not a valid project: `{}` ({reason})",
                path.display()
            ),
            Self::SchemaViolation(err) => write!(f, "{err}"),
            Self::Conflict { expected, actual } => match actual {
                Some(actual) => write!(
                    f,
                    "project was modified elsewhere: expected mtime {expected}, found {actual}"
                ),
                None => write!(
                    f,
                    "project was modified elsewhere: expected mtime {expected}, index is gone"
                ),
            },
            Self::AlreadyExists(path) => {
                write!(f, "project already exists at `{}`", path.display())
            }
            Self::Io { path, source } => write!(f, "io error on `{}`: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "json error on `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SchemaViolation(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::MalformedProject { .. } | Self::Conflict { .. } | Self::AlreadyExists(_) => None,
        }
    }
}

impl From<ValidationError> for PersistError {
    fn from(value: ValidationError) -> Self {
        Self::SchemaViolation(value)
    }
}
