//! Document schema gate shared by load and save.
//!
//! # Responsibility
//! - Reject documents that would corrupt the on-disk project.
//! - Report shape errors (from JSON decoding) and semantic errors uniformly.
//!
//! # Invariants
//! - Validation is read-only and never coerces data.
//! - Every id is usable as a file stem.
//! - Every structural node has a record and every structural record has a node.

use crate::model::document::Document;
use crate::model::entity::{EntityKind, EntityRecord};
use crate::model::node::NodeKind;
use crate::store::entity_store::EntityStore;
use crate::store::tree_store::TreeError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static ENTITY_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9_.-]{0,127}$").expect("valid id regex"));

/// Schema violation details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// JSON did not match the expected shape.
    Shape { location: String, message: String },
    /// Tree structure rejected while building the store.
    Tree(TreeError),
    /// Story metadata carries no id.
    MissingStoryId,
    /// Id cannot be used as a file stem.
    InvalidId { scope: String, id: String },
    /// Record stored under a key different from its own id.
    KeyMismatch {
        kind: EntityKind,
        key: String,
        id: String,
    },
    /// Tree node without an entity record.
    DanglingNode { kind: NodeKind, id: String },
    /// Structural record without a tree node.
    OrphanRecord { kind: EntityKind, id: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape { location, message } => {
                write!(f, "schema mismatch in {location}: {message}")
            }
            Self::Tree(err) => write!(f, "invalid structure: {err}"),
            Self::MissingStoryId => write!(f, "story id must not be empty"),
            Self::InvalidId { scope, id } => write!(f, "invalid id `{id}` in {scope}"),
            Self::KeyMismatch { kind, key, id } => {
                write!(f, "{kind} record keyed `{key}` carries id `{id}`")
            }
            Self::DanglingNode { kind, id } => {
                write!(f, "{kind} node {id} has no matching record")
            }
            Self::OrphanRecord { kind, id } => {
                write!(f, "{kind} record {id} has no matching tree node")
            }
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeError> for ValidationError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

/// Returns whether `id` can be persisted as `<id>.json`.
pub fn is_valid_entity_id(id: &str) -> bool {
    ENTITY_ID_RE.is_match(id)
}

/// Validates a whole document. Returns the first violation found.
///
/// Tree shape (kinds, nesting, unique ids) is enforced by `TreeStore` itself,
/// so this checks ids, record keys, and tree/record correlation.
pub fn validate_document(document: &Document) -> Result<(), ValidationError> {
    if document.meta.id.trim().is_empty() {
        return Err(ValidationError::MissingStoryId);
    }

    for node in document.tree().preorder() {
        if !is_valid_entity_id(node.id()) {
            return Err(ValidationError::InvalidId {
                scope: "structure".to_string(),
                id: node.id().to_string(),
            });
        }
    }

    let entities = document.entities();
    validate_store(&entities.item)?;
    validate_store(&entities.scene)?;
    validate_store(&entities.book)?;
    validate_store(&entities.arc)?;
    validate_store(&entities.chapter)?;
    validate_store(&entities.characters)?;
    validate_store(&entities.locations)?;
    validate_store(&entities.plot_points)?;
    validate_store(&entities.languages)?;

    let report = document.check_consistency();
    if let Some((kind, id)) = report.dangling_nodes.into_iter().next() {
        return Err(ValidationError::DanglingNode { kind, id });
    }
    if let Some((kind, id)) = report.orphan_records.into_iter().next() {
        return Err(ValidationError::OrphanRecord { kind, id });
    }
    Ok(())
}

fn validate_store<T: EntityRecord>(store: &EntityStore<T>) -> Result<(), ValidationError> {
    for (key, record) in store.iter() {
        if !is_valid_entity_id(key) {
            return Err(ValidationError::InvalidId {
                scope: T::KIND.dir_name().to_string(),
                id: key.clone(),
            });
        }
        if record.id() != key {
            return Err(ValidationError::KeyMismatch {
                kind: T::KIND,
                key: key.clone(),
                id: record.id().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::is_valid_entity_id;

    #[test]
    fn accepts_generated_and_legacy_ids() {
        assert!(is_valid_entity_id("9f1c2b7e4a0d4e6f8b1c2d3e4f5a6b7c"));
        assert!(is_valid_entity_id("42"));
        assert!(is_valid_entity_id("x_y-z.v2"));
    }

    #[test]
    fn rejects_ids_unsafe_as_file_stems() {
        assert!(!is_valid_entity_id(""));
        assert!(!is_valid_entity_id(".hidden"));
        assert!(!is_valid_entity_id("../escape"));
        assert!(!is_valid_entity_id("a/b"));
        assert!(!is_valid_entity_id("with space"));
    }
}
