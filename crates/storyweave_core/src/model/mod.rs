//! Story document domain model.
//!
//! # Responsibility
//! - Define the structural node shape, entity records, and story metadata.
//! - Define the `Document` aggregate that correlates tree and entity stores.
//!
//! # Invariants
//! - Structural nodes and their entity records share one stable id.
//! - Kind tags are closed enums; adding a kind is a compile-checked change.

pub mod document;
pub mod entity;
pub mod node;
pub mod story;

use uuid::Uuid;

/// Generates a fresh stable id for nodes, records and documents.
///
/// Simple (hyphen-free) form keeps ids safe as file stems.
pub fn new_entity_id() -> String {
    Uuid::new_v4().simple().to_string()
}
