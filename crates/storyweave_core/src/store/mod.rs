//! In-memory stores behind a `Document`.
//!
//! # Responsibility
//! - `tree_store`: the book/arc/chapter/scene hierarchy.
//! - `entity_store`: flat `id -> record` maps, one per entity kind.

pub mod entity_store;
pub mod tree_store;
