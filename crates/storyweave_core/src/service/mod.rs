//! Session-level services over the document and persistence layers.
//!
//! # Responsibility
//! - Keep the concurrency baseline next to the document it belongs to.
//! - Drive autosave timing without owning threads.

pub mod autosave;
pub mod project_session;
