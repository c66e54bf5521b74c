//! Core of the Storyweave writing tool.
//! Owns the story tree, entity records, and file-based project persistence.

pub mod clock;
pub mod logging;
pub mod model;
pub mod persist;
pub mod schema;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::document::{ConsistencyReport, Document, DocumentEvent, InsertAt};
pub use model::entity::{EntityKind, EntityRecord, StructuralRecord};
pub use model::node::{Node, NodeId, NodeKind, NodePatch, NodeType};
pub use model::story::StoryMeta;
pub use persist::{
    create_project, list_snapshots, load_project, save_project, LoadedProject, PersistError,
    PersistOptions, PersistResult, SnapshotInfo, WriteDurability,
};
pub use schema::{validate_document, ValidationError};
pub use service::autosave::{AutosaveConfig, AutosaveScheduler, SaveFailure};
pub use service::project_session::ProjectSession;
pub use store::entity_store::{EntityStore, EntityStores};
pub use store::tree_store::{TreeError, TreeNode, TreeResult, TreeStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
