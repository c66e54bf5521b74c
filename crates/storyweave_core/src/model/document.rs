//! Story document aggregate.
//!
//! # Responsibility
//! - Own one tree store, all entity stores, and story metadata.
//! - Offer the few operations that must touch both stores at once.
//! - Queue `DocumentEvent`s; observers pull them with `drain_events`.
//!
//! # Invariants
//! - Tree and entity stores are correlated only by shared id.
//! - Document-level mutations stamp `modified_time` and touched records.
//! - Plain store access (`tree_mut`, `entities_mut`) emits no events.

use crate::clock::now_millis;
use crate::model::entity::{Arc, Book, Chapter, EntityKind, Scene, StructuralRecord};
use crate::model::new_entity_id;
use crate::model::node::{Node, NodeId, NodeKind, NodePatch, NodeType};
use crate::model::story::StoryMeta;
use crate::store::entity_store::{EntityStore, EntityStores};
use crate::store::tree_store::{TreeError, TreeResult, TreeStore};

/// Change notification emitted by document-level operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    NodeCreated { id: NodeId, kind: NodeKind },
    NodeRemoved { id: NodeId, purged_records: usize },
    NodeMoved { id: NodeId, parent_id: Option<NodeId> },
    NodeRenamed { id: NodeId },
    NodeTypeChanged { id: NodeId, node_type: NodeType },
    /// Whole document replaced (load or reload).
    Replaced,
}

/// Sibling position for newly created nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt<'a> {
    End,
    After(&'a str),
    Before(&'a str),
}

/// Structural integrity findings between tree and entity stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Tree nodes with no matching record.
    pub dangling_nodes: Vec<(NodeKind, NodeId)>,
    /// Structural records with no matching tree node.
    pub orphan_records: Vec<(EntityKind, String)>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_nodes.is_empty() && self.orphan_records.is_empty()
    }
}

/// In-memory story document.
#[derive(Debug, Clone)]
pub struct Document {
    pub meta: StoryMeta,
    tree: TreeStore,
    entities: EntityStores,
    events: Vec<DocumentEvent>,
}

impl Document {
    /// Creates an empty story with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_parts(
            StoryMeta::new(new_entity_id(), name, now_millis()),
            TreeStore::new(),
            EntityStores::default(),
        )
    }

    pub fn from_parts(meta: StoryMeta, tree: TreeStore, entities: EntityStores) -> Self {
        Self {
            meta,
            tree,
            entities,
            events: Vec::new(),
        }
    }

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut TreeStore {
        &mut self.tree
    }

    pub fn entities(&self) -> &EntityStores {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityStores {
        &mut self.entities
    }

    /// Replaces the whole content (load semantics: replace, never merge).
    pub fn replace_with(&mut self, other: Document) {
        self.meta = other.meta;
        self.tree = other.tree;
        self.entities = other.entities;
        self.events.push(DocumentEvent::Replaced);
    }

    /// Takes all queued events, oldest first. Each event is delivered once.
    pub fn drain_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }

    /// Stamps the story as modified now.
    pub fn touch(&mut self) {
        self.meta.modified_time = now_millis();
    }

    /// Creates a node and its blank record together. Returns the new id.
    pub fn create_structural(
        &mut self,
        kind: NodeKind,
        parent_id: Option<&str>,
        at: InsertAt<'_>,
        title: impl Into<String>,
    ) -> TreeResult<NodeId> {
        let id = new_entity_id();
        let title = title.into();
        let mut node = Node::new(id.clone(), title.clone(), kind);
        node.is_open = true;

        match at {
            InsertAt::End => self.tree.append_node(node, parent_id, None)?,
            InsertAt::After(anchor) => self.tree.append_node(node, parent_id, Some(anchor))?,
            InsertAt::Before(anchor) => self.tree.insert_node(node, parent_id, Some(anchor))?,
        }

        let now = now_millis();
        match kind {
            NodeKind::Book => insert_blank::<Book>(&mut self.entities.book, &id, title, now),
            NodeKind::Arc => insert_blank::<Arc>(&mut self.entities.arc, &id, title, now),
            NodeKind::Chapter => {
                insert_blank::<Chapter>(&mut self.entities.chapter, &id, title, now)
            }
            NodeKind::Scene => insert_blank::<Scene>(&mut self.entities.scene, &id, title, now),
        }
        self.meta.modified_time = now;
        self.events.push(DocumentEvent::NodeCreated {
            id: id.clone(),
            kind,
        });
        Ok(id)
    }

    /// Removes a subtree and purges the records of every removed node.
    pub fn delete_structural(&mut self, id: &str) -> Option<Node> {
        let removed = self.tree.remove_node(id)?;
        let mut purged_records = 0;
        removed.walk(&mut |node| {
            if self.entities.remove_structural(node.kind, &node.id) {
                purged_records += 1;
            }
        });
        self.touch();
        self.events.push(DocumentEvent::NodeRemoved {
            id: id.to_string(),
            purged_records,
        });
        Some(removed)
    }

    /// Renames a node and keeps its record title in sync.
    pub fn rename_structural(&mut self, id: &str, title: impl Into<String>) -> TreeResult<()> {
        let title = title.into();
        let kind = self
            .tree
            .find_node(id)
            .map(|node| node.kind())
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
        self.tree.update_node(id, NodePatch::name(title.clone()))?;

        let now = now_millis();
        match kind {
            NodeKind::Book => retitle(&mut self.entities.book, id, title, now),
            NodeKind::Arc => retitle(&mut self.entities.arc, id, title, now),
            NodeKind::Chapter => retitle(&mut self.entities.chapter, id, title, now),
            NodeKind::Scene => retitle(&mut self.entities.scene, id, title, now),
        }
        self.meta.modified_time = now;
        self.events.push(DocumentEvent::NodeRenamed { id: id.to_string() });
        Ok(())
    }

    /// Moves a subtree. Unknown ids are a no-op, as in `TreeStore::move_node`.
    pub fn move_structural(
        &mut self,
        id: &str,
        new_parent_id: Option<&str>,
        after_id: Option<&str>,
    ) -> TreeResult<()> {
        if !self.tree.contains(id) {
            return Ok(());
        }
        self.tree.move_node(id, new_parent_id, after_id)?;
        self.touch();
        self.events.push(DocumentEvent::NodeMoved {
            id: id.to_string(),
            parent_id: new_parent_id.map(str::to_string),
        });
        Ok(())
    }

    /// Cycles the classification of `id`, optionally cascading to descendants.
    pub fn toggle_story_node(&mut self, id: &str, cascade: bool) -> TreeResult<NodeType> {
        let node_type = self.tree.toggle_story_node(id, cascade)?;
        self.touch();
        self.events.push(DocumentEvent::NodeTypeChanged {
            id: id.to_string(),
            node_type,
        });
        Ok(node_type)
    }

    /// Scene records in reading order. Nodes without a record are skipped.
    pub fn scenes_in_order(&self) -> Vec<&Scene> {
        self.tree
            .items_in_order(NodeKind::Scene)
            .into_iter()
            .filter_map(|node| self.entities.scene.get(node.id()))
            .collect()
    }

    /// Compares tree nodes against structural records in both directions.
    pub fn check_consistency(&self) -> ConsistencyReport {
        let mut report = ConsistencyReport::default();
        for node in self.tree.preorder() {
            if !self.entities.has_structural(node.kind(), node.id()) {
                report
                    .dangling_nodes
                    .push((node.kind(), node.id().to_string()));
            }
        }
        for kind in NodeKind::ALL {
            let entity_kind = EntityKind::from_node_kind(kind);
            for id in self.entities.ids_of(entity_kind) {
                let matches = self
                    .tree
                    .find_node(id)
                    .is_some_and(|node| node.kind() == kind);
                if !matches {
                    report.orphan_records.push((entity_kind, id.to_string()));
                }
            }
        }
        report
    }

    /// Drops structural records that have no tree node. Returns what was dropped.
    pub fn prune_orphan_records(&mut self) -> Vec<(EntityKind, String)> {
        let orphans = self.check_consistency().orphan_records;
        for (kind, id) in &orphans {
            if let Some(node_kind) = kind.node_kind() {
                self.entities.remove_structural(node_kind, id);
            }
        }
        orphans
    }
}

fn insert_blank<T: StructuralRecord>(
    store: &mut EntityStore<T>,
    id: &str,
    title: String,
    now_ms: i64,
) {
    store.insert(T::blank(id.to_string(), title, now_ms));
}

fn retitle<T: StructuralRecord>(store: &mut EntityStore<T>, id: &str, title: String, now_ms: i64) {
    store.update(id, |record| {
        record.set_title(title);
        record.touch(now_ms);
    });
}
