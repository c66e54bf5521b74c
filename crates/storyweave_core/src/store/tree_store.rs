//! Narrative tree store.
//!
//! # Responsibility
//! - Own structural position and ordering of book/arc/chapter/scene nodes.
//! - Provide id-addressed path lookup and structural mutation.
//!
//! # Invariants
//! - Node ids are unique across the whole forest.
//! - Roots are books; every child is exactly one level below its parent.
//! - `parent` back-links and `children` lists always agree.
//! - Traversal depth is bounded only by the tree shape, never by a guard.
//!
//! Nodes live in a flat arena keyed by id with parent/children adjacency,
//! so path lookup is O(depth) and no cached index path can go stale.

use crate::model::node::{Node, NodeId, NodeKind, NodePatch, NodeSummary, NodeType};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by tree store operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors from tree store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Target node does not exist.
    NodeNotFound(NodeId),
    /// Requested parent does not exist.
    ParentNotFound(NodeId),
    /// Inserted subtree reuses an id already present (or repeats one).
    DuplicateId(NodeId),
    /// Child kind is not the one legal under the parent kind.
    InvalidChildKind {
        parent: NodeKind,
        child: NodeKind,
        node_id: NodeId,
    },
    /// Only books may sit at the forest root.
    InvalidRootKind { kind: NodeKind, node_id: NodeId },
    /// Move would place a node under itself or one of its descendants.
    CycleDetected { node_id: NodeId, parent_id: NodeId },
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "tree node not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "tree parent not found: {id}"),
            Self::DuplicateId(id) => write!(f, "duplicate tree node id: {id}"),
            Self::InvalidChildKind {
                parent,
                child,
                node_id,
            } => write!(
                f,
                "node {node_id} of kind `{child}` cannot be a child of a `{parent}`"
            ),
            Self::InvalidRootKind { kind, node_id } => write!(
                f,
                "node {node_id} of kind `{kind}` cannot be a root; roots must be books"
            ),
            Self::CycleDetected { node_id, parent_id } => write!(
                f,
                "move would create cycle: node {node_id} under parent {parent_id}"
            ),
        }
    }
}

impl Error for TreeError {}

/// Arena entry for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    id: NodeId,
    name: String,
    kind: NodeKind,
    is_open: bool,
    node_type: NodeType,
    oneliner: Option<String>,
    summaries: Option<Vec<NodeSummary>>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn oneliner(&self) -> Option<&str> {
        self.oneliner.as_deref()
    }

    pub fn summaries(&self) -> Option<&[NodeSummary]> {
        self.summaries.as_deref()
    }

    /// Parent id, `None` for roots.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Child ids in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Where to place a node among its new siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement<'a> {
    End,
    After(&'a str),
    Before(&'a str),
}

/// Forest of narrative nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeStore {
    nodes: HashMap<NodeId, TreeNode>,
    roots: Vec<NodeId>,
}

impl TreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from the persisted nested forest, enforcing all invariants.
    pub fn from_forest(forest: Vec<Node>) -> TreeResult<Self> {
        let mut store = Self::new();
        for root in forest {
            store.append_node(root, None, None)?;
        }
        Ok(store)
    }

    /// Rebuilds the nested forest in document order.
    pub fn to_forest(&self) -> Vec<Node> {
        self.roots
            .iter()
            .filter_map(|id| self.subtree(id))
            .collect()
    }

    /// Owned nested copy of the subtree rooted at `id`.
    pub fn subtree(&self, id: &str) -> Option<Node> {
        let entry = self.nodes.get(id)?;
        Some(Node {
            id: entry.id.clone(),
            name: entry.name.clone(),
            kind: entry.kind,
            is_open: entry.is_open,
            node_type: entry.node_type,
            oneliner: entry.oneliner.clone(),
            summaries: entry.summaries.clone(),
            children: entry
                .children
                .iter()
                .filter_map(|child| self.subtree(child))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Root (book) ids in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Current node for `id`.
    pub fn find_node(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Parent node of `id`, `None` for roots and unknown ids.
    pub fn find_parent(&self, id: &str) -> Option<&TreeNode> {
        let parent_id = self.nodes.get(id)?.parent.as_deref()?;
        self.nodes.get(parent_id)
    }

    /// Nodes from a root down to `id`, inclusive. Empty when `id` is unknown.
    pub fn find_path_to_node(&self, id: &str) -> Vec<&TreeNode> {
        let mut path = Vec::new();
        let mut cursor = self.nodes.get(id);
        while let Some(node) = cursor {
            path.push(node);
            cursor = node.parent.as_deref().and_then(|parent| self.nodes.get(parent));
        }
        path.reverse();
        path
    }

    /// Ids from a root down to `id`, inclusive.
    pub fn find_path_to_node_ids(&self, id: &str) -> Vec<NodeId> {
        self.find_path_to_node(id)
            .into_iter()
            .map(|node| node.id.clone())
            .collect()
    }

    /// Sibling indexes from the forest root down to `id`. Empty when unknown.
    pub fn find_indexes_to_node(&self, id: &str) -> Vec<usize> {
        let path = self.find_path_to_node(id);
        let mut indexes = Vec::with_capacity(path.len());
        for node in path {
            let siblings = self.sibling_list(node.parent.as_deref());
            match siblings.iter().position(|sibling| *sibling == node.id) {
                Some(index) => indexes.push(index),
                None => return Vec::new(),
            }
        }
        indexes
    }

    /// Zero-based depth of `id` (roots are 0).
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        let path = self.find_path_to_node(id);
        path.len().checked_sub(1)
    }

    /// Appends `node` (with its subtree) at the end of the forest, at the end of
    /// `parent_id`'s children, or right after sibling `after_id`.
    ///
    /// An `after_id` that is not currently a child of the target falls back to
    /// append-at-end.
    pub fn append_node(
        &mut self,
        node: Node,
        parent_id: Option<&str>,
        after_id: Option<&str>,
    ) -> TreeResult<()> {
        let placement = after_id.map_or(Placement::End, Placement::After);
        self.attach(node, parent_id, placement)
    }

    /// Inserts `node` right before sibling `before_id`, falling back to the end.
    pub fn insert_node(
        &mut self,
        node: Node,
        parent_id: Option<&str>,
        before_id: Option<&str>,
    ) -> TreeResult<()> {
        let placement = before_id.map_or(Placement::End, Placement::Before);
        self.attach(node, parent_id, placement)
    }

    /// Detaches `id` and its whole subtree. Returns the removed subtree.
    ///
    /// Entity records are left alone; purging them is the caller's decision.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let removed = self.subtree(id)?;
        self.unlink(id);
        for descendant in self.collect_subtree_ids(id) {
            self.nodes.remove(&descendant);
        }
        Some(removed)
    }

    /// Moves `id` (subtree intact) under `new_parent_id`, after `after_id`.
    ///
    /// Unknown `id` is a no-op.
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent_id: Option<&str>,
        after_id: Option<&str>,
    ) -> TreeResult<()> {
        let Some(kind) = self.nodes.get(id).map(|node| node.kind) else {
            return Ok(());
        };

        if let Some(parent_id) = new_parent_id {
            let parent = self
                .nodes
                .get(parent_id)
                .ok_or_else(|| TreeError::ParentNotFound(parent_id.to_string()))?;
            if parent_id == id || self.is_ancestor(id, parent_id) {
                return Err(TreeError::CycleDetected {
                    node_id: id.to_string(),
                    parent_id: parent_id.to_string(),
                });
            }
            ensure_child_kind(parent.kind, kind, id)?;
        } else if kind != NodeKind::Book {
            return Err(TreeError::InvalidRootKind {
                kind,
                node_id: id.to_string(),
            });
        }

        self.unlink(id);
        let placement = after_id.map_or(Placement::End, Placement::After);
        self.link(id.to_string(), new_parent_id, placement);
        Ok(())
    }

    /// Shallow-merges `patch` into node `id`. Children are untouched.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> TreeResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
        if let Some(name) = patch.name {
            node.name = name;
        }
        if let Some(is_open) = patch.is_open {
            node.is_open = is_open;
        }
        if let Some(node_type) = patch.node_type {
            node.node_type = node_type;
        }
        if let Some(oneliner) = patch.oneliner {
            node.oneliner = oneliner;
        }
        Ok(())
    }

    /// Sets the UI expand flag.
    pub fn set_open(&mut self, id: &str, is_open: bool) -> TreeResult<()> {
        self.update_node(id, NodePatch::is_open(is_open))
    }

    /// Nodes of `kind` in document (pre-order) order.
    pub fn items_in_order(&self, kind: NodeKind) -> Vec<&TreeNode> {
        self.preorder()
            .into_iter()
            .filter(|node| node.kind == kind)
            .collect()
    }

    /// All nodes in document (pre-order) order.
    pub fn preorder(&self) -> Vec<&TreeNode> {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<&NodeId> = self.roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            ordered.push(node);
            stack.extend(node.children.iter().rev());
        }
        ordered
    }

    /// Ids of `id` and all its descendants, pre-order. Empty when unknown.
    pub fn collect_subtree_ids(&self, id: &str) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            stack.extend(node.children.iter().rev().cloned());
            ids.push(current);
        }
        ids
    }

    /// Advances `id` through story -> context -> non-story -> story.
    ///
    /// With `cascade`, every descendant takes the new classification too.
    pub fn toggle_story_node(&mut self, id: &str, cascade: bool) -> TreeResult<NodeType> {
        let next = self
            .nodes
            .get(id)
            .map(|node| node.node_type.next())
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
        self.update_node(id, NodePatch::node_type(next))?;
        if cascade {
            self.update_all_children_node_type(id, next)?;
        }
        Ok(next)
    }

    /// Sets `node_type` on every descendant of `id` (not `id` itself).
    /// Returns the number of nodes changed.
    pub fn update_all_children_node_type(
        &mut self,
        id: &str,
        node_type: NodeType,
    ) -> TreeResult<usize> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::NodeNotFound(id.to_string()));
        }
        let mut changed = 0;
        for descendant in self.collect_subtree_ids(id).into_iter().skip(1) {
            if let Some(node) = self.nodes.get_mut(&descendant) {
                if node.node_type != node_type {
                    node.node_type = node_type;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    fn attach(
        &mut self,
        node: Node,
        parent_id: Option<&str>,
        placement: Placement<'_>,
    ) -> TreeResult<()> {
        match parent_id {
            Some(parent_id) => {
                let parent = self
                    .nodes
                    .get(parent_id)
                    .ok_or_else(|| TreeError::ParentNotFound(parent_id.to_string()))?;
                ensure_child_kind(parent.kind, node.kind, &node.id)?;
            }
            None => {
                if node.kind != NodeKind::Book {
                    return Err(TreeError::InvalidRootKind {
                        kind: node.kind,
                        node_id: node.id,
                    });
                }
            }
        }
        self.check_subtree(&node)?;

        let id = node.id.clone();
        self.insert_subtree(node, parent_id.map(str::to_string));
        self.link(id, parent_id, placement);
        Ok(())
    }

    /// Validates kinds and id uniqueness of a subtree before any arena write.
    fn check_subtree(&self, root: &Node) -> TreeResult<()> {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.nodes.contains_key(&node.id) || !seen.insert(node.id.as_str()) {
                return Err(TreeError::DuplicateId(node.id.clone()));
            }
            for child in &node.children {
                ensure_child_kind(node.kind, child.kind, &child.id)?;
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Writes a checked subtree into the arena. Does not link the root.
    fn insert_subtree(&mut self, node: Node, parent: Option<NodeId>) {
        let child_ids = node.children.iter().map(|child| child.id.clone()).collect();
        let id = node.id.clone();
        for child in node.children {
            self.insert_subtree(child, Some(id.clone()));
        }
        self.nodes.insert(
            id.clone(),
            TreeNode {
                id,
                name: node.name,
                kind: node.kind,
                is_open: node.is_open,
                node_type: node.node_type,
                oneliner: node.oneliner,
                summaries: node.summaries,
                parent,
                children: child_ids,
            },
        );
    }

    /// Places an arena node into the sibling list of `parent_id`.
    fn link(&mut self, id: NodeId, parent_id: Option<&str>, placement: Placement<'_>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = parent_id.map(str::to_string);
        }
        let siblings = match parent_id {
            Some(parent_id) => match self.nodes.get_mut(parent_id) {
                Some(parent) => &mut parent.children,
                None => return,
            },
            None => &mut self.roots,
        };
        let index = match placement {
            Placement::End => siblings.len(),
            Placement::After(anchor) => siblings
                .iter()
                .position(|sibling| sibling == anchor)
                .map_or(siblings.len(), |index| index + 1),
            Placement::Before(anchor) => siblings
                .iter()
                .position(|sibling| sibling == anchor)
                .unwrap_or(siblings.len()),
        };
        siblings.insert(index, id);
    }

    /// Removes `id` from its parent's sibling list. The arena entry stays.
    fn unlink(&mut self, id: &str) {
        let parent = self.nodes.get(id).and_then(|node| node.parent.clone());
        let siblings = match parent {
            Some(parent_id) => match self.nodes.get_mut(&parent_id) {
                Some(parent) => &mut parent.children,
                None => return,
            },
            None => &mut self.roots,
        };
        siblings.retain(|sibling| sibling != id);
    }

    fn sibling_list(&self, parent_id: Option<&str>) -> &[NodeId] {
        match parent_id {
            Some(parent_id) => self
                .nodes
                .get(parent_id)
                .map(|parent| parent.children.as_slice())
                .unwrap_or(&[]),
            None => &self.roots,
        }
    }

    /// Whether `ancestor` lies on the parent chain of `id`.
    fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut cursor = self.nodes.get(id).and_then(|node| node.parent.as_deref());
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|node| node.parent.as_deref());
        }
        false
    }
}

fn ensure_child_kind(parent: NodeKind, child: NodeKind, node_id: &str) -> TreeResult<()> {
    if parent.child_kind() == Some(child) {
        return Ok(());
    }
    Err(TreeError::InvalidChildKind {
        parent,
        child,
        node_id: node_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{TreeError, TreeStore};
    use crate::model::node::{Node, NodeKind};

    fn scene(id: &str) -> Node {
        Node::new(id, id, NodeKind::Scene)
    }

    #[test]
    fn link_back_references_agree_after_move() {
        let mut store = TreeStore::from_forest(vec![Node::new("b", "B", NodeKind::Book)
            .with_children(vec![Node::new("a", "A", NodeKind::Arc).with_children(vec![
                Node::new("c1", "C1", NodeKind::Chapter).with_children(vec![scene("s")]),
                Node::new("c2", "C2", NodeKind::Chapter),
            ])])])
        .unwrap();

        store.move_node("s", Some("c2"), None).unwrap();

        assert!(store.find_node("c1").unwrap().children().is_empty());
        assert_eq!(store.find_node("c2").unwrap().children(), ["s".to_string()]);
        assert_eq!(store.find_node("s").unwrap().parent(), Some("c2"));
    }

    #[test]
    fn failed_attach_leaves_store_untouched() {
        let mut store =
            TreeStore::from_forest(vec![Node::new("b", "B", NodeKind::Book)]).unwrap();
        let before = store.clone();

        let err = store
            .append_node(
                Node::new("a", "A", NodeKind::Arc).with_children(vec![
                    Node::new("c", "C", NodeKind::Chapter),
                    Node::new("b", "dup", NodeKind::Chapter),
                ]),
                Some("b"),
                None,
            )
            .unwrap_err();

        assert_eq!(err, TreeError::DuplicateId("b".to_string()));
        assert_eq!(store, before);
    }
}
