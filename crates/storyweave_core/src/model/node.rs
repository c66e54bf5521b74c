//! Structural node model for the narrative tree.
//!
//! # Responsibility
//! - Define the persisted `Node` shape stored in `index.json` (`structure`).
//! - Define the closed kind/classification enums used at every consumption site.
//!
//! # Invariants
//! - `NodeKind` nesting is fixed: book -> arc -> chapter -> scene.
//! - A missing `nodeType` deserializes as `NodeType::Story`.

use serde::{Deserialize, Serialize};

/// Stable identifier shared by a tree node and its entity record.
pub type NodeId = String;

/// Structural level of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Book,
    Arc,
    Chapter,
    Scene,
}

impl NodeKind {
    /// All structural kinds in nesting order.
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Book,
        NodeKind::Arc,
        NodeKind::Chapter,
        NodeKind::Scene,
    ];

    /// Kind every child of this kind must have. `None` for leaves.
    pub fn child_kind(self) -> Option<NodeKind> {
        match self {
            Self::Book => Some(Self::Arc),
            Self::Arc => Some(Self::Chapter),
            Self::Chapter => Some(Self::Scene),
            Self::Scene => None,
        }
    }

    /// Zero-based nesting depth where this kind is legal.
    pub fn depth(self) -> usize {
        match self {
            Self::Book => 0,
            Self::Arc => 1,
            Self::Chapter => 2,
            Self::Scene => 3,
        }
    }

    /// Wire name, as used in `type` and in entity directory names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Arc => "arc",
            Self::Chapter => "chapter",
            Self::Scene => "scene",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Story classification of a node.
///
/// Only `Story` nodes form the published narrative; `Context` nodes feed
/// generation prompts and `NonStory` nodes are notes kept alongside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    #[default]
    #[serde(rename = "story")]
    Story,
    #[serde(rename = "context")]
    Context,
    #[serde(rename = "non-story")]
    NonStory,
}

impl NodeType {
    /// Next classification in the toggle cycle story -> context -> non-story.
    pub fn next(self) -> NodeType {
        match self {
            Self::Story => Self::Context,
            Self::Context => Self::NonStory,
            Self::NonStory => Self::Story,
        }
    }
}

/// One leveled summary attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub level: i64,
    pub text: String,
    pub timestamp: i64,
}

/// Persisted tree element.
///
/// This is the nested wire shape. The in-memory `TreeStore` keeps nodes in a
/// flat arena and rebuilds this shape on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Serialized as `type` to match the on-disk schema.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// UI expand state, not structural.
    pub is_open: bool,
    #[serde(default)]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneliner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summaries: Option<Vec<NodeSummary>>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a closed, childless story node.
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            is_open: false,
            node_type: NodeType::Story,
            oneliner: None,
            summaries: None,
            children: Vec::new(),
        }
    }

    /// Builder-style helper for fixtures and importers.
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Visits this node and all descendants in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Number of nodes in this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }
}

/// Shallow field update for one node. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub is_open: Option<bool>,
    pub node_type: Option<NodeType>,
    pub oneliner: Option<Option<String>>,
}

impl NodePatch {
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            name: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn is_open(value: bool) -> Self {
        Self {
            is_open: Some(value),
            ..Self::default()
        }
    }

    pub fn node_type(value: NodeType) -> Self {
        Self {
            node_type: Some(value),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Node, NodeKind, NodeType};

    #[test]
    fn node_type_defaults_to_story_when_missing() {
        let node: Node = serde_json::from_str(
            r#"{"id":"b1","name":"Book","type":"book","isOpen":true}"#,
        )
        .unwrap();
        assert_eq!(node.node_type, NodeType::Story);
        assert!(node.children.is_empty());
    }

    #[test]
    fn node_type_uses_hyphenated_wire_name() {
        let json = serde_json::to_string(&NodeType::NonStory).unwrap();
        assert_eq!(json, "\"non-story\"");
    }

    #[test]
    fn toggle_cycle_returns_to_story() {
        let start = NodeType::Story;
        assert_eq!(start.next(), NodeType::Context);
        assert_eq!(start.next().next(), NodeType::NonStory);
        assert_eq!(start.next().next().next(), NodeType::Story);
    }

    #[test]
    fn child_kind_chain_stops_at_scene() {
        let mut chain = vec![NodeKind::Book];
        while let Some(next) = chain.last().and_then(|kind| kind.child_kind()) {
            chain.push(next);
        }
        assert_eq!(chain, NodeKind::ALL.to_vec());
    }
}
