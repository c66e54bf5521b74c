//! Entity records: the content side of a story document.
//!
//! # Responsibility
//! - Define one typed record per flat entity kind.
//! - Map each record type to the directory it is persisted under.
//!
//! # Invariants
//! - A record's `id` equals its map key and its `<id>.json` file stem.
//! - Structural records (book/arc/chapter/scene) share ids with tree nodes.
//! - Fields not modeled here are kept in `unknown` and written back verbatim.

use crate::model::node::{NodeId, NodeKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields carried through untouched by load/save.
pub type UnknownFields = BTreeMap<String, serde_json::Value>;

/// Every flat entity kind that owns a directory in a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Item,
    Scene,
    Book,
    Arc,
    Chapter,
    Characters,
    Locations,
    PlotPoints,
    Languages,
}

impl EntityKind {
    /// Kinds in the order the persistence layer processes them.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Item,
        EntityKind::Scene,
        EntityKind::Book,
        EntityKind::Arc,
        EntityKind::Chapter,
        EntityKind::Characters,
        EntityKind::Locations,
        EntityKind::PlotPoints,
        EntityKind::Languages,
    ];

    /// Directory name under the project root. Also the map key in `index.json`.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Scene => "scene",
            Self::Book => "book",
            Self::Arc => "arc",
            Self::Chapter => "chapter",
            Self::Characters => "characters",
            Self::Locations => "locations",
            Self::PlotPoints => "plotPoints",
            Self::Languages => "languages",
        }
    }

    /// Tree kind mirrored by this entity kind, if structural.
    pub fn node_kind(self) -> Option<NodeKind> {
        match self {
            Self::Book => Some(NodeKind::Book),
            Self::Arc => Some(NodeKind::Arc),
            Self::Chapter => Some(NodeKind::Chapter),
            Self::Scene => Some(NodeKind::Scene),
            Self::Item | Self::Characters | Self::Locations | Self::PlotPoints | Self::Languages => {
                None
            }
        }
    }

    pub fn from_node_kind(kind: NodeKind) -> EntityKind {
        match kind {
            NodeKind::Book => Self::Book,
            NodeKind::Arc => Self::Arc,
            NodeKind::Chapter => Self::Chapter,
            NodeKind::Scene => Self::Scene,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Last-modified marker. Older projects stored ISO strings, newer ones epoch ms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModifiedAt {
    Millis(i64),
    Text(String),
}

/// Shared behavior of all persisted records.
pub trait EntityRecord: Clone + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Stamps the record as modified at `now_ms`. No-op for kinds without the field.
    fn touch(&mut self, now_ms: i64);
}

/// Records mirrored by a tree node.
pub trait StructuralRecord: EntityRecord {
    const NODE_KIND: NodeKind;

    fn title(&self) -> &str;
    fn set_title(&mut self, title: String);
    /// Blank record for a freshly created node.
    fn blank(id: NodeId, title: String, now_ms: i64) -> Self;
}

macro_rules! touch_modified_at {
    () => {
        fn touch(&mut self, now_ms: i64) {
            self.modified_at = Some(ModifiedAt::Millis(now_ms));
        }
    };
}

macro_rules! structural_title {
    ($kind:expr) => {
        const NODE_KIND: NodeKind = $kind;

        fn title(&self) -> &str {
            &self.title
        }

        fn set_title(&mut self, title: String) {
            self.title = title;
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: NodeId,
    #[serde(rename = "modifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<ModifiedAt>,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critique: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl EntityRecord for Book {
    const KIND: EntityKind = EntityKind::Book;

    fn id(&self) -> &str {
        &self.id
    }

    touch_modified_at!();
}

impl StructuralRecord for Book {
    structural_title!(NodeKind::Book);

    fn blank(id: NodeId, title: String, now_ms: i64) -> Self {
        Self {
            id,
            modified_at: Some(ModifiedAt::Millis(now_ms)),
            title,
            summary: String::new(),
            author: None,
            critique: None,
            start_date: None,
            unknown: UnknownFields::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightCategory {
    Character,
    Plot,
    Setting,
    Theme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcHighlight {
    pub text: String,
    pub importance: String,
    pub category: HighlightCategory,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub id: NodeId,
    #[serde(rename = "modifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<ModifiedAt>,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<ArcHighlight>>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl EntityRecord for Arc {
    const KIND: EntityKind = EntityKind::Arc;

    fn id(&self) -> &str {
        &self.id
    }

    touch_modified_at!();
}

impl StructuralRecord for Arc {
    structural_title!(NodeKind::Arc);

    fn blank(id: NodeId, title: String, now_ms: i64) -> Self {
        Self {
            id,
            modified_at: Some(ModifiedAt::Millis(now_ms)),
            title,
            summary: String::new(),
            start_date: None,
            highlights: None,
            unknown: UnknownFields::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: NodeId,
    #[serde(rename = "modifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<ModifiedAt>,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "visibleFrom", default, skip_serializing_if = "Option::is_none")]
    pub visible_from: Option<String>,
    #[serde(rename = "royalRoadId", default, skip_serializing_if = "Option::is_none")]
    pub royal_road_id: Option<i64>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl EntityRecord for Chapter {
    const KIND: EntityKind = EntityKind::Chapter;

    fn id(&self) -> &str {
        &self.id
    }

    touch_modified_at!();
}

impl StructuralRecord for Chapter {
    structural_title!(NodeKind::Chapter);

    fn blank(id: NodeId, title: String, now_ms: i64) -> Self {
        Self {
            id,
            modified_at: Some(ModifiedAt::Millis(now_ms)),
            title,
            summary: String::new(),
            start_date: None,
            visible_from: None,
            royal_road_id: None,
            unknown: UnknownFields::new(),
        }
    }
}

/// Editorial state of one paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphState {
    Ai,
    Draft,
    Revise,
    Final,
    Sdt,
}

/// Paragraph body: plain text, or a rich-text document tree kept as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParagraphText {
    Plain(String),
    Rich(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphComment {
    pub text: String,
    pub user: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotPointAction {
    pub plot_point_id: String,
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryActionType {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAction {
    #[serde(rename = "type")]
    pub action: InventoryActionType,
    pub item_name: String,
    pub item_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneParagraph {
    pub id: String,
    #[serde(rename = "modifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<ModifiedAt>,
    pub text: ParagraphText,
    pub state: ParagraphState,
    #[serde(default)]
    pub comments: Vec<ParagraphComment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_point_actions: Option<Vec<PlotPointAction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_actions: Option<Vec<InventoryAction>>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    First,
    #[default]
    Third,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: NodeId,
    #[serde(rename = "modifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<ModifiedAt>,
    pub title: String,
    pub summary: String,
    pub paragraphs: Vec<SceneParagraph>,
    pub text: String,
    #[serde(default)]
    pub plot_point_actions: Vec<PlotPointAction>,
    #[serde(rename = "selectedParagraph", default, skip_serializing_if = "Option::is_none")]
    pub selected_paragraph: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<Perspective>,
    #[serde(rename = "protagonistId", default, skip_serializing_if = "Option::is_none")]
    pub protagonist_id: Option<String>,
    #[serde(rename = "characterIds", default, skip_serializing_if = "Option::is_none")]
    pub character_ids: Option<Vec<String>>,
    #[serde(rename = "locationId", default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl Scene {
    /// Word count across paragraphs, counting whitespace-separated tokens of plain text.
    pub fn plain_word_count(&self) -> usize {
        self.paragraphs
            .iter()
            .map(|paragraph| match &paragraph.text {
                ParagraphText::Plain(text) => text.split_whitespace().count(),
                ParagraphText::Rich(_) => paragraph.words.unwrap_or(0) as usize,
            })
            .sum()
    }
}

impl EntityRecord for Scene {
    const KIND: EntityKind = EntityKind::Scene;

    fn id(&self) -> &str {
        &self.id
    }

    touch_modified_at!();
}

impl StructuralRecord for Scene {
    structural_title!(NodeKind::Scene);

    fn blank(id: NodeId, title: String, now_ms: i64) -> Self {
        Self {
            id,
            modified_at: Some(ModifiedAt::Millis(now_ms)),
            title,
            summary: String::new(),
            paragraphs: Vec::new(),
            text: String::new(),
            plot_point_actions: Vec::new(),
            selected_paragraph: None,
            words: Some(0),
            perspective: None,
            protagonist_id: None,
            character_ids: Some(Vec::new()),
            location_id: None,
            unknown: UnknownFields::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<ModifiedAt>,
    pub picture: String,
    /// Legacy single-field name, superseded by first/middle/last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub summary: String,
    pub age: String,
    #[serde(default = "default_true")]
    pub is_main_character: bool,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl Character {
    /// Display name built from name parts, falling back to the legacy field.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            self.last_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
        if parts.is_empty() {
            return self.name.clone().unwrap_or_default();
        }
        parts.join(" ")
    }
}

impl EntityRecord for Character {
    const KIND: EntityKind = EntityKind::Characters;

    fn id(&self) -> &str {
        &self.id
    }

    touch_modified_at!();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotPointState {
    Introduced,
    #[default]
    Unresolved,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotPoint {
    pub id: String,
    #[serde(rename = "modifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<ModifiedAt>,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub state: PlotPointState,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl EntityRecord for PlotPoint {
    const KIND: EntityKind = EntityKind::PlotPoints;

    fn id(&self) -> &str {
        &self.id
    }

    touch_modified_at!();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(rename = "modifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<ModifiedAt>,
    pub name: String,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl EntityRecord for Item {
    const KIND: EntityKind = EntityKind::Item;

    fn id(&self) -> &str {
        &self.id
    }

    touch_modified_at!();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(rename = "modifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<ModifiedAt>,
    pub name: String,
    pub picture: String,
    pub description: String,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl EntityRecord for Location {
    const KIND: EntityKind = EntityKind::Locations;

    fn id(&self) -> &str {
        &self.id
    }

    touch_modified_at!();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phoneme {
    pub id: String,
    pub identifier: String,
    pub options: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordOption {
    pub id: String,
    pub identifier: String,
    pub option: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexeme {
    pub id: String,
    pub native: String,
    pub meaning: String,
}

/// Constructed-language definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub phonemes: Vec<Phoneme>,
    #[serde(default)]
    pub word_options: Vec<WordOption>,
    #[serde(default)]
    pub vocabulary: Vec<Lexeme>,
    #[serde(default)]
    pub pronouns: Vec<Lexeme>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl EntityRecord for Language {
    const KIND: EntityKind = EntityKind::Languages;

    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, _now_ms: i64) {}
}

#[cfg(test)]
mod tests {
    use super::{Character, EntityKind, ModifiedAt, ParagraphText, Scene};
    use serde_json::json;

    #[test]
    fn scene_keeps_unknown_fields_verbatim() {
        let raw = json!({
            "id": "s1",
            "title": "Opening",
            "summary": "",
            "paragraphs": [],
            "text": "",
            "plot_point_actions": [],
            "generateNextText": "keep me",
            "hasAI": true
        });
        let scene: Scene = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(scene.unknown.get("generateNextText"), Some(&json!("keep me")));
        assert_eq!(serde_json::to_value(&scene).unwrap(), raw);
    }

    #[test]
    fn modified_at_accepts_number_or_string() {
        let number: ModifiedAt = serde_json::from_value(json!(1700000000000_i64)).unwrap();
        let text: ModifiedAt = serde_json::from_value(json!("2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(number, ModifiedAt::Millis(1_700_000_000_000));
        assert!(matches!(text, ModifiedAt::Text(_)));
    }

    #[test]
    fn paragraph_text_accepts_rich_document() {
        let text: ParagraphText = serde_json::from_value(json!({
            "type": "doc",
            "content": [{"type": "paragraph"}]
        }))
        .unwrap();
        assert!(matches!(text, ParagraphText::Rich(_)));
    }

    #[test]
    fn character_display_name_prefers_name_parts() {
        let character: Character = serde_json::from_value(json!({
            "id": "c1",
            "picture": "",
            "name": "Old Name",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "summary": "",
            "age": "36"
        }))
        .unwrap();
        assert_eq!(character.display_name(), "Ada Lovelace");
        assert!(character.is_main_character);
    }

    #[test]
    fn structural_kinds_round_trip_through_node_kind() {
        for kind in EntityKind::ALL {
            if let Some(node_kind) = kind.node_kind() {
                assert_eq!(EntityKind::from_node_kind(node_kind), kind);
            }
        }
    }
}
