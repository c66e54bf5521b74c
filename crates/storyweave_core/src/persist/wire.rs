//! Serde shapes of `index.json`.

use crate::model::document::Document;
use crate::model::entity::{
    Arc, Book, Chapter, Character, Item, Language, Location, PlotPoint, Scene,
};
use crate::model::node::Node;
use crate::model::story::StoryMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type Inline<T> = Option<BTreeMap<String, T>>;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedIndex {
    pub story: PersistedStory,
    #[serde(default)]
    pub language: PersistedLanguage,
}

/// Story metadata, structure, and (legacy, pre-split) inline entity maps.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedStory {
    pub structure: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Inline<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Inline<Scene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Inline<Book>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc: Inline<Arc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Inline<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Inline<Character>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Inline<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_points: Inline<PlotPoint>,
    #[serde(flatten)]
    pub meta: StoryMeta,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct PersistedLanguage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Inline<Language>,
}

impl PersistedIndex {
    /// Index content for `document` with every entity map stripped.
    pub fn stripped(document: &Document) -> Self {
        Self {
            story: PersistedStory {
                structure: document.tree().to_forest(),
                item: None,
                scene: None,
                book: None,
                arc: None,
                chapter: None,
                characters: None,
                locations: None,
                plot_points: None,
                meta: document.meta.clone(),
            },
            language: PersistedLanguage::default(),
        }
    }
}
