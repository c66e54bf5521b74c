//! Document-level metadata persisted in `index.json`.

use crate::model::entity::{Perspective, UnknownFields};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-story settings. All fields optional on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manga_chapter_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub royal_road_id: Option<String>,
    #[serde(default)]
    pub default_perspective: Perspective,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_protagonist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_to_royal_road: Option<bool>,
}

/// Content-addressed upload reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub hash: String,
    pub public_url: String,
}

/// Story metadata excluding tree and entity maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMeta {
    /// Legacy projects may lack an id; the loader assigns one.
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Epoch milliseconds of the last in-memory mutation.
    pub modified_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_publish_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<StorySettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_files: Option<BTreeMap<String, UploadedFile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneliner: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl StoryMeta {
    pub fn new(id: impl Into<String>, name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            modified_time: now_ms,
            last_publish_time: None,
            settings: None,
            uploaded_files: None,
            oneliner: None,
            unknown: UnknownFields::new(),
        }
    }
}
