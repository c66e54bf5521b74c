//! Flat keyed entity stores.
//!
//! # Responsibility
//! - Hold one `id -> record` map per entity kind.
//! - Provide typed upsert/update/remove without structural logic.
//!
//! # Invariants
//! - Iteration order is the lexical id order (deterministic writes).
//! - `insert` keys the record by its own `id`.

use crate::model::entity::{
    Arc, Book, Chapter, Character, EntityKind, EntityRecord, Item, Language, Location, PlotPoint,
    Scene,
};
use crate::model::node::NodeKind;
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Keyed map of records of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityStore<T: EntityRecord> {
    records: BTreeMap<String, T>,
}

impl<T: EntityRecord> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<T: EntityRecord> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from an already keyed map (loader path).
    pub fn from_map(records: BTreeMap<String, T>) -> Self {
        Self { records }
    }

    pub fn kind(&self) -> EntityKind {
        T::KIND
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.records.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Inserts or replaces a record. Returns the previous value.
    pub fn insert(&mut self, record: T) -> Option<T> {
        self.records.insert(record.id().to_string(), record)
    }

    /// Applies `apply` to an existing record. Returns `false` when absent.
    pub fn update(&mut self, id: &str, apply: impl FnOnce(&mut T)) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                apply(record);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.records.remove(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, T> {
        self.records.iter()
    }
}

/// All entity stores of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStores {
    pub item: EntityStore<Item>,
    pub scene: EntityStore<Scene>,
    pub book: EntityStore<Book>,
    pub arc: EntityStore<Arc>,
    pub chapter: EntityStore<Chapter>,
    pub characters: EntityStore<Character>,
    pub locations: EntityStore<Location>,
    pub plot_points: EntityStore<PlotPoint>,
    pub languages: EntityStore<Language>,
}

impl EntityStores {
    /// Record count for one kind.
    pub fn len_of(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Item => self.item.len(),
            EntityKind::Scene => self.scene.len(),
            EntityKind::Book => self.book.len(),
            EntityKind::Arc => self.arc.len(),
            EntityKind::Chapter => self.chapter.len(),
            EntityKind::Characters => self.characters.len(),
            EntityKind::Locations => self.locations.len(),
            EntityKind::PlotPoints => self.plot_points.len(),
            EntityKind::Languages => self.languages.len(),
        }
    }

    /// Ids of one kind, in store order.
    pub fn ids_of(&self, kind: EntityKind) -> Vec<&str> {
        match kind {
            EntityKind::Item => self.item.ids().collect(),
            EntityKind::Scene => self.scene.ids().collect(),
            EntityKind::Book => self.book.ids().collect(),
            EntityKind::Arc => self.arc.ids().collect(),
            EntityKind::Chapter => self.chapter.ids().collect(),
            EntityKind::Characters => self.characters.ids().collect(),
            EntityKind::Locations => self.locations.ids().collect(),
            EntityKind::PlotPoints => self.plot_points.ids().collect(),
            EntityKind::Languages => self.languages.ids().collect(),
        }
    }

    /// Whether the structural store for `kind` holds `id`.
    pub fn has_structural(&self, kind: NodeKind, id: &str) -> bool {
        match kind {
            NodeKind::Book => self.book.contains(id),
            NodeKind::Arc => self.arc.contains(id),
            NodeKind::Chapter => self.chapter.contains(id),
            NodeKind::Scene => self.scene.contains(id),
        }
    }

    /// Removes the structural record for `id`. Returns whether one existed.
    pub fn remove_structural(&mut self, kind: NodeKind, id: &str) -> bool {
        match kind {
            NodeKind::Book => self.book.remove(id).is_some(),
            NodeKind::Arc => self.arc.remove(id).is_some(),
            NodeKind::Chapter => self.chapter.remove(id).is_some(),
            NodeKind::Scene => self.scene.remove(id).is_some(),
        }
    }

    /// Title of the structural record for `id`, if present.
    pub fn structural_title(&self, kind: NodeKind, id: &str) -> Option<&str> {
        match kind {
            NodeKind::Book => self.book.get(id).map(|record| record.title.as_str()),
            NodeKind::Arc => self.arc.get(id).map(|record| record.title.as_str()),
            NodeKind::Chapter => self.chapter.get(id).map(|record| record.title.as_str()),
            NodeKind::Scene => self.scene.get(id).map(|record| record.title.as_str()),
        }
    }

    pub fn total_len(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.len_of(*kind)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::EntityStore;
    use crate::model::entity::{Item, UnknownFields};

    fn item(id: &str, name: &str) -> Item {
        Item {
            id: id.to_string(),
            modified_at: None,
            name: name.to_string(),
            unknown: UnknownFields::new(),
        }
    }

    #[test]
    fn insert_keys_by_record_id_and_replaces() {
        let mut store = EntityStore::new();
        assert!(store.insert(item("sword", "Sword")).is_none());
        let previous = store.insert(item("sword", "Longsword")).unwrap();
        assert_eq!(previous.name, "Sword");
        assert_eq!(store.get("sword").unwrap().name, "Longsword");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_reports_missing_record() {
        let mut store: EntityStore<Item> = EntityStore::new();
        assert!(!store.update("ghost", |record| record.name.clear()));
    }

    #[test]
    fn ids_iterate_in_lexical_order() {
        let mut store = EntityStore::new();
        store.insert(item("c", "C"));
        store.insert(item("a", "A"));
        store.insert(item("b", "B"));
        assert_eq!(store.ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
