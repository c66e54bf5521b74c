use storyweave_core::model::entity::{Item, UnknownFields};
use storyweave_core::{
    validate_document, Document, DocumentEvent, EntityKind, InsertAt, Node, NodeKind, NodeType,
    TreeError, ValidationError,
};

struct Outline {
    book: String,
    arc: String,
    chapter: String,
    scenes: Vec<String>,
}

fn outline(document: &mut Document) -> Outline {
    let book = document
        .create_structural(NodeKind::Book, None, InsertAt::End, "Book")
        .unwrap();
    let arc = document
        .create_structural(NodeKind::Arc, Some(&book), InsertAt::End, "Arc")
        .unwrap();
    let chapter = document
        .create_structural(NodeKind::Chapter, Some(&arc), InsertAt::End, "Chapter")
        .unwrap();
    let scenes = ["Opening", "Middle", "End"]
        .into_iter()
        .map(|title| {
            document
                .create_structural(NodeKind::Scene, Some(&chapter), InsertAt::End, title)
                .unwrap()
        })
        .collect();
    Outline {
        book,
        arc,
        chapter,
        scenes,
    }
}

#[test]
fn new_document_is_empty_and_valid() {
    let document = Document::new("Untitled");
    assert!(!document.meta.id.is_empty());
    assert_eq!(document.meta.name, "Untitled");
    assert!(document.tree().is_empty());
    assert_eq!(document.entities().total_len(), 0);
    validate_document(&document).unwrap();
}

#[test]
fn create_structural_adds_node_and_record_together() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);

    assert_eq!(document.tree().len(), 6);
    assert_eq!(document.entities().scene.len(), 3);
    assert_eq!(document.entities().book.get(&ids.book).unwrap().title, "Book");
    assert!(document.tree().find_node(&ids.chapter).unwrap().is_open());
    assert!(document.check_consistency().is_clean());
    validate_document(&document).unwrap();

    let events = document.drain_events();
    assert_eq!(events.len(), 6);
    assert_eq!(
        events[0],
        DocumentEvent::NodeCreated {
            id: ids.book.clone(),
            kind: NodeKind::Book
        }
    );
    assert!(document.drain_events().is_empty());
}

#[test]
fn create_before_and_after_anchor() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);
    let prologue = document
        .create_structural(
            NodeKind::Scene,
            Some(&ids.chapter),
            InsertAt::Before(&ids.scenes[0]),
            "Prologue",
        )
        .unwrap();
    let interlude = document
        .create_structural(
            NodeKind::Scene,
            Some(&ids.chapter),
            InsertAt::After(&ids.scenes[1]),
            "Interlude",
        )
        .unwrap();

    let titles: Vec<&str> = document
        .scenes_in_order()
        .into_iter()
        .map(|scene| scene.title.as_str())
        .collect();
    assert_eq!(
        titles,
        vec!["Prologue", "Opening", "Middle", "Interlude", "End"]
    );
    assert!(document.entities().scene.contains(&prologue));
    assert!(document.entities().scene.contains(&interlude));
}

#[test]
fn create_rejects_wrong_level_without_adding_a_record() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);
    document.drain_events();

    let err = document
        .create_structural(NodeKind::Scene, Some(&ids.arc), InsertAt::End, "Lost")
        .unwrap_err();
    assert!(matches!(err, TreeError::InvalidChildKind { .. }));
    assert_eq!(document.entities().scene.len(), 3);
    assert!(document.drain_events().is_empty());
}

#[test]
fn delete_structural_purges_subtree_records() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);
    document.drain_events();

    let removed = document.delete_structural(&ids.chapter).unwrap();
    assert_eq!(removed.subtree_len(), 4);
    assert!(document.entities().chapter.is_empty());
    assert!(document.entities().scene.is_empty());
    assert_eq!(document.entities().arc.len(), 1);
    assert!(document.check_consistency().is_clean());
    assert_eq!(
        document.drain_events(),
        vec![DocumentEvent::NodeRemoved {
            id: ids.chapter.clone(),
            purged_records: 4
        }]
    );

    assert!(document.delete_structural(&ids.chapter).is_none());
}

#[test]
fn plain_tree_removal_leaves_orphans_for_the_caller() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);

    document.tree_mut().remove_node(&ids.scenes[2]);
    let report = document.check_consistency();
    assert!(report.dangling_nodes.is_empty());
    assert_eq!(
        report.orphan_records,
        vec![(EntityKind::Scene, ids.scenes[2].clone())]
    );
    assert!(matches!(
        validate_document(&document),
        Err(ValidationError::OrphanRecord { .. })
    ));

    let pruned = document.prune_orphan_records();
    assert_eq!(pruned.len(), 1);
    validate_document(&document).unwrap();
}

#[test]
fn node_without_record_is_dangling() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);
    document
        .tree_mut()
        .append_node(Node::new("loose", "Loose", NodeKind::Scene), Some(&ids.chapter), None)
        .unwrap();

    assert_eq!(
        validate_document(&document).unwrap_err(),
        ValidationError::DanglingNode {
            kind: NodeKind::Scene,
            id: "loose".to_string()
        }
    );
}

#[test]
fn rename_keeps_node_and_record_in_sync() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);
    document.meta.modified_time = 0;

    document
        .rename_structural(&ids.scenes[0], "Cold Open")
        .unwrap();
    assert_eq!(
        document.tree().find_node(&ids.scenes[0]).unwrap().name(),
        "Cold Open"
    );
    assert_eq!(
        document.entities().scene.get(&ids.scenes[0]).unwrap().title,
        "Cold Open"
    );
    assert_eq!(
        document
            .entities()
            .structural_title(NodeKind::Scene, &ids.scenes[0]),
        Some("Cold Open")
    );
    assert_eq!(
        document.entities().structural_title(NodeKind::Book, &ids.scenes[0]),
        None
    );
    assert!(document.meta.modified_time > 0);

    assert!(matches!(
        document.rename_structural("ghost", "x"),
        Err(TreeError::NodeNotFound(_))
    ));
}

#[test]
fn move_and_toggle_emit_events() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);
    document.drain_events();

    document
        .move_structural(&ids.scenes[0], Some(&ids.chapter), Some(&ids.scenes[2]))
        .unwrap();
    document.move_structural("ghost", None, None).unwrap();
    let node_type = document.toggle_story_node(&ids.arc, true).unwrap();

    assert_eq!(node_type, NodeType::Context);
    assert_eq!(
        document.drain_events(),
        vec![
            DocumentEvent::NodeMoved {
                id: ids.scenes[0].clone(),
                parent_id: Some(ids.chapter.clone())
            },
            DocumentEvent::NodeTypeChanged {
                id: ids.arc.clone(),
                node_type: NodeType::Context
            },
        ]
    );
    let order: Vec<&str> = document
        .scenes_in_order()
        .into_iter()
        .map(|scene| scene.id.as_str())
        .collect();
    assert_eq!(
        order,
        vec![
            ids.scenes[1].as_str(),
            ids.scenes[2].as_str(),
            ids.scenes[0].as_str()
        ]
    );
    assert_eq!(
        document
            .tree()
            .find_node(&ids.scenes[1])
            .unwrap()
            .node_type(),
        NodeType::Context
    );
}

#[test]
fn flat_records_do_not_need_tree_nodes() {
    let mut document = Document::new("Saga");
    document.entities_mut().item.insert(Item {
        id: "rope".to_string(),
        modified_at: None,
        name: "Rope".to_string(),
        unknown: UnknownFields::new(),
    });
    assert!(document.check_consistency().is_clean());
    validate_document(&document).unwrap();
}

#[test]
fn record_keyed_under_foreign_id_is_rejected() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);
    document
        .entities_mut()
        .scene
        .update(&ids.scenes[0], |scene| scene.id = "other".to_string());

    assert!(matches!(
        validate_document(&document),
        Err(ValidationError::KeyMismatch { .. })
    ));
}

#[test]
fn replace_with_swaps_everything_and_notifies() {
    let mut document = Document::new("First");
    outline(&mut document);
    document.drain_events();

    let replacement = Document::new("Second");
    let replacement_id = replacement.meta.id.clone();
    document.replace_with(replacement);

    assert_eq!(document.meta.id, replacement_id);
    assert!(document.tree().is_empty());
    assert_eq!(document.entities().total_len(), 0);
    assert_eq!(document.drain_events(), vec![DocumentEvent::Replaced]);
}

#[test]
fn observers_pull_each_event_once_and_plain_access_is_silent() {
    let mut document = Document::new("Saga");
    let ids = outline(&mut document);
    document.drain_events();

    document
        .tree_mut()
        .set_open(&ids.book, false)
        .unwrap();
    document.entities_mut().scene.update(&ids.scenes[0], |scene| {
        scene.title = "Quiet".to_string();
    });
    assert!(document.drain_events().is_empty());

    document.rename_structural(&ids.scenes[1], "Loud").unwrap();
    assert_eq!(
        document.drain_events(),
        vec![DocumentEvent::NodeRenamed {
            id: ids.scenes[1].clone()
        }]
    );
    assert!(document.drain_events().is_empty());
}
