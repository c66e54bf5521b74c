use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use storyweave_core::{
    create_project, list_snapshots, load_project, save_project, AutosaveConfig,
    AutosaveScheduler, Document, DocumentEvent, InsertAt, NodeKind, PersistError,
    PersistOptions, ProjectSession,
};

fn small_document() -> Document {
    let mut document = Document::new("Draft");
    let book = document
        .create_structural(NodeKind::Book, None, InsertAt::End, "Book")
        .unwrap();
    let arc = document
        .create_structural(NodeKind::Arc, Some(&book), InsertAt::End, "Arc")
        .unwrap();
    let chapter = document
        .create_structural(NodeKind::Chapter, Some(&arc), InsertAt::End, "Chapter")
        .unwrap();
    document
        .create_structural(NodeKind::Scene, Some(&chapter), InsertAt::End, "Scene")
        .unwrap();
    document.drain_events();
    document
}

/// Pushes the file mtime forward, as an external editor save would.
fn bump_mtime(path: &Path, by: Duration) {
    let file = fs::File::options().write(true).open(path).unwrap();
    let current = file.metadata().unwrap().modified().unwrap();
    file.set_modified(current + by).unwrap();
}

fn tree_contents(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut contents = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                contents.insert(path.clone(), fs::read(&path).unwrap());
            }
        }
    }
    contents
}

#[test]
fn external_edit_makes_save_conflict_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let options = PersistOptions::default();
    let mut document = small_document();
    let baseline = create_project(dir.path(), &document, &options).unwrap();

    bump_mtime(&dir.path().join("index.json"), Duration::from_secs(5));
    let before = tree_contents(dir.path());

    document.meta.name = "Edited here".to_string();
    let err = save_project(dir.path(), &document, baseline, true, &options).unwrap_err();

    assert!(err.is_conflict());
    match err {
        PersistError::Conflict { expected, actual } => {
            assert_eq!(expected, baseline);
            assert_eq!(actual, Some(baseline + 5_000));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(tree_contents(dir.path()), before);
    assert!(!dir.path().join("autosave").exists());
}

#[test]
fn vanished_index_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let options = PersistOptions::default();
    let document = small_document();
    let baseline = create_project(dir.path(), &document, &options).unwrap();
    fs::remove_file(dir.path().join("index.json")).unwrap();

    let err = save_project(dir.path(), &document, baseline, false, &options).unwrap_err();
    assert!(matches!(err, PersistError::Conflict { actual: None, .. }));
}

#[test]
fn autosave_snapshots_previous_state_with_bounded_history() {
    let dir = tempfile::tempdir().unwrap();
    let options = PersistOptions {
        autosave_retention: 2,
        ..PersistOptions::default()
    };
    let mut document = small_document();
    let mut baseline = create_project(dir.path(), &document, &options).unwrap();

    for round in 1..=3 {
        document.meta.name = format!("Draft {round}");
        baseline = save_project(dir.path(), &document, baseline, true, &options).unwrap();
    }

    let snapshots = list_snapshots(dir.path()).unwrap();
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots[0].taken_at > snapshots[1].taken_at);

    let newest_index: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(snapshots[0].path.join("index.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(newest_index["story"]["name"], "Draft 2");
    assert_eq!(
        fs::read_dir(snapshots[0].path.join("scene")).unwrap().count(),
        1
    );

    let loaded = load_project(dir.path()).unwrap();
    assert_eq!(loaded.document.meta.name, "Draft 3");
    assert_eq!(loaded.last_modified, baseline);
}

#[test]
fn zero_retention_disables_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let options = PersistOptions {
        autosave_retention: 0,
        ..PersistOptions::default()
    };
    let document = small_document();
    let baseline = create_project(dir.path(), &document, &options).unwrap();
    save_project(dir.path(), &document, baseline, true, &options).unwrap();
    assert!(list_snapshots(dir.path()).unwrap().is_empty());
}

#[test]
fn session_advances_baseline_only_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let mut session =
        ProjectSession::create(dir.path(), small_document(), PersistOptions::default()).unwrap();
    let created = session.expected_last_modified();

    session.document_mut().meta.name = "Renamed".to_string();
    let saved = session.save(false).unwrap();
    assert!(saved >= created);
    assert_eq!(session.expected_last_modified(), saved);

    bump_mtime(&dir.path().join("index.json"), Duration::from_secs(5));
    session.document_mut().meta.name = "Lost edit".to_string();
    let err = session.save(false).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(session.expected_last_modified(), saved);

    session.reload().unwrap();
    assert_eq!(session.document().meta.name, "Renamed");
    assert_eq!(session.expected_last_modified(), saved + 5_000);
    assert_eq!(
        session.document_mut().drain_events(),
        vec![DocumentEvent::Replaced]
    );
    session.save(false).unwrap();
}

#[test]
fn session_open_reports_load_pruning() {
    let dir = tempfile::tempdir().unwrap();
    create_project(dir.path(), &small_document(), &PersistOptions::default()).unwrap();
    fs::write(
        dir.path().join("chapter").join("stray.json"),
        r#"{ "id": "stray", "title": "", "summary": "" }"#,
    )
    .unwrap();

    let session = ProjectSession::open(dir.path(), PersistOptions::default()).unwrap();
    assert_eq!(session.root(), dir.path());
    assert_eq!(session.pruned_on_load().len(), 1);
    assert_eq!(session.document().entities().chapter.len(), 1);
}

#[test]
fn scheduler_saves_on_interval_and_snapshots_every_nth_tick() {
    let dir = tempfile::tempdir().unwrap();
    let mut session =
        ProjectSession::create(dir.path(), small_document(), PersistOptions::default()).unwrap();
    let start = Instant::now();
    let mut scheduler =
        AutosaveScheduler::new(AutosaveConfig::new(Duration::from_secs(10), 2), start);

    assert!(scheduler
        .poll_at(start + Duration::from_secs(5), &mut session)
        .is_none());
    assert_eq!(scheduler.ticks(), 0);

    scheduler
        .poll_at(start + Duration::from_secs(10), &mut session)
        .unwrap()
        .unwrap();
    assert!(list_snapshots(dir.path()).unwrap().is_empty());
    assert!(scheduler
        .poll_at(start + Duration::from_secs(15), &mut session)
        .is_none());

    scheduler
        .poll_at(start + Duration::from_secs(20), &mut session)
        .unwrap()
        .unwrap();
    assert_eq!(scheduler.ticks(), 2);
    assert_eq!(list_snapshots(dir.path()).unwrap().len(), 1);
    assert!(scheduler.last_failure().is_none());
}

#[test]
fn focus_save_surfaces_conflict_until_reload() {
    let dir = tempfile::tempdir().unwrap();
    let mut session =
        ProjectSession::create(dir.path(), small_document(), PersistOptions::default()).unwrap();
    let start = Instant::now();
    let mut scheduler = AutosaveScheduler::new(AutosaveConfig::default(), start);

    bump_mtime(&dir.path().join("index.json"), Duration::from_secs(5));
    let err = scheduler.on_focus(start, &mut session).unwrap_err();
    assert!(err.is_conflict());
    let failure = scheduler.last_failure().unwrap();
    assert!(failure.conflict);
    assert!(failure.message.contains("modified elsewhere"));

    session.reload().unwrap();
    scheduler.on_focus(start, &mut session).unwrap();
    assert!(scheduler.last_failure().is_none());
}

#[test]
fn zero_snapshot_cadence_snapshots_every_tick() {
    let dir = tempfile::tempdir().unwrap();
    let mut session =
        ProjectSession::create(dir.path(), small_document(), PersistOptions::default()).unwrap();
    let start = Instant::now();
    let config = AutosaveConfig::new(Duration::from_secs(10), 0);
    assert_eq!(config.snapshot_every(), 1);
    let mut scheduler = AutosaveScheduler::new(config, start);

    scheduler
        .poll_at(start + Duration::from_secs(10), &mut session)
        .unwrap()
        .unwrap();
    assert_eq!(list_snapshots(dir.path()).unwrap().len(), 1);
}
