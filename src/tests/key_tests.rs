//! Tests for grouping key changes and note edits on stored images.

use super::{engine_with, png, seed};
use crate::config::{EngineConfig, KeyChangePolicy};
use crate::error::EngineError;
use crate::outputs::StatusKind;
use crate::store::{ImageStore, Operation, Select};
use crate::view::Route;

#[test]
fn test_key_change_discards_pending_by_default() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    seed(&store, "a", 1);
    seed(&store, "b", 2);

    assert_eq!(pollster::block_on(engine.set_key("a")).unwrap(), 1);
    engine.add_files(vec![png(1)]).unwrap();
    pollster::block_on(engine.process_pending());

    assert_eq!(pollster::block_on(engine.set_key("b")).unwrap(), 2);
    assert!(engine.pending().is_empty());
    assert!(engine.ready_batch().is_none());
    let outputs = engine.outputs();
    assert_eq!(outputs.key_data_field, "b");
    assert_eq!(outputs.images_count, 2);
}

#[test]
fn test_key_change_keeps_pending_when_configured() {
    let mut config = EngineConfig::default();
    config.sync.key_change_policy = KeyChangePolicy::Keep;
    let (mut engine, store) = engine_with(config);
    seed(&store, "b", 1);

    pollster::block_on(engine.set_key("a")).unwrap();
    engine.add_files(vec![png(1)]).unwrap();
    pollster::block_on(engine.set_key("b")).unwrap();

    assert_eq!(engine.pending().len(), 1);
    assert_eq!(engine.view().breakdown(), "1 saved, 1 new");

    pollster::block_on(engine.save_all()).unwrap();
    assert!(store.records().iter().all(|r| r.key_data.as_deref() == Some("b")));
}

#[test]
fn test_same_key_does_not_requery() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("a")).unwrap();
    pollster::block_on(engine.set_key("a")).unwrap();
    assert_eq!(store.calls(Operation::Query), 1);
}

#[test]
fn test_failed_load_keeps_previous_list() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    seed(&store, "a", 2);
    pollster::block_on(engine.set_key("a")).unwrap();

    store.fail_nth(Operation::Query, 1);
    let result = pollster::block_on(engine.set_key("b"));
    assert!(matches!(result, Err(EngineError::RemoteQuery(_))));
    assert_eq!(engine.persisted().len(), 2);
    assert_eq!(engine.status().unwrap().kind, StatusKind::Error);

    // A later reload picks the new key up
    assert_eq!(pollster::block_on(engine.reload()).unwrap(), 0);
}

#[test]
fn test_empty_key_clears_persisted() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    seed(&store, "a", 2);
    pollster::block_on(engine.set_key("a")).unwrap();
    assert_eq!(pollster::block_on(engine.set_key("")).unwrap(), 0);
    assert!(engine.key().is_none());
    assert!(engine.persisted().is_empty());
}

#[test]
fn test_edit_note_routes() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    let ids = seed(&store, "k", 1);
    pollster::block_on(engine.set_key("k")).unwrap();
    engine.add_files(vec![png(1)]).unwrap();

    let stored = engine.view().route(0).unwrap();
    let staged = engine.view().route(1).unwrap();
    pollster::block_on(engine.edit_note(&stored, "remote note")).unwrap();
    pollster::block_on(engine.edit_note(&staged, "local note")).unwrap();

    let record = pollster::block_on(store.retrieve_record(&ids[0], Select::All)).unwrap();
    assert_eq!(record.note.as_deref(), Some("remote note"));
    assert_eq!(engine.persisted().get(&ids[0]).unwrap().note, "remote note");
    assert_eq!(engine.pending().note_at(0), "local note");
    assert_eq!(store.calls(Operation::Update), 1);

    let Route::Pending(pending_id) = staged else {
        panic!("second item should be staged");
    };
    engine.remove_pending(pending_id);
    let result = pollster::block_on(engine.edit_note(&staged, "gone"));
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[test]
fn test_failed_remote_note_edit_is_not_applied() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    let ids = seed(&store, "k", 1);
    pollster::block_on(engine.set_key("k")).unwrap();

    store.fail_nth(Operation::Update, 1);
    let route = Route::Persisted(ids[0].clone());
    assert!(pollster::block_on(engine.edit_note(&route, "lost")).is_err());
    assert_eq!(engine.persisted().get(&ids[0]).unwrap().note, "");
}

#[test]
fn test_preview_and_lazy_fetch() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    let ids = seed(&store, "k", 1);
    pollster::block_on(engine.set_key("k")).unwrap();

    let preview = pollster::block_on(engine.open_preview(&ids[0])).unwrap();
    assert_eq!(preview.name, "stored0.png");
    assert_eq!(preview.bytes, vec![0u8, 0]);

    let bytes = pollster::block_on(engine.fetch_image(&ids[0])).unwrap().to_vec();
    assert_eq!(bytes, vec![0u8, 0]);
    // Payload came with the query, so no extra retrieve was needed
    assert_eq!(store.calls(Operation::Retrieve), 1);

    let viewer = engine.new_viewer((400.0, 300.0));
    assert_eq!(viewer.transform().scale, 1.0);
}

#[test]
fn test_same_key_retries_after_failed_load() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    seed(&store, "a", 2);
    seed(&store, "b", 1);
    pollster::block_on(engine.set_key("a")).unwrap();

    store.fail_nth(Operation::Query, 1);
    assert!(pollster::block_on(engine.set_key("b")).is_err());
    assert_eq!(engine.persisted().key(), Some("a"));

    assert_eq!(pollster::block_on(engine.set_key("b")).unwrap(), 1);
    assert_eq!(engine.persisted().key(), Some("b"));
    assert_eq!(store.calls(Operation::Query), 3);

    // Loaded now, so a further call is a no-op
    pollster::block_on(engine.set_key("b")).unwrap();
    assert_eq!(store.calls(Operation::Query), 3);
}
