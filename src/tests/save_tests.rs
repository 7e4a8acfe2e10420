//! Tests for saving staged images.

use super::{engine_with, png, seed};
use crate::config::EngineConfig;
use crate::engine::SaveMode;
use crate::error::EngineError;
use crate::outputs::StatusKind;
use crate::store::{ImageStore, Operation, Select};

#[test]
fn test_saved_image_moves_from_pending_to_persisted() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("order-1")).unwrap();
    engine.add_files(vec![png(10).with_name("receipt.png")]).unwrap();
    let id = engine.pending().get_at(0).unwrap().id;

    let record_id = pollster::block_on(engine.save_pending(id)).unwrap();

    assert!(engine.pending().is_empty());
    assert_eq!(engine.persisted().len(), 1);
    let stored = engine.persisted().get(&record_id).unwrap();
    assert_eq!(stored.name, "receipt.png");
    assert_eq!(stored.key_data, "order-1");
    assert_eq!(stored.group_label.as_deref(), Some("unknown_table"));
    assert_eq!(store.calls(Operation::Query), 2);
    assert_eq!(engine.status().unwrap().kind, StatusKind::Success);
}

#[test]
fn test_failed_save_leaves_pending_untouched() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("order-1")).unwrap();
    engine.add_files(vec![png(10)]).unwrap();
    engine.set_pending_note(0, "keep me");
    let id = engine.pending().get_at(0).unwrap().id;

    store.fail_nth(Operation::Create, 1);
    let result = pollster::block_on(engine.save_pending(id));

    assert!(matches!(result, Err(EngineError::RemoteWrite(_))));
    assert_eq!(engine.pending().len(), 1);
    assert_eq!(engine.pending().get(id).unwrap().note, "keep me");
    assert!(engine.persisted().is_empty());
    assert!(store.records().is_empty());
    assert_eq!(engine.status().unwrap().kind, StatusKind::Error);
}

#[test]
fn test_unnamed_image_gets_timestamped_name() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("k")).unwrap();
    engine.add_files(vec![png(3)]).unwrap();

    let record_id = pollster::block_on(engine.save_pending_at(0)).unwrap();
    let record = pollster::block_on(store.retrieve_record(&record_id, Select::All)).unwrap();
    let name = record.name.unwrap();
    assert!(name.starts_with("Image_"));
    assert!(name.ends_with("_0.png"));
    assert_eq!(record.image_base64.as_deref(), Some("AwMD"));
}

#[test]
fn test_save_pending_at_out_of_range() {
    let (mut engine, _store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("k")).unwrap();
    let result = pollster::block_on(engine.save_pending_at(3));
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[test]
fn test_sequential_save_all_stops_and_retry_does_not_duplicate() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("k")).unwrap();
    engine
        .add_files(vec![
            png(1).with_name("a.png"),
            png(2).with_name("b.png"),
            png(3).with_name("c.png"),
        ])
        .unwrap();

    store.fail_nth(Operation::Create, 2);
    let result = pollster::block_on(engine.save_all());
    assert!(matches!(result, Err(EngineError::RemoteWrite(_))));
    assert_eq!(store.calls(Operation::Create), 2);

    let left: Vec<String> = engine.pending().iter().map(|img| img.display_name(0)).collect();
    assert_eq!(left, vec!["b.png", "c.png"]);
    assert_eq!(engine.persisted().len(), 1);

    let saved = pollster::block_on(engine.save_all()).unwrap();
    assert_eq!(saved, 2);
    assert!(engine.pending().is_empty());
    assert_eq!(store.records().len(), 3);

    let names: Vec<&str> = engine.persisted().iter().map(|img| img.name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
}

#[test]
fn test_concurrent_save_all_keeps_successes() {
    let mut config = EngineConfig::default();
    config.sync.concurrent_save_all = true;
    let (mut engine, store) = engine_with(config);
    pollster::block_on(engine.set_key("k")).unwrap();
    engine
        .add_files(vec![
            png(1).with_name("a.png"),
            png(2).with_name("b.png"),
            png(3).with_name("c.png"),
        ])
        .unwrap();

    store.fail_nth(Operation::Create, 2);
    let result = pollster::block_on(engine.save_all());

    assert!(matches!(result, Err(EngineError::RemoteWrite(_))));
    assert_eq!(store.calls(Operation::Create), 3);
    assert_eq!(engine.persisted().len(), 2);
    assert_eq!(engine.pending().len(), 1);
    assert_eq!(
        engine.pending().get_at(0).unwrap().declared_name.as_deref(),
        Some("b.png")
    );
}

#[test]
fn test_concurrent_mode_saves_everything() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("k")).unwrap();
    seed(&store, "k", 1);
    engine.add_files(vec![png(1), png(2)]).unwrap();

    let saved = pollster::block_on(engine.save_all_with(SaveMode::Concurrent)).unwrap();
    assert_eq!(saved, 2);
    assert!(engine.pending().is_empty());
    assert_eq!(engine.persisted().len(), 3);
    assert_eq!(engine.view().total(), 3);
}

#[test]
fn test_save_all_with_nothing_pending_is_info() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("k")).unwrap();
    assert_eq!(pollster::block_on(engine.save_all()).unwrap(), 0);
    assert_eq!(engine.status().unwrap().kind, StatusKind::Info);
    assert_eq!(store.calls(Operation::Create), 0);
}

#[test]
fn test_refresh_failure_after_save_is_reported() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("k")).unwrap();
    engine.add_files(vec![png(4).with_name("x.png")]).unwrap();
    let id = engine.pending().get_at(0).unwrap().id;

    store.fail_nth(Operation::Query, 1);
    let result = pollster::block_on(engine.save_pending(id));

    assert!(matches!(result, Err(EngineError::RemoteQuery(_))));
    let status = engine.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.starts_with("Image saved, but refreshing"));
    // The create went through, so the image is no longer pending
    assert!(engine.pending().is_empty());
    assert_eq!(store.records().len(), 1);

    assert_eq!(pollster::block_on(engine.reload()).unwrap(), 1);
    assert_eq!(engine.view().breakdown(), "1 saved");
}

#[test]
fn test_refresh_failure_after_save_all_is_reported() {
    let (mut engine, store) = engine_with(EngineConfig::default());
    pollster::block_on(engine.set_key("k")).unwrap();
    engine.add_files(vec![png(1), png(2)]).unwrap();

    store.fail_nth(Operation::Query, 1);
    let result = pollster::block_on(engine.save_all());

    assert!(matches!(result, Err(EngineError::RemoteQuery(_))));
    assert_eq!(engine.status().unwrap().kind, StatusKind::Error);
    assert!(engine.pending().is_empty());
    assert_eq!(store.records().len(), 2);
}
