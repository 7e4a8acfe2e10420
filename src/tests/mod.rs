//! Scenario tests driving the engine end to end against the in-memory store.
//!
//! These cover behavior that spans several modules: saving and reloading,
//! bulk deletes that fail midway, batches racing with edits, key changes.

mod key_tests;
mod save_tests;

use crate::config::EngineConfig;
use crate::engine::ImageSyncEngine;
use crate::model::{ImageFile, RecordId};
use crate::store::{AlwaysConfirm, MemoryStore, RecordFields};

/// PNG-typed file of `size` bytes.
fn png(size: usize) -> ImageFile {
    ImageFile::new(vec![size as u8; size], "image/png")
}

/// Engine over a shared store handle, auto-confirming deletes.
fn engine_with(config: EngineConfig) -> (ImageSyncEngine<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    let engine = ImageSyncEngine::new(store.clone(), AlwaysConfirm, config);
    (engine, store)
}

/// Store `count` records under `key` and return their IDs.
fn seed(store: &MemoryStore, key: &str, count: usize) -> Vec<RecordId> {
    (0..count)
        .map(|i| {
            store.seed(RecordFields {
                name: Some(format!("stored{}.png", i)),
                note: Some(String::new()),
                key_data: Some(key.to_string()),
                group_label: Some("orders".to_string()),
                image_base64: Some("AAA=".to_string()),
            })
        })
        .collect()
}
