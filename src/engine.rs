//! The staging and synchronization engine.
//!
//! [`ImageSyncEngine`] owns the pending set, the persisted mirror and the last
//! published batch, and exposes every host operation. Each operation records a
//! [`StatusMessage`] and, when host-visible state changed, calls the notify
//! callback with fresh [`HostOutputs`].
//!
//! Operations take `&mut self`, so one engine handles one operation at a
//! time. The encode batch is the exception: [`ImageSyncEngine::begin_batch`]
//! returns a detached future that owns its snapshot, and the host applies the
//! result later with [`ImageSyncEngine::apply_ready_batch`].

use std::rc::Rc;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};

use crate::batch::{self, Base64Encoder, Encoder, ReadyBatch};
use crate::codec;
use crate::config::{EngineConfig, KeyChangePolicy};
use crate::error::{EngineError, EngineResult};
use crate::gesture::{GestureSettings, ZoomPanEngine};
use crate::model::{ImageFile, PendingId, PendingImage, RecordId};
use crate::outputs::{HostOutputs, StatusMessage};
use crate::pending::PendingSet;
use crate::persisted::{PersistedSet, Preview};
use crate::store::{Confirm, ImageStore};
use crate::view::{Route, ViewModel};

/// How a save-all issues its creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// One create at a time, stopping at the first failure
    #[default]
    Sequential,
    /// All creates at once; successes are kept even if some fail
    Concurrent,
}

type NotifyFn = Box<dyn FnMut(&HostOutputs)>;

/// Staging engine bound to one image store.
pub struct ImageSyncEngine<S: ImageStore> {
    store: S,
    confirm: Box<dyn Confirm>,
    encoder: Rc<dyn Encoder>,
    config: EngineConfig,
    key: Option<String>,
    pending: PendingSet,
    persisted: PersistedSet,
    ready: Option<ReadyBatch>,
    batch_generation: u64,
    /// Oldest batch revision that may still be published
    min_revision: u64,
    status: Option<StatusMessage>,
    notify: Option<NotifyFn>,
}

impl<S: ImageStore> ImageSyncEngine<S> {
    /// Create an engine with the base64 encoder and no key.
    pub fn new(store: S, confirm: impl Confirm + 'static, config: EngineConfig) -> Self {
        Self {
            store,
            confirm: Box::new(confirm),
            encoder: Rc::new(Base64Encoder),
            config,
            key: None,
            pending: PendingSet::new(),
            persisted: PersistedSet::new(),
            ready: None,
            batch_generation: 0,
            min_revision: 0,
            status: None,
            notify: None,
        }
    }

    /// Replace the encoder used by future batches.
    pub fn with_encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Rc::new(encoder);
        self
    }

    /// Register the callback invoked whenever host outputs change.
    pub fn set_notify(&mut self, notify: impl FnMut(&HostOutputs) + 'static) {
        self.notify = Some(Box::new(notify));
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current grouping key.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Staged images.
    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    /// Stored images for the current key.
    pub fn persisted(&self) -> &PersistedSet {
        &self.persisted
    }

    /// Last published batch, if any.
    pub fn ready_batch(&self) -> Option<&ReadyBatch> {
        self.ready.as_ref()
    }

    /// Status of the last operation.
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Display list: stored images first, then staged ones.
    pub fn view(&self) -> ViewModel<'_> {
        ViewModel::reconcile(&self.persisted, &self.pending)
    }

    /// Everything the host reads back.
    pub fn outputs(&self) -> HostOutputs {
        HostOutputs::build(
            self.key.as_deref(),
            self.ready.as_ref(),
            self.pending.len(),
            self.persisted.len() + self.pending.len(),
        )
    }

    fn report(&mut self, message: StatusMessage) {
        message.log();
        self.status = Some(message);
    }

    fn fail(&mut self, context: &str, error: EngineError) -> EngineError {
        self.report(StatusMessage::error(format!("{}: {}", context, error)));
        error
    }

    /// Bring the published batch in line with the pending set and notify.
    fn changed(&mut self) {
        if let Some(ready) = self.ready.as_mut() {
            ready.retain_live(&self.pending);
        }
        let outputs = self.outputs();
        if let Some(notify) = self.notify.as_mut() {
            notify(&outputs);
        }
    }

    /// Change the grouping key and load its stored images.
    ///
    /// Pending images are dropped or kept according to the configured
    /// [`KeyChangePolicy`]. Setting the same key again is a no-op once its
    /// images have loaded; after a failed load it retries the query.
    pub async fn set_key(&mut self, key: impl Into<String>) -> EngineResult<usize> {
        let key = key.into();
        let same_key = self.key.as_deref() == Some(key.as_str());
        if same_key && self.persisted.key() == Some(key.as_str()) {
            return Ok(self.persisted.len());
        }

        if !same_key
            && self.config.sync.key_change_policy == KeyChangePolicy::Discard
            && !self.pending.is_empty()
        {
            log::info!("Key changed, discarding {} unsaved image(s)", self.pending.len());
            self.pending.clear();
            self.ready = None;
        }

        if key.is_empty() {
            self.key = None;
            self.persisted.clear();
            self.changed();
            return Ok(0);
        }

        self.key = Some(key);
        let result = self.reload().await;
        self.changed();
        result
    }

    /// Re-query the stored images for the current key.
    pub async fn reload(&mut self) -> EngineResult<usize> {
        let Some(key) = self.key.clone() else {
            return Ok(self.persisted.len());
        };

        self.report(StatusMessage::info("Loading stored images..."));
        let loaded = self.persisted.load_by_key(&self.store, &key).await;
        match loaded {
            Ok(count) => {
                self.report(StatusMessage::success(format!("Loaded {} image(s)", count)));
                Ok(count)
            }
            Err(e) => Err(self.fail("Failed to load stored images", e)),
        }
    }

    /// Stage the image-typed entries of `files`.
    ///
    /// The published batch no longer covers the pending list afterwards, so
    /// it is withdrawn along with any batch already running. Hosts re-encode
    /// with [`process_pending`](Self::process_pending) or use
    /// [`add_images`](Self::add_images).
    pub fn add_files(&mut self, files: Vec<ImageFile>) -> EngineResult<usize> {
        match self.pending.add(files) {
            Ok(ids) => {
                self.ready = None;
                self.min_revision = self.batch_generation + 1;
                self.report(StatusMessage::success(format!("Added {} image(s)", ids.len())));
                self.changed();
                Ok(ids.len())
            }
            Err(e) => {
                self.report(StatusMessage::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Stage files and publish a fresh batch covering them.
    pub async fn add_images(&mut self, files: Vec<ImageFile>) -> EngineResult<usize> {
        let added = self.add_files(files)?;
        self.process_pending().await;
        Ok(added)
    }

    /// Remove a staged image by ID.
    pub fn remove_pending(&mut self, id: PendingId) -> Option<PendingImage> {
        let removed = self.pending.remove(id)?;
        self.report(StatusMessage::info("Removed unsaved image"));
        self.changed();
        Some(removed)
    }

    /// Remove the staged image at `ordinal`; out of range is a no-op.
    pub fn remove_pending_at(&mut self, ordinal: usize) -> Option<PendingImage> {
        let removed = self.pending.remove_at(ordinal)?;
        self.report(StatusMessage::info("Removed unsaved image"));
        self.changed();
        Some(removed)
    }

    /// Set the note of the staged image at `ordinal`.
    pub fn set_pending_note(&mut self, ordinal: usize, text: impl Into<String>) {
        self.pending.set_note(ordinal, text);
        self.changed();
    }

    /// Drop every staged image without touching the store.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
        self.ready = None;
        self.changed();
    }

    /// Edit the note of a display item, wherever it lives.
    pub async fn edit_note(&mut self, route: &Route, text: &str) -> EngineResult<()> {
        match route {
            Route::Pending(id) => {
                if !self.pending.set_note_by_id(*id, text) {
                    return Err(EngineError::NotFound(id.to_string()));
                }
                self.changed();
                Ok(())
            }
            Route::Persisted(id) => {
                let updated = self.persisted.update_note(&self.store, id, text).await;
                if let Err(e) = updated {
                    return Err(self.fail("Failed to update note", e));
                }
                self.changed();
                Ok(())
            }
        }
    }

    /// Remove a display item: staged images locally, stored ones after confirmation.
    ///
    /// Returns whether anything was removed.
    pub async fn remove(&mut self, route: &Route) -> EngineResult<bool> {
        match route {
            Route::Pending(id) => Ok(self.remove_pending(*id).is_some()),
            Route::Persisted(id) => self.delete_persisted(id).await,
        }
    }

    /// Delete one stored image after confirmation.
    pub async fn delete_persisted(&mut self, id: &RecordId) -> EngineResult<bool> {
        let result = self
            .persisted
            .delete_one(&self.store, self.confirm.as_ref(), id)
            .await;
        match result {
            Ok(true) => {
                self.report(StatusMessage::success("Image deleted"));
                self.changed();
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => Err(self.fail("Failed to delete image", e)),
        }
    }

    fn require_key(&mut self) -> EngineResult<String> {
        match self.key.clone() {
            Some(key) => Ok(key),
            None => Err(self.fail("Cannot save", EngineError::MissingKey)),
        }
    }

    /// Name written to the store for a staged image.
    fn save_name(image: &PendingImage, index: usize) -> String {
        match &image.declared_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => {
                let now_ms = web_time::SystemTime::now()
                    .duration_since(web_time::UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or_default();
                codec::save_name(&image.mime_type, now_ms, index)
            }
        }
    }

    /// Reload after writes; a failure here does not undo the writes.
    async fn reload_after_write(&mut self) -> EngineResult<()> {
        let Some(key) = self.key.clone() else {
            return Ok(());
        };
        let loaded = self.persisted.load_by_key(&self.store, &key).await;
        if let Err(e) = &loaded {
            log::warn!("Reload after write failed: {}", e);
        }
        loaded.map(|_| ())
    }

    /// Save one staged image. On success it leaves the pending set and the
    /// stored list is reloaded.
    pub async fn save_pending(&mut self, id: PendingId) -> EngineResult<RecordId> {
        let key = self.require_key()?;
        let Some(ordinal) = self.pending.ordinal_of(id) else {
            return Err(EngineError::NotFound(id.to_string()));
        };
        let Some(image) = self.pending.get(id).cloned() else {
            return Err(EngineError::NotFound(id.to_string()));
        };

        self.report(StatusMessage::info("Saving image..."));
        let name = Self::save_name(&image, ordinal);
        let group_label = self.config.sync.group_label.clone();
        let created = PersistedSet::create(&self.store, &image, name, &key, Some(&group_label)).await;
        let record_id = match created {
            Ok(record_id) => record_id,
            Err(e) => return Err(self.fail("Failed to save image", e)),
        };

        self.pending.remove(id);
        let reloaded = self.reload_after_write().await;
        self.changed();
        if let Err(e) = reloaded {
            return Err(self.fail("Image saved, but refreshing stored images failed", e));
        }
        self.report(StatusMessage::success("Image saved"));
        Ok(record_id)
    }

    /// Save the staged image at `ordinal`.
    pub async fn save_pending_at(&mut self, ordinal: usize) -> EngineResult<RecordId> {
        let id = self
            .pending
            .get_at(ordinal)
            .map(|img| img.id)
            .ok_or_else(|| EngineError::NotFound(format!("pending image #{}", ordinal)))?;
        self.save_pending(id).await
    }

    /// Save every staged image using the configured [`SaveMode`].
    pub async fn save_all(&mut self) -> EngineResult<usize> {
        let mode = if self.config.sync.concurrent_save_all {
            SaveMode::Concurrent
        } else {
            SaveMode::Sequential
        };
        self.save_all_with(mode).await
    }

    /// Save every staged image.
    ///
    /// Each image leaves the pending set as soon as its create succeeds, so a
    /// retry after a partial failure only sends what is still unsaved.
    pub async fn save_all_with(&mut self, mode: SaveMode) -> EngineResult<usize> {
        if self.pending.is_empty() {
            self.report(StatusMessage::info("No new images to save"));
            return Ok(0);
        }
        let key = self.require_key()?;
        let group_label = self.config.sync.group_label.clone();

        let batch: Vec<(PendingImage, String)> = self
            .pending
            .iter()
            .enumerate()
            .map(|(index, image)| (image.clone(), Self::save_name(image, index)))
            .collect();
        let total = batch.len();
        self.report(StatusMessage::info(format!("Saving {} image(s)...", total)));

        let outcome = match mode {
            SaveMode::Sequential => self.save_sequential(batch, &key, &group_label).await,
            SaveMode::Concurrent => self.save_concurrent(batch, &key, &group_label).await,
        };

        let reloaded = self.reload_after_write().await;
        self.changed();

        match (outcome, reloaded) {
            (Err(e), _) => Err(self.fail("Failed to save images", e)),
            (Ok(saved), Err(e)) => Err(self.fail(
                &format!("Saved {} image(s), but refreshing stored images failed", saved),
                e,
            )),
            (Ok(saved), Ok(())) => {
                self.report(StatusMessage::success(format!("Saved {} image(s)", saved)));
                Ok(saved)
            }
        }
    }

    async fn save_sequential(
        &mut self,
        batch: Vec<(PendingImage, String)>,
        key: &str,
        group_label: &str,
    ) -> EngineResult<usize> {
        let total = batch.len();
        for (saved, (image, name)) in batch.into_iter().enumerate() {
            PersistedSet::create(&self.store, &image, name, key, Some(group_label)).await?;
            self.pending.remove(image.id);
            self.report(StatusMessage::info(format!("Saved {}/{} image(s)...", saved + 1, total)));
        }
        Ok(total)
    }

    async fn save_concurrent(
        &mut self,
        batch: Vec<(PendingImage, String)>,
        key: &str,
        group_label: &str,
    ) -> EngineResult<usize> {
        let store = &self.store;
        let results = future::join_all(batch.iter().map(|(image, name)| {
            PersistedSet::create(store, image, name.clone(), key, Some(group_label))
        }))
        .await;

        let mut saved = 0;
        let mut first_error = None;
        for ((image, _), result) in batch.iter().zip(results) {
            match result {
                Ok(_) => {
                    self.pending.remove(image.id);
                    saved += 1;
                }
                Err(e) => {
                    log::warn!("Concurrent save of {} failed: {}", image.id, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(saved),
        }
    }

    /// Delete every stored image and drop every staged one, after confirmation.
    ///
    /// Stored images are deleted one by one. If a delete fails, the images
    /// before it are gone, the rest stay, and staged images are kept.
    /// Returns `Ok(false)` when there was nothing to clear or the user declined.
    pub async fn clear_all(&mut self) -> EngineResult<bool> {
        let Some(message) = self.view().clear_prompt().message() else {
            self.report(StatusMessage::info("No images to delete"));
            return Ok(false);
        };
        if !self.confirm.confirm(&message) {
            log::debug!("Clear all declined");
            return Ok(false);
        }

        self.report(StatusMessage::info("Deleting all images..."));
        let mut reloaded = Ok(());
        if !self.persisted.is_empty() {
            let ids = self.persisted.ids();
            let deleted = self.persisted.delete_all(&self.store, &ids).await;
            if let Err(partial) = deleted {
                log::error!(
                    "Deleted {} of {} stored image(s) before failing",
                    partial.deleted,
                    ids.len()
                );
                self.changed();
                return Err(self.fail("Failed to delete images", partial.into()));
            }
            reloaded = self.reload_after_write().await;
        }

        self.pending.clear();
        self.ready = None;
        self.changed();
        if let Err(e) = reloaded {
            return Err(self.fail("All images deleted, but refreshing stored images failed", e));
        }
        self.report(StatusMessage::success("All images deleted"));
        Ok(true)
    }

    /// Image bytes of a stored image, fetched on first use.
    pub async fn fetch_image(&mut self, id: &RecordId) -> EngineResult<&[u8]> {
        self.persisted.fetch_image(&self.store, id).await
    }

    /// Load a stored image for the full-size viewer.
    pub async fn open_preview(&mut self, id: &RecordId) -> EngineResult<Preview> {
        self.report(StatusMessage::info("Preparing image..."));
        let fetched = PersistedSet::fetch_preview(&self.store, id).await;
        match fetched {
            Ok(preview) => {
                self.report(StatusMessage::success("Image displayed"));
                Ok(preview)
            }
            Err(e) => Err(self.fail("Failed to display image", e)),
        }
    }

    /// Zoom/pan engine for a viewer element, using the configured timings.
    pub fn new_viewer(&self, element_size: (f32, f32)) -> ZoomPanEngine {
        ZoomPanEngine::new(element_size, GestureSettings::from(&self.config.viewer))
    }

    /// Start encoding the current pending list.
    ///
    /// The returned future owns a snapshot and does not borrow the engine;
    /// the pending set may change while it runs. Hand its output to
    /// [`apply_ready_batch`](Self::apply_ready_batch).
    pub fn begin_batch(&mut self) -> LocalBoxFuture<'static, ReadyBatch> {
        self.batch_generation += 1;
        let snapshot = self.pending.snapshot(self.batch_generation);
        let encoder = Rc::clone(&self.encoder);
        log::debug!(
            "Batch r{} started with {} image(s)",
            self.batch_generation,
            snapshot.len()
        );
        async move { batch::encode_batch(snapshot, &*encoder).await }.boxed_local()
    }

    /// Publish a finished batch.
    ///
    /// Batches older than the last published one, or started before the
    /// latest add, are discarded. Otherwise
    /// entries are re-resolved against the live pending list before being
    /// published. Returns whether the batch was published.
    pub fn apply_ready_batch(&mut self, mut ready: ReadyBatch) -> bool {
        if ready.revision < self.min_revision {
            log::debug!("Discarding stale batch r{}", ready.revision);
            return false;
        }

        let dropped = ready.retain_live(&self.pending);
        if dropped > 0 {
            log::debug!("Batch r{}: {} image(s) removed while encoding", ready.revision, dropped);
        }
        if !ready.is_complete() {
            self.report(StatusMessage::error(format!(
                "{} image(s) could not be encoded",
                ready.failed.len()
            )));
        }

        self.min_revision = ready.revision;
        self.ready = Some(ready);
        self.changed();
        true
    }

    /// Encode the pending list and publish it in one step.
    pub async fn process_pending(&mut self) -> bool {
        if self.pending.is_empty() {
            self.ready = None;
            self.changed();
            return false;
        }
        let ready = self.begin_batch().await;
        self.apply_ready_batch(ready)
    }
}
