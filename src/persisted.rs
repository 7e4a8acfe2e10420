//! Mirror of the images already stored for the current grouping key.
//!
//! The local list is only ever replaced by a fresh query or trimmed after a
//! confirmed remote delete. New records are never synthesized locally; after
//! a create the caller reloads from the store.

use crate::codec;
use crate::constants::DEFAULT_GROUP_LABEL;
use crate::error::{EngineError, EngineResult, StoreError};
use crate::model::{PendingImage, PersistedImage, RecordId};
use crate::store::{Confirm, Filter, ImageStore, Record, RecordFields, Select};

/// Confirmation text shown before deleting one stored image.
pub const DELETE_ONE_PROMPT: &str = "Are you sure you want to delete this image from the store?";

/// Ordered list of stored images for one grouping key.
#[derive(Debug, Clone, Default)]
pub struct PersistedSet {
    items: Vec<PersistedImage>,
    key: Option<String>,
}

/// Outcome of a bulk delete that stopped early.
#[derive(Debug)]
pub struct PartialDelete {
    /// Records deleted before the failure
    pub deleted: usize,
    /// Record whose delete failed
    pub failed_id: RecordId,
    /// Store error for the failed delete
    pub error: StoreError,
}

impl From<PartialDelete> for EngineError {
    fn from(partial: PartialDelete) -> Self {
        EngineError::RemoteWrite(partial.error)
    }
}

impl From<Record> for PersistedImage {
    fn from(record: Record) -> Self {
        // Payloads that fail to decode are left unfetched and retried lazily
        let image_bytes = record
            .image_base64
            .as_deref()
            .and_then(|text| codec::decode(text).ok());
        Self {
            remote_id: record.id,
            name: record.name.unwrap_or_default(),
            note: record.note.unwrap_or_default(),
            image_bytes,
            key_data: record.key_data.unwrap_or_default(),
            group_label: record.group_label,
        }
    }
}

impl PersistedSet {
    /// Create an empty set with no key loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored images.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if no images are stored for the key.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in store order.
    pub fn iter(&self) -> impl Iterator<Item = &PersistedImage> {
        self.items.iter()
    }

    /// Look up an image by record ID.
    pub fn get(&self, id: &RecordId) -> Option<&PersistedImage> {
        self.items.iter().find(|img| &img.remote_id == id)
    }

    /// Key of the last successful load.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// IDs of every stored image, in order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.items.iter().map(|img| img.remote_id.clone()).collect()
    }

    /// Forget every stored image without touching the store.
    pub fn clear(&mut self) {
        self.items.clear();
        self.key = None;
    }

    /// Replace the list with every record whose key equals `key`.
    ///
    /// On failure the previous list is kept and [`EngineError::RemoteQuery`]
    /// is returned.
    pub async fn load_by_key<S>(&mut self, store: &S, key: &str) -> EngineResult<usize>
    where
        S: ImageStore + ?Sized,
    {
        let records = store
            .query(&Filter::KeyEquals(key.to_string()))
            .await
            .map_err(EngineError::RemoteQuery)?;

        self.items = records.into_iter().map(PersistedImage::from).collect();
        self.key = Some(key.to_string());
        log::info!("Loaded {} stored image(s) for key '{}'", self.items.len(), key);
        Ok(self.items.len())
    }

    /// Write one pending image to the store as a new record.
    ///
    /// Does not touch any local list; the caller removes the pending image and
    /// reloads on success.
    pub async fn create<S>(
        store: &S,
        image: &PendingImage,
        name: String,
        key: &str,
        group_label: Option<&str>,
    ) -> EngineResult<RecordId>
    where
        S: ImageStore + ?Sized,
    {
        let fields = RecordFields {
            name: Some(name),
            note: Some(image.note.clone()),
            key_data: Some(key.to_string()),
            group_label: Some(group_label.unwrap_or(DEFAULT_GROUP_LABEL).to_string()),
            image_base64: Some(codec::encode(&image.bytes)),
        };
        let id = store
            .create_record(fields)
            .await
            .map_err(EngineError::RemoteWrite)?;
        log::debug!("Created record {} from {}", id, image.id);
        Ok(id)
    }

    /// Change the note of a stored image.
    ///
    /// The local copy is patched only after the store accepted the update.
    pub async fn update_note<S>(
        &mut self,
        store: &S,
        id: &RecordId,
        text: &str,
    ) -> EngineResult<()>
    where
        S: ImageStore + ?Sized,
    {
        store
            .update_record(id, RecordFields::note(text))
            .await
            .map_err(EngineError::RemoteWrite)?;

        if let Some(image) = self.items.iter_mut().find(|img| &img.remote_id == id) {
            image.note = text.to_string();
        }
        Ok(())
    }

    /// Delete one stored image after asking for confirmation.
    ///
    /// Returns `Ok(false)` without calling the store if the user declines.
    pub async fn delete_one<S>(
        &mut self,
        store: &S,
        confirm: &dyn Confirm,
        id: &RecordId,
    ) -> EngineResult<bool>
    where
        S: ImageStore + ?Sized,
    {
        if !confirm.confirm(DELETE_ONE_PROMPT) {
            log::debug!("Delete of {} declined", id);
            return Ok(false);
        }

        store
            .delete_record(id)
            .await
            .map_err(EngineError::RemoteWrite)?;
        self.items.retain(|img| &img.remote_id != id);
        Ok(true)
    }

    /// Delete every image in `ids`, one at a time, stopping at the first failure.
    ///
    /// Images deleted before the failure are removed locally; the failing one
    /// and everything after it stay.
    pub async fn delete_all<S>(&mut self, store: &S, ids: &[RecordId]) -> Result<usize, PartialDelete>
    where
        S: ImageStore + ?Sized,
    {
        for (deleted, id) in ids.iter().enumerate() {
            if let Err(error) = store.delete_record(id).await {
                log::error!("Bulk delete stopped at {} after {} deleted: {}", id, deleted, error);
                return Err(PartialDelete {
                    deleted,
                    failed_id: id.clone(),
                    error,
                });
            }
            self.items.retain(|img| &img.remote_id != id);
        }
        Ok(ids.len())
    }

    /// Image bytes for a stored image, fetching and caching them on first use.
    pub async fn fetch_image<S>(&mut self, store: &S, id: &RecordId) -> EngineResult<&[u8]>
    where
        S: ImageStore + ?Sized,
    {
        let position = self
            .items
            .iter()
            .position(|img| &img.remote_id == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        if self.items[position].image_bytes.is_none() {
            let record = store
                .retrieve_record(id, Select::Image)
                .await
                .map_err(EngineError::RemoteQuery)?;
            let payload = record.image_base64.unwrap_or_default();
            self.items[position].image_bytes = Some(codec::decode(&payload)?);
        }

        Ok(self.items[position].image_bytes.as_deref().unwrap_or_default())
    }

    /// Name and full payload of a stored image for the full-size viewer.
    pub async fn fetch_preview<S>(store: &S, id: &RecordId) -> EngineResult<Preview>
    where
        S: ImageStore + ?Sized,
    {
        let record = store
            .retrieve_record(id, Select::NameAndImage)
            .await
            .map_err(EngineError::RemoteQuery)?;
        let bytes = match record.image_base64.as_deref() {
            Some(text) => codec::decode(text)?,
            None => Vec::new(),
        };
        let mime_type = codec::sniff_mime(&bytes, "", record.name.as_deref());
        Ok(Preview {
            id: record.id,
            name: record.name.unwrap_or_else(|| "Image".to_string()),
            mime_type,
            bytes,
        })
    }
}

/// Full-size image handed to the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    /// Record the image belongs to
    pub id: RecordId,
    /// Title shown above the image
    pub name: String,
    /// MIME type sniffed from the payload
    pub mime_type: String,
    /// Decoded image bytes
    pub bytes: Vec<u8>,
}

impl Preview {
    /// Data URL suitable for an `<img>` source.
    pub fn data_url(&self) -> String {
        codec::to_data_url(&self.mime_type, &self.bytes)
    }
}
