//! The set of locally staged images that have not been saved yet.

use std::collections::BTreeMap;

use crate::batch::{BatchSnapshot, SnapshotItem};
use crate::error::{EngineError, EngineResult};
use crate::model::{ImageFile, PendingId, PendingImage};

/// Ordered list of pending images and their notes.
///
/// Images are addressed two ways: by [`PendingId`], which is stable, and by
/// ordinal, which is the current position in the list and shifts whenever an
/// earlier image is removed. Ordinal lookups always resolve against the live
/// list at call time.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    items: Vec<PendingImage>,
    /// Notes typed against ordinals past the end of the list, keyed by ordinal
    parked_notes: BTreeMap<usize, String>,
    next_id: u64,
}

impl PendingSet {
    /// Create an empty pending set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending images.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if no images are pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over pending images in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingImage> {
        self.items.iter()
    }

    /// Look up an image by its stable ID.
    pub fn get(&self, id: PendingId) -> Option<&PendingImage> {
        self.items.iter().find(|img| img.id == id)
    }

    /// Look up an image by its current ordinal.
    pub fn get_at(&self, ordinal: usize) -> Option<&PendingImage> {
        self.items.get(ordinal)
    }

    /// Current ordinal of an image, if it is still pending.
    pub fn ordinal_of(&self, id: PendingId) -> Option<usize> {
        self.items.iter().position(|img| img.id == id)
    }

    /// Append the image-typed entries of `files`, preserving their order.
    ///
    /// Returns the IDs assigned to the added images; its length is the count
    /// added. Fails with [`EngineError::NoImageInput`] without touching the set
    /// if no entry is an image.
    pub fn add(&mut self, files: Vec<ImageFile>) -> EngineResult<Vec<PendingId>> {
        let images: Vec<ImageFile> = files.into_iter().filter(ImageFile::is_image).collect();
        if images.is_empty() {
            return Err(EngineError::NoImageInput);
        }

        let mut added = Vec::with_capacity(images.len());
        for file in images {
            let id = PendingId::new(self.next_id);
            self.next_id += 1;

            let ordinal = self.items.len();
            let note = self.parked_notes.remove(&ordinal).unwrap_or_default();
            self.items.push(PendingImage {
                id,
                bytes: file.bytes.into(),
                mime_type: file.mime_type,
                declared_name: file.name,
                note,
            });
            added.push(id);
        }

        log::debug!("Staged {} image(s), {} pending", added.len(), self.items.len());
        Ok(added)
    }

    /// Remove the image at `ordinal` together with its note.
    ///
    /// Out-of-range ordinals are a no-op returning `None`; this happens when
    /// the list changed between the caller reading the ordinal and using it.
    pub fn remove_at(&mut self, ordinal: usize) -> Option<PendingImage> {
        if ordinal >= self.items.len() {
            log::debug!(
                "Ignoring removal of ordinal {} ({} pending)",
                ordinal,
                self.items.len()
            );
            return None;
        }

        let removed = self.items.remove(ordinal);
        // Parked notes sit at positions after the removed one and move up with the list
        self.parked_notes = std::mem::take(&mut self.parked_notes)
            .into_iter()
            .map(|(pos, note)| (pos - 1, note))
            .collect();
        Some(removed)
    }

    /// Remove an image by its stable ID.
    pub fn remove(&mut self, id: PendingId) -> Option<PendingImage> {
        let ordinal = self.ordinal_of(id)?;
        self.remove_at(ordinal)
    }

    /// Set the note for the image at `ordinal`.
    ///
    /// Never fails. A note for an ordinal past the end is kept and attached to
    /// whichever image is later added at that position.
    pub fn set_note(&mut self, ordinal: usize, text: impl Into<String>) {
        match self.items.get_mut(ordinal) {
            Some(image) => image.note = text.into(),
            None => {
                self.parked_notes.insert(ordinal, text.into());
            }
        }
    }

    /// Set the note for an image by its stable ID. Returns false if it is gone.
    pub fn set_note_by_id(&mut self, id: PendingId, text: impl Into<String>) -> bool {
        match self.items.iter_mut().find(|img| img.id == id) {
            Some(image) => {
                image.note = text.into();
                true
            }
            None => false,
        }
    }

    /// Note currently associated with `ordinal` (empty if none).
    pub fn note_at(&self, ordinal: usize) -> &str {
        match self.items.get(ordinal) {
            Some(image) => &image.note,
            None => self
                .parked_notes
                .get(&ordinal)
                .map(String::as_str)
                .unwrap_or(""),
        }
    }

    /// Remove every pending image and note.
    pub fn clear(&mut self) {
        self.items.clear();
        self.parked_notes.clear();
    }

    /// Capture the current list for an encode batch.
    pub fn snapshot(&self, revision: u64) -> BatchSnapshot {
        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(ordinal, image)| SnapshotItem {
                ordinal,
                id: image.id,
                name: image.display_name(ordinal),
                bytes: image.bytes.clone(),
                mime_type: image.mime_type.clone(),
                note: image.note.clone(),
            })
            .collect();
        BatchSnapshot::new(revision, items)
    }
}
