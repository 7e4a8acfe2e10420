//! Batch encode pipeline for pending images.
//!
//! A batch works on a snapshot of the pending list, never on the live list:
//!
//! 1. `PendingSet::snapshot` copies ordinals, IDs, notes and shared byte buffers
//! 2. `encode_batch` starts one encode per item, all at once
//! 3. Each completion bumps a counter and lands in an accumulator
//! 4. When the counter reaches the snapshot length the accumulator is sorted
//!    back into submission order and returned as a [`ReadyBatch`]
//!
//! Completion order is whatever the encoder produces; publication order is
//! always the snapshot order.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::Serialize;

use crate::codec;
use crate::error::DecodeError;
use crate::model::PendingId;
use crate::pending::PendingSet;

/// One pending image as captured at snapshot time.
#[derive(Debug, Clone)]
pub struct SnapshotItem {
    /// Position in the pending list when the snapshot was taken
    pub ordinal: usize,
    /// Stable identity of the pending image
    pub id: PendingId,
    /// Display name (declared or generated)
    pub name: String,
    /// Shared file contents
    pub bytes: Arc<[u8]>,
    /// MIME type
    pub mime_type: String,
    /// Note at snapshot time
    pub note: String,
}

/// Frozen copy of the pending list handed to the pipeline.
#[derive(Debug, Clone)]
pub struct BatchSnapshot {
    revision: u64,
    items: Vec<SnapshotItem>,
}

impl BatchSnapshot {
    /// Create a snapshot tagged with the pending-set revision it was taken at.
    pub fn new(revision: u64, items: Vec<SnapshotItem>) -> Self {
        Self { revision, items }
    }

    /// Revision of the pending set this snapshot reflects.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Captured items in submission order.
    pub fn items(&self) -> &[SnapshotItem] {
        &self.items
    }

    /// Number of captured items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// An encoded pending image, in the shape published to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedImage {
    /// Display name
    pub name: String,
    /// Base64 payload
    pub content: String,
    /// Original size in bytes
    pub size: usize,
    /// MIME type
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Ordinal the image had when its batch was taken
    #[serde(rename = "index")]
    pub source_ordinal: usize,
    /// Note attached to the image
    pub note: String,
    /// Stable identity of the pending image
    pub id: PendingId,
}

/// An image the encoder could not process.
#[derive(Debug)]
pub struct FailedEncode {
    /// Stable identity of the pending image
    pub id: PendingId,
    /// Ordinal at snapshot time
    pub ordinal: usize,
    /// What went wrong
    pub error: DecodeError,
}

/// Result of a completed batch.
#[derive(Debug)]
pub struct ReadyBatch {
    /// Revision of the snapshot this batch was built from
    pub revision: u64,
    /// Encoded images sorted by source ordinal
    pub images: Vec<EncodedImage>,
    /// Images skipped because their encode failed
    pub failed: Vec<FailedEncode>,
}

impl ReadyBatch {
    /// First encoded image, for single-file consumers.
    pub fn first(&self) -> Option<&EncodedImage> {
        self.images.first()
    }

    /// Whether every snapshot item encoded successfully.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Re-resolve every entry against the live pending list.
    ///
    /// Entries whose image has been removed since the snapshot are dropped.
    /// Surviving entries pick up the current ordinal, name and note. Returns
    /// the number of dropped entries.
    pub fn retain_live(&mut self, pending: &PendingSet) -> usize {
        let before = self.images.len();
        self.images.retain_mut(|image| {
            let Some(ordinal) = pending.ordinal_of(image.id) else {
                return false;
            };
            if let Some(live) = pending.get_at(ordinal) {
                image.source_ordinal = ordinal;
                image.name = live.display_name(ordinal);
                image.note.clone_from(&live.note);
            }
            true
        });
        self.failed.retain(|f| pending.get(f.id).is_some());
        before - self.images.len()
    }
}

/// Converts one snapshot item into its transfer encoding.
#[async_trait(?Send)]
pub trait Encoder {
    /// Encode the item's bytes.
    async fn encode(&self, item: &SnapshotItem) -> Result<String, DecodeError>;
}

/// Encoder that base64-encodes the in-memory bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Encoder;

#[async_trait(?Send)]
impl Encoder for Base64Encoder {
    async fn encode(&self, item: &SnapshotItem) -> Result<String, DecodeError> {
        Ok(codec::encode(&item.bytes))
    }
}

/// Encode every item of `snapshot` concurrently and return them in submission order.
pub async fn encode_batch<E>(snapshot: BatchSnapshot, encoder: &E) -> ReadyBatch
where
    E: Encoder + ?Sized,
{
    let total = snapshot.len();
    let mut images = Vec::with_capacity(total);
    let mut failed = Vec::new();
    let mut completed = 0usize;

    if total > 0 {
        let mut in_flight: FuturesUnordered<_> = snapshot
            .items()
            .iter()
            .map(|item| async move { (item, encoder.encode(item).await) })
            .collect();

        while let Some((item, result)) = in_flight.next().await {
            completed += 1;
            match result {
                Ok(content) => images.push(EncodedImage {
                    name: item.name.clone(),
                    content,
                    size: item.bytes.len(),
                    mime_type: item.mime_type.clone(),
                    source_ordinal: item.ordinal,
                    note: item.note.clone(),
                    id: item.id,
                }),
                Err(error) => {
                    log::warn!("Skipping {} from ready batch: {}", item.name, error);
                    failed.push(FailedEncode {
                        id: item.id,
                        ordinal: item.ordinal,
                        error,
                    });
                }
            }

            if completed == total {
                break;
            }
        }
    }

    images.sort_by_key(|image| image.source_ordinal);
    log::debug!(
        "Batch r{} done: {} encoded, {} failed",
        snapshot.revision(),
        images.len(),
        failed.len()
    );

    ReadyBatch {
        revision: snapshot.revision(),
        images,
        failed,
    }
}
