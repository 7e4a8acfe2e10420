//! Core data types shared by the pending and persisted sets.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec;

/// Stable identifier of a pending image, assigned when it is added.
///
/// Unlike an ordinal, a `PendingId` survives removals of other images and is
/// never reused within one pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingId(u64);

impl PendingId {
    /// Wrap a raw identifier.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pending-{}", self.0)
    }
}

/// Server-issued identifier of a persisted image record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an identifier returned by the store.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A raw file handed to the engine by a picker, drop or paste.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    /// File contents
    pub bytes: Vec<u8>,
    /// MIME type reported by the source (may be empty for some pastes)
    pub mime_type: String,
    /// File name, if the source had one
    pub name: Option<String>,
}

impl ImageFile {
    /// Create a file without a name (clipboard paste).
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            name: None,
        }
    }

    /// Attach a file name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the declared MIME type is an image type.
    pub fn is_image(&self) -> bool {
        codec::is_image_mime(&self.mime_type)
    }
}

/// A locally staged image that has not been written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    /// Stable local identity
    pub id: PendingId,
    /// File contents, shared with in-flight encode batches
    pub bytes: Arc<[u8]>,
    /// MIME type of the contents
    pub mime_type: String,
    /// Name the file arrived with, if any
    pub declared_name: Option<String>,
    /// Free-text note typed by the user
    pub note: String,
}

impl PendingImage {
    /// Size of the file in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Name shown for this image at the given ordinal.
    ///
    /// Unnamed images (pastes) get a generated name derived from their position.
    pub fn display_name(&self, ordinal: usize) -> String {
        match &self.declared_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => codec::fallback_name(&self.mime_type, ordinal),
        }
    }
}

/// An image record confirmed to exist in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedImage {
    /// Server-issued identity
    pub remote_id: RecordId,
    /// Stored file name
    pub name: String,
    /// Stored note
    pub note: String,
    /// Image payload, fetched lazily
    pub image_bytes: Option<Vec<u8>>,
    /// Grouping key this image belongs to
    pub key_data: String,
    /// Label of the owning table or group
    pub group_label: Option<String>,
}
