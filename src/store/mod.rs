//! Collaborator contracts for the remote image store and user confirmation.
//!
//! The engine never talks to a transport directly. Everything it needs from
//! the remote side goes through [`ImageStore`], and every destructive delete
//! is gated by [`Confirm`].
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: in-process store with fault injection, used by tests
//! - [`JsonFileStore`]: records kept in a single JSON file, used by the CLI

mod json_file;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::RecordId;

pub use json_file::JsonFileStore;
pub use memory::{MemoryStore, Operation};

/// A stored image record as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Server-issued identifier
    pub id: RecordId,
    /// File name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-text note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Base64 image payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    /// Grouping key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_data: Option<String>,
    /// Label of the owning table or group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_label: Option<String>,
}

impl Record {
    /// Create a record from fields and a freshly issued ID.
    pub fn from_fields(id: RecordId, fields: RecordFields) -> Self {
        Self {
            id,
            name: fields.name,
            note: fields.note,
            image_base64: fields.image_base64,
            key_data: fields.key_data,
            group_label: fields.group_label,
        }
    }

    /// Overwrite the fields that are set in `fields`.
    pub fn apply(&mut self, fields: RecordFields) {
        if fields.name.is_some() {
            self.name = fields.name;
        }
        if fields.note.is_some() {
            self.note = fields.note;
        }
        if fields.image_base64.is_some() {
            self.image_base64 = fields.image_base64;
        }
        if fields.key_data.is_some() {
            self.key_data = fields.key_data;
        }
        if fields.group_label.is_some() {
            self.group_label = fields.group_label;
        }
    }
}

/// Field values for a create or a partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    /// File name
    pub name: Option<String>,
    /// Free-text note
    pub note: Option<String>,
    /// Grouping key
    pub key_data: Option<String>,
    /// Label of the owning table or group
    pub group_label: Option<String>,
    /// Base64 image payload
    pub image_base64: Option<String>,
}

impl RecordFields {
    /// Fields for a note-only update.
    pub fn note(text: impl Into<String>) -> Self {
        Self {
            note: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Read filter for [`ImageStore::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Exact match on the grouping key
    KeyEquals(String),
}

impl Filter {
    /// Check if a record passes the filter.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::KeyEquals(key) => record.key_data.as_deref() == Some(key.as_str()),
        }
    }
}

/// Column selection for [`ImageStore::retrieve_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Select {
    /// Only the image payload
    Image,
    /// Name and image payload (full-size preview)
    NameAndImage,
    /// Every field
    All,
}

impl Select {
    /// Project a record down to the selected columns.
    pub fn project(self, record: &Record) -> Record {
        match self {
            Select::All => record.clone(),
            Select::Image => Record {
                id: record.id.clone(),
                name: None,
                note: None,
                image_base64: record.image_base64.clone(),
                key_data: None,
                group_label: None,
            },
            Select::NameAndImage => Record {
                id: record.id.clone(),
                name: record.name.clone(),
                note: None,
                image_base64: record.image_base64.clone(),
                key_data: None,
                group_label: None,
            },
        }
    }
}

/// Remote per-key image collection store.
///
/// All methods take `&self` so a caller may have several requests in flight
/// at once; implementations do not queue or coalesce them.
#[async_trait(?Send)]
pub trait ImageStore {
    /// Filtered read.
    async fn query(&self, filter: &Filter) -> Result<Vec<Record>, StoreError>;

    /// Create a record and return its new ID.
    async fn create_record(&self, fields: RecordFields) -> Result<RecordId, StoreError>;

    /// Read one record, restricted to the selected columns.
    async fn retrieve_record(&self, id: &RecordId, select: Select) -> Result<Record, StoreError>;

    /// Partial update of one record.
    async fn update_record(&self, id: &RecordId, fields: RecordFields) -> Result<(), StoreError>;

    /// Delete one record.
    async fn delete_record(&self, id: &RecordId) -> Result<(), StoreError>;
}

/// Blocking yes/no prompt shown before destructive operations.
pub trait Confirm {
    /// Ask the user; `true` means proceed.
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Confirmation that always answers yes (scripted or `--yes` runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, message: &str) -> bool {
        log::debug!("Auto-confirmed: {}", message);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: Option<&str>) -> Record {
        Record {
            id: RecordId::new("r1"),
            name: Some("a.png".to_string()),
            note: Some("n".to_string()),
            image_base64: Some("AAA=".to_string()),
            key_data: key.map(str::to_string),
            group_label: Some("orders".to_string()),
        }
    }

    #[test]
    fn test_filter_exact_match() {
        let filter = Filter::KeyEquals("k1".to_string());
        assert!(filter.matches(&record(Some("k1"))));
        assert!(!filter.matches(&record(Some("k10"))));
        assert!(!filter.matches(&record(None)));
    }

    #[test]
    fn test_select_projection() {
        let full = record(Some("k"));
        let image_only = Select::Image.project(&full);
        assert_eq!(image_only.image_base64.as_deref(), Some("AAA="));
        assert!(image_only.name.is_none());
        assert!(image_only.note.is_none());

        let preview = Select::NameAndImage.project(&full);
        assert_eq!(preview.name.as_deref(), Some("a.png"));
        assert!(preview.key_data.is_none());

        assert_eq!(Select::All.project(&full), full);
    }

    #[test]
    fn test_apply_partial_update() {
        let mut rec = record(Some("k"));
        rec.apply(RecordFields::note("changed"));
        assert_eq!(rec.note.as_deref(), Some("changed"));
        assert_eq!(rec.name.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_record_json_omits_missing_fields() {
        let rec = Record::from_fields(RecordId::new("x"), RecordFields::note("hi"));
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"id":"x","note":"hi"}"#);
    }

    #[test]
    fn test_closure_confirm() {
        let deny = |_: &str| false;
        assert!(!deny.confirm("delete?"));
        assert!(AlwaysConfirm.confirm("delete?"));
    }
}
