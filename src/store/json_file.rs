//! Image store backed by a single JSON file.
//!
//! The whole file is read once when the store is opened and rewritten after
//! every successful mutation, which is plenty for a command-line session.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Filter, ImageStore, Record, RecordFields, Select};
use crate::error::StoreError;
use crate::model::RecordId;

/// Current store file format version.
pub const STORE_FILE_VERSION: u32 = 1;

/// On-disk layout of the store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    records: Vec<Record>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: STORE_FILE_VERSION,
            next_id: 0,
            records: Vec::new(),
        }
    }
}

/// Image store persisted as pretty-printed JSON.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: RefCell<StoreFile>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            let data: StoreFile = serde_json::from_str(&json)?;
            if data.version > STORE_FILE_VERSION {
                return Err(StoreError::Rejected(format!(
                    "store file version {} is newer than supported version {}",
                    data.version, STORE_FILE_VERSION
                )));
            }
            log::info!(
                "📂 Opened store {:?} with {} record(s)",
                path,
                data.records.len()
            );
            data
        } else {
            log::debug!("No store file at {:?}, starting empty", path);
            StoreFile::default()
        };

        Ok(Self {
            path,
            data: RefCell::new(data),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored records across all keys.
    pub fn len(&self) -> usize {
        self.data.borrow().records.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.data.borrow().records.is_empty()
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&*self.data.borrow())?;
        std::fs::write(&self.path, json)?;
        log::debug!("Wrote store file {:?}", self.path);
        Ok(())
    }
}

#[async_trait(?Send)]
impl ImageStore for JsonFileStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let data = self.data.borrow();
        Ok(data
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn create_record(&self, fields: RecordFields) -> Result<RecordId, StoreError> {
        let id = {
            let mut data = self.data.borrow_mut();
            data.next_id += 1;
            let id = RecordId::new(format!("img-{:06}", data.next_id));
            data.records.push(Record::from_fields(id.clone(), fields));
            id
        };
        self.flush()?;
        Ok(id)
    }

    async fn retrieve_record(&self, id: &RecordId, select: Select) -> Result<Record, StoreError> {
        let data = self.data.borrow();
        data.records
            .iter()
            .find(|r| &r.id == id)
            .map(|r| select.project(r))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_record(&self, id: &RecordId, fields: RecordFields) -> Result<(), StoreError> {
        {
            let mut data = self.data.borrow_mut();
            let record = data
                .records
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            record.apply(fields);
        }
        self.flush()
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), StoreError> {
        {
            let mut data = self.data.borrow_mut();
            let before = data.records.len();
            data.records.retain(|r| &r.id != id);
            if data.records.len() == before {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }
        self.flush()
    }
}
