//! imgsync - Image collection staging and synchronization
//!
//! Stages images picked, dropped or pasted by a user, keeps them alongside the
//! images already stored for a grouping key, and writes them to a remote record
//! store on demand. Also provides the zoom/pan state machine behind the
//! full-size image viewer.
//!
//! The remote side is abstracted behind [`store::ImageStore`]; the crate ships
//! an in-memory store for tests and a JSON file store for the command-line tool.

pub mod batch;
pub mod codec;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod model;
pub mod outputs;
pub mod pending;
pub mod persisted;
pub mod store;
pub mod view;

pub use config::EngineConfig;
pub use engine::{ImageSyncEngine, SaveMode};
pub use error::{DecodeError, EngineError, EngineResult, StoreError};
pub use model::{ImageFile, PendingId, PendingImage, PersistedImage, RecordId};
pub use outputs::{HostOutputs, StatusKind, StatusMessage, UploadStatus};
pub use view::{DisplayItem, Route, ViewModel};

#[cfg(test)]
mod tests;
