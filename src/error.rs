//! Error types for staging and synchronization operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by an [`ImageStore`](crate::store::ImageStore) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or refused to serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// No record exists with the requested ID
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The store understood the request but rejected its content
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// I/O error in a file-backed store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error in a file-backed store
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while reading or transcoding an image payload.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload is not valid base64
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Source file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An encoder gave up on one image
    #[error("Failed to encode '{name}': {message}")]
    Encode {
        /// Display name of the image
        name: String,
        /// Reason reported by the encoder
        message: String,
    },
}

impl DecodeError {
    /// Create an encode failure for the named image.
    pub fn encode(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the staging engine to its host.
///
/// None of these are fatal: every failure leaves the pending and persisted
/// sets either unchanged or reflecting exactly the remote calls that succeeded.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The input contained no image-typed files
    #[error("Please select image files only")]
    NoImageInput,

    /// Loading the persisted images for a key failed; the previous list is kept
    #[error("Failed to load images: {0}")]
    RemoteQuery(#[source] StoreError),

    /// A create, update or delete was not applied by the store
    #[error("Failed to write to the image store: {0}")]
    RemoteWrite(#[source] StoreError),

    /// A local image could not be read or encoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A save was requested before any grouping key was set
    #[error("No grouping key set")]
    MissingKey,

    /// The addressed image no longer exists
    #[error("Image not found: {0}")]
    NotFound(String),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
