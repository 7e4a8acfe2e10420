//! Values published to the host after every state change.

use serde::Serialize;

use crate::batch::ReadyBatch;
use crate::constants::READY_STATUS;

/// Upload status token read by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    /// No encoded batch is available
    #[default]
    Empty,
    /// The pending batch has been encoded and published
    Ready,
}

impl UploadStatus {
    /// The literal token the host expects (`""` or `"ready"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Empty => "",
            UploadStatus::Ready => READY_STATUS,
        }
    }
}

impl Serialize for UploadStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Snapshot of every host-visible output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostOutputs {
    /// Current grouping key
    pub key_data_field: String,
    /// Name of the first encoded pending image
    pub file_name: String,
    /// Payload of the first encoded pending image
    pub file_content: String,
    /// `""` or `"ready"`
    pub upload_status: UploadStatus,
    /// JSON array describing every encoded pending image
    pub images_list: String,
    /// Persisted plus pending image count
    pub images_count: usize,
}

impl HostOutputs {
    /// Build outputs from the published batch and the current counts.
    ///
    /// The batch is only surfaced while there are pending images; an empty
    /// pending list always yields empty batch fields.
    pub fn build(key: Option<&str>, batch: Option<&ReadyBatch>, pending: usize, total: usize) -> Self {
        let mut outputs = Self {
            key_data_field: key.unwrap_or_default().to_string(),
            images_count: total,
            ..Self::default()
        };

        let Some(batch) = batch.filter(|_| pending > 0) else {
            return outputs;
        };

        if let Some(first) = batch.first() {
            outputs.file_name = first.name.clone();
            outputs.file_content = first.content.clone();
        }
        outputs.images_list = match serde_json::to_string(&batch.images) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to serialize images list: {}", e);
                String::new()
            }
        };
        outputs.upload_status = UploadStatus::Ready;
        outputs
    }
}

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Operation completed
    Success,
    /// Operation failed
    Error,
    /// Progress or neutral information
    Info,
}

/// Status line shown to the user after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// Severity
    pub kind: StatusKind,
    /// Message text
    pub text: String,
}

impl StatusMessage {
    /// Successful outcome.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    /// Failed outcome.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    /// Neutral information.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    /// Forward the message to the log at a matching level.
    pub fn log(&self) {
        match self.kind {
            StatusKind::Success => log::info!("✅ {}", self.text),
            StatusKind::Error => log::error!("{}", self.text),
            StatusKind::Info => log::info!("{}", self.text),
        }
    }
}
