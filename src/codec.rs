//! Transfer encoding for image payloads.
//!
//! Images travel to and from the store as standard base64 text. This module
//! also owns the small amount of file-type knowledge the engine needs: MIME
//! sniffing, extension mapping and the generated names used for pasted images.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::DecodeError;
use crate::model::ImageFile;

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "svg"];

/// Encode raw bytes as standard padded base64.
pub fn encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode a base64 payload back into bytes.
///
/// Accepts either a bare payload or a `data:<mime>;base64,<payload>` URL.
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(BASE64.decode(strip_data_url(text).trim())?)
}

/// Strip a `data:...,` prefix, returning only the payload.
pub fn strip_data_url(text: &str) -> &str {
    if !text.starts_with("data:") {
        return text;
    }
    text.split_once(',').map(|(_, payload)| payload).unwrap_or(text)
}

/// Build a data URL for displaying a payload.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, encode(bytes))
}

/// Check if a MIME type denotes an image.
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Check if a filename has a supported image extension.
pub fn is_image_file(filename: &str) -> bool {
    mime_from_extension(filename).is_some()
}

/// Guess a MIME type from a filename extension.
pub fn mime_from_extension(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(mime)
}

/// Determine the MIME type of a file.
///
/// An `image/*` type declared by the source wins. Otherwise the magic bytes
/// are inspected, then the file extension. If nothing matches, the declared
/// type is returned unchanged (which keeps non-images out of the pending set).
pub fn sniff_mime(bytes: &[u8], declared: &str, name: Option<&str>) -> String {
    if is_image_mime(declared) {
        return declared.to_string();
    }
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    if let Some(mime) = name.and_then(mime_from_extension) {
        return mime.to_string();
    }
    declared.to_string()
}

/// File extension used for generated names.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "png",
    }
}

/// Name shown for an unnamed pending image at `ordinal`.
pub fn fallback_name(mime_type: &str, ordinal: usize) -> String {
    format!("Pasted_Image_{}.{}", ordinal + 1, extension_for_mime(mime_type))
}

/// Name written to the store for an unnamed image.
pub fn save_name(mime_type: &str, timestamp_ms: u128, index: usize) -> String {
    format!(
        "Image_{}_{}.{}",
        timestamp_ms,
        index,
        extension_for_mime(mime_type)
    )
}

/// Format a byte count for display (`0 Bytes`, `1.5 KB`, `2 MB`).
pub fn format_file_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[exponent])
}

/// Read a file from disk into an [`ImageFile`].
pub fn read_file(path: &Path) -> Result<ImageFile, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let mime_type = sniff_mime(&bytes, "", name.as_deref());
    log::debug!("Read {:?}: {} bytes, {}", path, bytes.len(), mime_type);

    Ok(ImageFile {
        bytes,
        mime_type,
        name,
    })
}
