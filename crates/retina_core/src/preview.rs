//! Local preview of a selected image, produced before any upload.

use crate::error::ValidationError;
use crate::validation::SelectedFile;
use base64::{Engine as _, engine::general_purpose};
use std::sync::Arc;

/// Decoded preview ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub mime: String,
    /// The file as read from disk.
    pub source: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

impl Preview {
    /// `data:<mime>;base64,<payload>` of the original bytes, encoded on demand.
    pub fn data_url(&self) -> String {
        data_url(&self.mime, &self.source)
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Read and decode the file. Unreadable or undecodable content is reported
/// as [`ValidationError::Unreadable`].
pub fn load_preview(file: &SelectedFile) -> Result<Preview, ValidationError> {
    let bytes = file.read_bytes()?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| {
        tracing::warn!("preview decode failed for {}: {e}", file.path.display());
        ValidationError::Unreadable {
            reason: format!("{}: {e}", file.name),
        }
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Preview {
        mime: file.mime.clone(),
        source: Arc::from(bytes),
        width,
        height,
        rgba: rgba.into_raw(),
    })
}
