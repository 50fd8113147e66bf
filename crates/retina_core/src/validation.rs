use crate::error::ValidationError;
use image::ImageFormat;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// MIME types the prediction form accepts.
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Largest upload the client will send (5 MiB, inclusive).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A file picked by the user. Content is read lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
    pub size: u64,
}

impl SelectedFile {
    /// Stat the file and derive its MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path)?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            path: path.to_path_buf(),
            name,
            mime: mime_for_path(path).to_string(),
            size: meta.len(),
        })
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>, ValidationError> {
        fs::read(&self.path).map_err(|e| ValidationError::Unreadable {
            reason: format!("{}: {e}", self.path.display()),
        })
    }
}

/// Browser-style MIME guess from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    match ImageFormat::from_path(path) {
        Ok(format) => format.to_mime_type(),
        Err(_) => FALLBACK_MIME,
    }
}

pub fn is_accepted_mime(mime: &str) -> bool {
    ACCEPTED_MIME_TYPES.contains(&mime)
}

/// Check presence, then type, then size. The size limit is inclusive.
pub fn validate_upload(
    file: Option<&SelectedFile>,
    max_bytes: u64,
) -> Result<&SelectedFile, ValidationError> {
    let file = file.ok_or(ValidationError::MissingFile)?;
    if !is_accepted_mime(&file.mime) {
        return Err(ValidationError::UnsupportedType {
            mime: file.mime.clone(),
        });
    }
    if file.size > max_bytes {
        return Err(ValidationError::TooLarge {
            size: file.size,
            limit: max_bytes,
        });
    }
    Ok(file)
}
