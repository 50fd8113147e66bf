use thiserror::Error;

/// Problems detected locally, before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select an image to upload")]
    MissingFile,
    #[error("Please upload a valid image file (JPG, JPEG, or PNG)")]
    UnsupportedType { mime: String },
    #[error("File size exceeds {}. Please upload a smaller image.", size_label(.limit))]
    TooLarge { size: u64, limit: u64 },
    #[error("Could not read the selected image: {reason}")]
    Unreadable { reason: String },
}

/// Every way a prediction round trip can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The server answered with an explicit `error` field.
    #[error("{0}")]
    Remote(String),
    /// Network failure, non-JSON body or a malformed success payload.
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for PredictError {
    fn from(err: reqwest::Error) -> Self {
        PredictError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for PredictError {
    fn from(err: serde_json::Error) -> Self {
        PredictError::Transport(format!("invalid JSON response: {err}"))
    }
}

fn size_label(bytes: &u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if *bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

pub type PredictResult<T> = std::result::Result<T, PredictError>;
