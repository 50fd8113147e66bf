//! Core of the RetinaScan client: validates a retinal image, sends it to a
//! remote diabetic-retinopathy classifier and turns the answer into view state.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod label;
pub mod preview;
pub mod validation;
pub mod view;

pub use client::{HttpPredictor, PredictionResponse, Predictor, parse_prediction};
pub use config::AppConfig;
pub use controller::{
    Controller, IDLE_LABEL, LOADING_LABEL, Notice, NoticeKind, PreviewTicket, Submission,
    TriggerState, UiState,
};
pub use error::{PredictError, PredictResult, ValidationError};
pub use label::{DrLabel, Severity};
pub use preview::{Preview, load_preview};
pub use validation::{ACCEPTED_MIME_TYPES, MAX_UPLOAD_BYTES, SelectedFile, validate_upload};
pub use view::{ResultsView, render_prediction};
