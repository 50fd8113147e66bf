//! Background threads for everything that would block the UI.

use eframe::egui;
use retina_core::{
    HttpPredictor, PredictError, PredictResult, PredictionResponse, Preview, PreviewTicket,
    Submission, ValidationError, load_preview,
};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

pub enum WorkerEvent {
    PreviewLoaded {
        ticket: PreviewTicket,
        result: Result<Preview, ValidationError>,
    },
    PredictionFinished {
        submission: Submission,
        outcome: PredictResult<PredictionResponse>,
    },
    ResultImage {
        image_path: String,
        result: PredictResult<Vec<u8>>,
    },
    ModelsDiscovered(PredictResult<Vec<String>>),
}

/// Spawns jobs and wakes the UI when they report back.
#[derive(Clone)]
pub struct Worker {
    tx: Sender<WorkerEvent>,
    ctx: egui::Context,
}

impl Worker {
    pub fn new(ctx: egui::Context) -> (Self, Receiver<WorkerEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx, ctx }, rx)
    }

    fn send(&self, event: WorkerEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("UI receiver gone, dropping worker event");
            return;
        }
        self.ctx.request_repaint();
    }

    pub fn load_preview(&self, ticket: PreviewTicket) {
        let worker = self.clone();
        thread::spawn(move || {
            let result = load_preview(&ticket.file);
            worker.send(WorkerEvent::PreviewLoaded { ticket, result });
        });
    }

    pub fn predict(&self, submission: Submission, predictor: Arc<HttpPredictor>) {
        let guard = PredictionGuard {
            worker: self.clone(),
            submission: Some(submission),
        };
        thread::spawn(move || guard.run(predictor.as_ref()));
    }

    pub fn fetch_result_image(&self, predictor: Arc<HttpPredictor>, image_path: String) {
        let worker = self.clone();
        thread::spawn(move || {
            let result = predictor.fetch_image(&image_path);
            worker.send(WorkerEvent::ResultImage { image_path, result });
        });
    }

    pub fn discover_models(&self, predictor: Arc<HttpPredictor>) {
        let worker = self.clone();
        thread::spawn(move || {
            let result = predictor.discover_models();
            worker.send(WorkerEvent::ModelsDiscovered(result));
        });
    }
}

/// Hands the submission back to the UI exactly once, even if the request
/// panics, so the analyze button is always re-enabled.
struct PredictionGuard {
    worker: Worker,
    submission: Option<Submission>,
}

impl PredictionGuard {
    fn run(mut self, predictor: &HttpPredictor) {
        let outcome = match self.submission.as_ref() {
            Some(submission) => submission.execute(predictor),
            None => return,
        };
        if let Some(submission) = self.submission.take() {
            self.worker
                .send(WorkerEvent::PredictionFinished { submission, outcome });
        }
    }
}

impl Drop for PredictionGuard {
    fn drop(&mut self) {
        if let Some(submission) = self.submission.take() {
            tracing::error!("prediction worker for {} stopped early", submission.file().name);
            self.worker.send(WorkerEvent::PredictionFinished {
                submission,
                outcome: Err(PredictError::Transport(
                    "the request was aborted unexpectedly".to_string(),
                )),
            });
        }
    }
}
