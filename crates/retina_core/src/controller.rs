//! Upload-and-predict controller.
//!
//! Owns the whole view state and exposes one method per user interaction.
//! Slow work (reading a preview, the network round trip) happens outside the
//! controller: it hands out a ticket or a [`Submission`], and the result is fed
//! back in on the UI thread.

use crate::client::{PredictionResponse, Predictor};
use crate::error::{PredictError, PredictResult, ValidationError};
use crate::preview::Preview;
use crate::validation::{MAX_UPLOAD_BYTES, SelectedFile, validate_upload};
use crate::view::{ResultsView, render_prediction};
use std::collections::VecDeque;
use std::path::Path;

pub const IDLE_LABEL: &str = "Analyze Image";
pub const LOADING_LABEL: &str = "Analyzing...";

/// State of the analyze button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriggerState {
    #[default]
    Idle,
    Submitting,
}

impl TriggerState {
    pub fn label(self) -> &'static str {
        match self {
            TriggerState::Idle => IDLE_LABEL,
            TriggerState::Submitting => LOADING_LABEL,
        }
    }

    pub fn is_enabled(self) -> bool {
        self == TriggerState::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Validation,
    Remote,
    Transport,
}

/// A blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn alert_text(&self) -> String {
        match self.kind {
            NoticeKind::Validation => self.message.clone(),
            NoticeKind::Remote | NoticeKind::Transport => format!("Error: {}", self.message),
        }
    }
}

impl From<&PredictError> for Notice {
    fn from(err: &PredictError) -> Self {
        let kind = match err {
            PredictError::Validation(_) => NoticeKind::Validation,
            PredictError::Remote(_) => NoticeKind::Remote,
            PredictError::Transport(_) => NoticeKind::Transport,
        };
        Notice {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<&ValidationError> for Notice {
    fn from(err: &ValidationError) -> Self {
        Notice {
            kind: NoticeKind::Validation,
            message: err.to_string(),
        }
    }
}

/// Everything the window renders.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub selected: Option<SelectedFile>,
    pub models: Vec<String>,
    pub model: String,
    pub trigger: TriggerState,
    pub preview: Option<Preview>,
    /// `Some` while the results region is visible.
    pub results: Option<ResultsView>,
    /// Alerts not yet acknowledged, oldest first.
    pub notices: VecDeque<Notice>,
    /// Set when results were just revealed and should be scrolled into view.
    pub scroll_to_results: bool,
}

impl UiState {
    /// The alert currently on screen.
    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }
}

/// Identifies the selection a preview read belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTicket {
    generation: u64,
    pub file: SelectedFile,
}

/// A validated request that owns the in-flight slot until handed back to
/// [`Controller::finish_submission`].
#[derive(Debug)]
#[must_use = "a submission keeps the trigger disabled until it is finished"]
pub struct Submission {
    file: SelectedFile,
    model: String,
}

impl Submission {
    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Perform the round trip. Safe to call off the UI thread.
    pub fn execute<P: Predictor + ?Sized>(&self, predictor: &P) -> PredictResult<PredictionResponse> {
        predictor.predict(&self.file, &self.model)
    }
}

#[derive(Debug, Clone)]
pub struct Controller {
    state: UiState,
    max_upload_bytes: u64,
    preview_generation: u64,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Controller {
    pub fn new(models: Vec<String>) -> Self {
        let mut controller = Self {
            state: UiState::default(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            preview_generation: 0,
        };
        controller.set_models(models);
        controller
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Replace the offered models, keeping the current choice when still offered.
    pub fn set_models(&mut self, models: Vec<String>) {
        if !models.iter().any(|m| *m == self.state.model) {
            self.state.model = models.first().cloned().unwrap_or_default();
        }
        self.state.models = models;
    }

    pub fn select_model(&mut self, model: impl Into<String>) {
        self.state.model = model.into();
    }

    /// A new file was picked (or the picker was cleared).
    ///
    /// Results are hidden right away. Returns a ticket for the preview read;
    /// any ticket handed out earlier becomes stale.
    pub fn handle_file_selected(&mut self, file: Option<SelectedFile>) -> Option<PreviewTicket> {
        self.preview_generation += 1;
        self.state.preview = None;
        self.state.selected = file.clone();
        let file = file?;
        self.state.results = None;
        self.state.scroll_to_results = false;
        tracing::debug!(
            "selected {} ({}, {} bytes)",
            file.name,
            file.mime,
            file.size
        );
        Some(PreviewTicket {
            generation: self.preview_generation,
            file,
        })
    }

    /// Stat a picked path and select it. A path that cannot be opened raises
    /// a validation notice and leaves nothing selected.
    pub fn handle_path_selected(&mut self, path: &Path) -> Option<PreviewTicket> {
        match SelectedFile::from_path(path) {
            Ok(file) => self.handle_file_selected(Some(file)),
            Err(e) => {
                let err = ValidationError::Unreadable {
                    reason: format!("{}: {e}", path.display()),
                };
                tracing::warn!("{err}");
                self.handle_file_selected(None);
                self.raise(Notice::from(&err));
                None
            }
        }
    }

    /// Apply a finished preview read. Stale tickets are ignored.
    ///
    /// A file that cannot be previewed raises a validation notice but stays
    /// selected; the server may still accept it.
    pub fn complete_preview(
        &mut self,
        ticket: PreviewTicket,
        result: Result<Preview, ValidationError>,
    ) -> bool {
        if ticket.generation != self.preview_generation {
            tracing::debug!("discarding stale preview for {}", ticket.file.name);
            return false;
        }
        match result {
            Ok(preview) => self.state.preview = Some(preview),
            Err(err) => {
                tracing::warn!("preview failed: {err}");
                self.state.preview = None;
                self.raise(Notice::from(&err));
            }
        }
        true
    }

    /// Validate and claim the in-flight slot.
    ///
    /// Returns `None` when validation fails (a notice is raised, nothing is
    /// sent) or when a request is already running.
    pub fn begin_submission(&mut self) -> Option<Submission> {
        if self.state.trigger == TriggerState::Submitting {
            tracing::debug!("submission ignored, request already in flight");
            return None;
        }
        let checked = validate_upload(self.state.selected.as_ref(), self.max_upload_bytes).cloned();
        let file = match checked {
            Ok(file) => file,
            Err(err) => {
                tracing::info!("upload rejected: {err}");
                self.raise(Notice::from(&err));
                return None;
            }
        };
        self.state.trigger = TriggerState::Submitting;
        Some(Submission {
            file,
            model: self.state.model.clone(),
        })
    }

    /// Release the in-flight slot and show the outcome.
    pub fn finish_submission(
        &mut self,
        submission: Submission,
        outcome: PredictResult<PredictionResponse>,
    ) {
        self.state.trigger = TriggerState::Idle;
        match outcome {
            Ok(response) => {
                tracing::info!(
                    "{} classified as {} ({:.3})",
                    submission.file.name,
                    response.prediction,
                    response.confidence
                );
                self.render(&response);
            }
            Err(err) => {
                tracing::error!("prediction for {} failed: {err}", submission.file.name);
                self.raise(Notice::from(&err));
            }
        }
    }

    /// Validate, send and render in one go on the calling thread.
    pub fn submit_prediction<P: Predictor + ?Sized>(&mut self, predictor: &P) {
        if let Some(submission) = self.begin_submission() {
            let outcome = submission.execute(predictor);
            self.finish_submission(submission, outcome);
        }
    }

    pub fn render(&mut self, response: &PredictionResponse) {
        self.state.results = Some(render_prediction(response));
        self.state.scroll_to_results = true;
    }

    /// The results region has been scrolled into view.
    pub fn results_scrolled(&mut self) {
        self.state.scroll_to_results = false;
    }

    /// Acknowledge the oldest alert; the next one, if any, takes its place.
    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        self.state.notices.pop_front()
    }

    fn raise(&mut self, notice: Notice) {
        self.state.notices.push_back(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::{DrLabel, Severity};
    use std::cell::Cell;
    use std::path::PathBuf;

    struct Canned {
        calls: Cell<usize>,
        outcome: PredictResult<PredictionResponse>,
    }

    impl Canned {
        fn new(outcome: PredictResult<PredictionResponse>) -> Self {
            Self {
                calls: Cell::new(0),
                outcome,
            }
        }
    }

    impl Predictor for Canned {
        fn predict(&self, _file: &SelectedFile, _model: &str) -> PredictResult<PredictionResponse> {
            self.calls.set(self.calls.get() + 1);
            self.outcome.clone()
        }
    }

    fn file(mime: &str, size: u64) -> SelectedFile {
        SelectedFile {
            path: PathBuf::from("eye.png"),
            name: "eye.png".into(),
            mime: mime.into(),
            size,
        }
    }

    fn ok(label: &str) -> PredictResult<PredictionResponse> {
        Ok(PredictionResponse {
            prediction: DrLabel::parse(label),
            confidence: 0.93,
            image_path: "/x.jpg".into(),
        })
    }

    fn preview() -> Preview {
        Preview {
            mime: "image/png".into(),
            source: std::sync::Arc::from(Vec::new()),
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
        }
    }

    #[test]
    fn starts_idle_with_first_model() {
        let c = Controller::new(vec!["a.h5".into(), "b.h5".into()]);
        assert_eq!(c.state().trigger, TriggerState::Idle);
        assert_eq!(c.state().trigger.label(), IDLE_LABEL);
        assert_eq!(c.state().model, "a.h5");
    }

    #[test]
    fn set_models_keeps_still_offered_choice() {
        let mut c = Controller::new(vec!["a.h5".into(), "b.h5".into()]);
        c.select_model("b.h5");
        c.set_models(vec!["c.h5".into(), "b.h5".into()]);
        assert_eq!(c.state().model, "b.h5");
        c.set_models(vec!["c.h5".into()]);
        assert_eq!(c.state().model, "c.h5");
    }

    #[test]
    fn validation_failure_sends_nothing() {
        let mut c = Controller::new(vec!["m.h5".into()]);
        let predictor = Canned::new(ok("No DR"));
        c.handle_file_selected(Some(file("image/gif", 10)));
        c.submit_prediction(&predictor);

        assert_eq!(predictor.calls.get(), 0);
        let notice = c.state().notice().cloned().unwrap();
        assert_eq!(notice.kind, NoticeKind::Validation);
        assert_eq!(
            notice.alert_text(),
            "Please upload a valid image file (JPG, JPEG, or PNG)"
        );
        assert_eq!(c.state().trigger, TriggerState::Idle);
    }

    #[test]
    fn begin_submission_disables_trigger_until_finished() {
        let mut c = Controller::new(vec!["m.h5".into()]);
        c.handle_file_selected(Some(file("image/png", 10)));
        let submission = c.begin_submission().unwrap();
        assert_eq!(submission.model(), "m.h5");
        assert_eq!(c.state().trigger, TriggerState::Submitting);
        assert!(!c.state().trigger.is_enabled());
        assert_eq!(c.state().trigger.label(), LOADING_LABEL);

        assert!(c.begin_submission().is_none());

        c.finish_submission(submission, ok("No DR"));
        assert_eq!(c.state().trigger, TriggerState::Idle);
        assert_eq!(c.state().trigger.label(), IDLE_LABEL);
    }

    #[test]
    fn success_renders_results_and_requests_scroll() {
        let mut c = Controller::new(vec!["m.h5".into()]);
        c.handle_file_selected(Some(file("image/jpeg", 10)));
        c.submit_prediction(&Canned::new(ok("Moderate DR")));

        let results = c.state().results.clone().unwrap();
        assert_eq!(results.label, DrLabel::ModerateDr);
        assert_eq!(results.severity, Severity::Medium);
        assert!(c.state().scroll_to_results);
        assert!(c.state().notice().is_none());
        c.results_scrolled();
        assert!(!c.state().scroll_to_results);
    }

    #[test]
    fn remote_error_is_alerted_and_not_rendered() {
        let mut c = Controller::new(vec!["m.h5".into()]);
        c.handle_file_selected(Some(file("image/png", 10)));
        c.submit_prediction(&Canned::new(Err(PredictError::Remote(
            "model unavailable".into(),
        ))));

        assert!(c.state().results.is_none());
        let notice = c.dismiss_notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Remote);
        assert_eq!(notice.alert_text(), "Error: model unavailable");
        assert!(c.state().notice().is_none());
        assert_eq!(c.state().trigger.label(), IDLE_LABEL);
    }

    #[test]
    fn new_selection_hides_results_immediately() {
        let mut c = Controller::new(vec!["m.h5".into()]);
        c.handle_file_selected(Some(file("image/png", 10)));
        c.submit_prediction(&Canned::new(ok("No DR")));
        assert!(c.state().results.is_some());

        let ticket = c.handle_file_selected(Some(file("image/png", 20)));
        assert!(ticket.is_some());
        assert!(c.state().results.is_none());
        assert!(c.state().preview.is_none());
    }

    #[test]
    fn stale_preview_is_discarded() {
        let mut c = Controller::default();
        let first = c.handle_file_selected(Some(file("image/png", 1))).unwrap();
        let second = c.handle_file_selected(Some(file("image/png", 2))).unwrap();

        assert!(!c.complete_preview(first, Ok(preview())));
        assert!(c.state().preview.is_none());
        assert!(c.complete_preview(second, Ok(preview())));
        assert!(c.state().preview.is_some());
    }

    #[test]
    fn failed_preview_keeps_file_submittable() {
        let mut c = Controller::new(vec!["m.h5".into()]);
        let predictor = Canned::new(ok("No DR"));
        let ticket = c
            .handle_file_selected(Some(file("image/png", MAX_UPLOAD_BYTES)))
            .unwrap();
        assert!(c.complete_preview(
            ticket,
            Err(ValidationError::Unreadable {
                reason: "corrupt".into(),
            }),
        ));
        assert!(c.state().selected.is_some());
        assert!(c.state().preview.is_none());
        assert_eq!(
            c.dismiss_notice().map(|n| n.kind),
            Some(NoticeKind::Validation)
        );

        c.submit_prediction(&predictor);
        assert_eq!(predictor.calls.get(), 1);
        assert!(c.state().notice().is_none());
        assert!(c.state().results.is_some());
    }

    #[test]
    fn queued_notices_are_dismissed_in_order() {
        let mut c = Controller::new(vec!["m.h5".into()]);
        c.handle_file_selected(Some(file("image/png", 10)));
        let submission = c.begin_submission().unwrap();

        let ticket = c.handle_file_selected(Some(file("image/png", 20))).unwrap();
        c.complete_preview(
            ticket,
            Err(ValidationError::Unreadable {
                reason: "eye.png: corrupt".into(),
            }),
        );
        c.finish_submission(
            submission,
            Err(PredictError::Remote("model unavailable".into())),
        );

        assert_eq!(c.state().notices.len(), 2);
        let first = c.dismiss_notice().unwrap();
        assert_eq!(first.kind, NoticeKind::Validation);
        assert!(first.alert_text().contains("corrupt"));
        assert_eq!(
            c.state().notice().map(Notice::alert_text).as_deref(),
            Some("Error: model unavailable")
        );
        assert!(c.dismiss_notice().is_some());
        assert!(c.dismiss_notice().is_none());
    }

    #[test]
    fn clearing_selection_keeps_results() {
        let mut c = Controller::new(vec!["m.h5".into()]);
        c.handle_file_selected(Some(file("image/png", 10)));
        c.submit_prediction(&Canned::new(ok("No DR")));

        assert!(c.handle_file_selected(None).is_none());
        assert!(c.state().selected.is_none());
        assert!(c.state().results.is_some());
    }

    #[test]
    fn missing_path_raises_notice() {
        let mut c = Controller::default();
        let ticket = c.handle_path_selected(Path::new("/definitely/not/here.png"));
        assert!(ticket.is_none());
        assert!(c.state().selected.is_none());
        assert_eq!(
            c.state().notice().map(|n| n.kind),
            Some(NoticeKind::Validation)
        );
    }

    #[test]
    fn custom_upload_limit_is_honoured() {
        let mut c = Controller::new(vec!["m.h5".into()]).with_max_upload_bytes(100);
        c.handle_file_selected(Some(file("image/png", 101)));
        assert!(c.begin_submission().is_none());
        assert_eq!(
            c.state().notice().map(|n| n.message.as_str()),
            Some("File size exceeds 100 bytes. Please upload a smaller image.")
        );
    }
}
