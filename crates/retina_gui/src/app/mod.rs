mod analyze;
mod settings;

use crate::worker::{Worker, WorkerEvent};
use eframe::{App, Frame, egui};
use retina_core::{AppConfig, Controller, HttpPredictor, PredictError, Severity};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

pub const APP_VERSION: &str = env!("RETINASCAN_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panel {
    Analyze,
    Settings,
}

/// Downloaded copy of the image the server echoed back.
struct ResultImage {
    image_path: String,
    uri: String,
    /// `None` when the download failed.
    bytes: Option<Arc<[u8]>>,
}

pub struct UiApp {
    controller: Controller,
    config: AppConfig,
    config_path: PathBuf,
    predictor: Option<Arc<HttpPredictor>>,
    worker: Worker,
    events: Receiver<WorkerEvent>,
    panel: Panel,
    status: String,
    preview_texture: Option<egui::TextureHandle>,
    preview_loading: bool,
    result_image: Option<ResultImage>,
    result_image_seq: u64,
    server_url_input: String,
    models_input: String,
}

impl UiApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig, config_path: PathBuf) -> Self {
        let (worker, events) = Worker::new(cc.egui_ctx.clone());
        let controller = Controller::new(config.models.clone())
            .with_max_upload_bytes(config.max_upload_bytes);
        let mut app = Self {
            controller,
            server_url_input: config.server_url.clone(),
            models_input: config.models.join(", "),
            config,
            config_path,
            predictor: None,
            worker,
            events,
            panel: Panel::Analyze,
            status: String::new(),
            preview_texture: None,
            preview_loading: false,
            result_image: None,
            result_image_seq: 0,
        };
        app.rebuild_predictor();
        if app.config.discover_models {
            app.refresh_models();
        }
        app
    }

    fn rebuild_predictor(&mut self) {
        match HttpPredictor::new(&self.config) {
            Ok(predictor) => {
                tracing::info!("prediction endpoint: {}", predictor.predict_url());
                self.predictor = Some(Arc::new(predictor));
            }
            Err(e) => {
                tracing::error!("cannot build HTTP client: {e}");
                self.status = format!("Server not usable: {e}");
                self.predictor = None;
            }
        }
    }

    fn refresh_models(&mut self) {
        if let Some(predictor) = self.predictor.clone() {
            self.status = "Fetching models from server...".to_string();
            self.worker.discover_models(predictor);
        }
    }

    fn choose_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png"])
            .pick_file()
        {
            self.select_path(path);
        }
    }

    fn select_path(&mut self, path: PathBuf) {
        self.preview_texture = None;
        let ticket = self.controller.handle_path_selected(&path);
        self.preview_loading = ticket.is_some();
        if let Some(ticket) = ticket {
            self.worker.load_preview(ticket);
        }
    }

    fn submit(&mut self) {
        let Some(submission) = self.controller.begin_submission() else {
            return;
        };
        match self.predictor.clone() {
            Some(predictor) => self.worker.predict(submission, predictor),
            None => self.controller.finish_submission(
                submission,
                Err(PredictError::Transport(
                    "no usable server URL is configured".to_string(),
                )),
            ),
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(path) = dropped.into_iter().find_map(|f| f.path) {
            self.select_path(path);
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                WorkerEvent::PreviewLoaded { ticket, result } => {
                    if self.controller.complete_preview(ticket, result) {
                        self.preview_loading = false;
                        self.preview_texture = self.controller.state().preview.as_ref().map(|p| {
                            let image = egui::ColorImage::from_rgba_unmultiplied(
                                [p.width as usize, p.height as usize],
                                &p.rgba,
                            );
                            ctx.load_texture("preview", image, egui::TextureOptions::LINEAR)
                        });
                    }
                }
                WorkerEvent::PredictionFinished {
                    submission,
                    outcome,
                } => {
                    let image_path = outcome.as_ref().ok().map(|r| r.image_path.clone());
                    self.controller.finish_submission(submission, outcome);
                    let Some(image_path) = image_path else {
                        continue;
                    };
                    if let Some(old) = self.result_image.take() {
                        ctx.forget_image(&old.uri);
                    }
                    if let Some(predictor) = self.predictor.clone() {
                        self.worker.fetch_result_image(predictor, image_path);
                    }
                }
                WorkerEvent::ResultImage { image_path, result } => {
                    let current = self
                        .controller
                        .state()
                        .results
                        .as_ref()
                        .map(|r| r.image_path.as_str());
                    if current != Some(image_path.as_str()) {
                        continue;
                    }
                    let bytes = match result {
                        Ok(bytes) => Some(Arc::from(bytes)),
                        Err(e) => {
                            tracing::warn!("result image {image_path} not loaded: {e}");
                            None
                        }
                    };
                    self.result_image_seq += 1;
                    self.result_image = Some(ResultImage {
                        uri: format!("bytes://result/{}{}", self.result_image_seq, image_path),
                        image_path,
                        bytes,
                    });
                }
                WorkerEvent::ModelsDiscovered(result) => match result {
                    Ok(models) if !models.is_empty() => {
                        self.status = format!("{} model(s) available on server", models.len());
                        self.models_input = models.join(", ");
                        self.controller.set_models(models);
                    }
                    Ok(_) => {
                        self.status = "Server lists no models; using configured list".to_string();
                    }
                    Err(e) => {
                        tracing::warn!("model discovery failed: {e}");
                        self.status = "Model discovery failed; using configured list".to_string();
                    }
                },
            }
        }
    }

    fn render_top_bar(&mut self, ui: &mut egui::Ui) {
        let state = self.controller.state();
        let trigger = state.trigger;
        let models = state.models.clone();
        let mut model = state.model.clone();

        ui.horizontal(|ui| {
            if ui
                .add_enabled(trigger.is_enabled(), egui::Button::new("Choose image..."))
                .clicked()
            {
                self.choose_file();
            }

            ui.label("Model");
            egui::ComboBox::from_id_salt("model-select")
                .selected_text(if model.is_empty() { "(none)" } else { model.as_str() })
                .show_ui(ui, |ui| {
                    for m in &models {
                        ui.selectable_value(&mut model, m.clone(), m.as_str());
                    }
                });

            let analyze = ui.add_enabled(trigger.is_enabled(), egui::Button::new(trigger.label()));
            if !trigger.is_enabled() {
                ui.spinner();
            }
            if analyze.clicked() {
                self.submit();
            }

            ui.separator();
            let (label, target) = match self.panel {
                Panel::Analyze => ("Settings", Panel::Settings),
                Panel::Settings => ("Back", Panel::Analyze),
            };
            if ui.button(label).clicked() {
                self.panel = target;
            }

            if !self.status.is_empty() {
                ui.label(&self.status);
            }
        });

        if model != self.controller.state().model {
            self.controller.select_model(model);
        }
    }

    fn render_notice(&mut self, ctx: &egui::Context) {
        let Some(text) = self.controller.state().notice().map(|n| n.alert_text()) else {
            return;
        };
        let mut dismissed = ctx.input(|i| i.key_pressed(egui::Key::Enter));
        egui::Window::new("RetinaScan")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(text);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.controller.dismiss_notice();
        }
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.drain_events(ctx);
        let blocked = self.controller.state().notice().is_some();
        if !blocked {
            self.handle_dropped_files(ctx);
        }

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.add_enabled_ui(!blocked, |ui| self.render_top_bar(ui));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!blocked, |ui| match self.panel {
                Panel::Analyze => self.render_analyze_panel(ui),
                Panel::Settings => self.render_settings_panel(ui),
            });
        });

        self.render_notice(ctx);
    }
}

pub(crate) fn severity_color(severity: Severity) -> egui::Color32 {
    match severity {
        Severity::Low => egui::Color32::from_rgb(25, 135, 84),
        Severity::Medium => egui::Color32::from_rgb(214, 140, 0),
        Severity::High => egui::Color32::from_rgb(220, 53, 69),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_colours_are_distinct() {
        let low = severity_color(Severity::Low);
        let medium = severity_color(Severity::Medium);
        let high = severity_color(Severity::High);
        assert_ne!(low, medium);
        assert_ne!(medium, high);
        assert_ne!(low, high);
    }
}
