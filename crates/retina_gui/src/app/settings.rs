//! Settings panel for the server connection and model list.

use super::{APP_VERSION, Panel, UiApp};
use eframe::egui;
use retina_core::AppConfig;

impl UiApp {
    /// Renders the settings screen: server address, models, timeouts.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Server URL");
            ui.text_edit_singleline(&mut self.server_url_input);
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Models (comma separated)");
            ui.text_edit_singleline(&mut self.models_input);
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Request timeout (s)");
            ui.add(
                egui::DragValue::new(&mut self.config.request_timeout_secs)
                    .range(1..=600)
                    .speed(1),
            );
        });
        ui.add_space(6.0);
        ui.checkbox(
            &mut self.config.discover_models,
            "Fetch the model list from the server on startup",
        );

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button("Apply and save").clicked() {
                self.apply_settings();
            }
            if ui.button("Refresh models from server").clicked() {
                self.refresh_models();
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Versions");
        ui.label(format!("App version: {APP_VERSION}"));
        ui.label(format!("Config file: {}", self.config_path.display()));
    }

    fn apply_settings(&mut self) {
        let next = settings_from_inputs(&self.config, &self.server_url_input, &self.models_input);
        self.config = next;
        self.controller.set_models(self.config.models.clone());
        self.rebuild_predictor();
        let saved = self.config.save(&self.config_path);
        match &saved {
            Ok(()) => tracing::info!("settings saved to {}", self.config_path.display()),
            Err(e) => tracing::error!("saving settings failed: {e:#}"),
        }
        let usable = self.predictor.is_some();
        if let Some(status) = status_after_save(&saved, usable) {
            self.status = status;
        }
        if saved.is_ok() && usable {
            self.panel = Panel::Analyze;
        }
    }
}

/// Status line after "Apply and save". `None` keeps the line set by
/// `rebuild_predictor`, which explains why the server URL is unusable.
fn status_after_save<E: std::fmt::Display>(saved: &Result<(), E>, usable: bool) -> Option<String> {
    match saved {
        Err(e) => Some(format!("Saving settings failed: {e}")),
        Ok(()) if usable => Some("Settings saved.".to_string()),
        Ok(()) => None,
    }
}

/// Merge the free-text inputs into a copy of `base`.
fn settings_from_inputs(base: &AppConfig, server_url: &str, models: &str) -> AppConfig {
    let models: Vec<String> = models
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    AppConfig {
        server_url: server_url.trim().trim_end_matches('/').to_string(),
        models: if models.is_empty() {
            base.models.clone()
        } else {
            models
        },
        ..base.clone()
    }
}
