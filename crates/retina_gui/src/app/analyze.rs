//! Upload preview and prediction results.

use super::{UiApp, severity_color};
use eframe::egui;
use retina_core::TriggerState;

const PREVIEW_MAX: f32 = 320.0;

impl UiApp {
    pub(super) fn render_analyze_panel(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                self.render_upload_card(ui);
                ui.add_space(12.0);
                self.render_results(ui);
            });
    }

    fn render_upload_card(&self, ui: &mut egui::Ui) {
        let state = self.controller.state();
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.heading("Retinal image");
            match &state.selected {
                Some(file) => {
                    ui.label(format!(
                        "{} ({}, {:.1} KB)",
                        file.name,
                        file.mime,
                        file.size as f64 / 1024.0
                    ));
                }
                None => {
                    ui.label("Choose a JPG or PNG image, or drop one on this window.");
                }
            }
            ui.add_space(6.0);
            match &self.preview_texture {
                Some(texture) => {
                    ui.add(
                        egui::Image::new(texture)
                            .max_width(PREVIEW_MAX)
                            .max_height(PREVIEW_MAX),
                    );
                }
                None if self.preview_loading => {
                    ui.spinner();
                }
                None if state.selected.is_some() => {
                    ui.label("Preview unavailable");
                }
                None => {}
            }
            if state.trigger == TriggerState::Submitting {
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(state.trigger.label());
                });
            }
        });
    }

    fn render_results(&mut self, ui: &mut egui::Ui) {
        let Some(results) = self.controller.state().results.clone() else {
            return;
        };
        let scroll = self.controller.state().scroll_to_results;

        let frame = egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.heading("Analysis result");
            ui.add_space(6.0);
            ui.horizontal_top(|ui| {
                let image = self
                    .result_image
                    .as_ref()
                    .filter(|img| img.image_path == results.image_path);
                match image {
                    Some(img) => match &img.bytes {
                        Some(bytes) => {
                            ui.add(
                                egui::Image::from_bytes(
                                    img.uri.clone(),
                                    egui::load::Bytes::Shared(bytes.clone()),
                                )
                                .max_width(PREVIEW_MAX)
                                .max_height(PREVIEW_MAX),
                            );
                        }
                        None => {
                            ui.label("Image unavailable");
                        }
                    },
                    None => {
                        ui.spinner();
                    }
                }

                ui.vertical(|ui| {
                    ui.label(
                        egui::RichText::new(results.label_text())
                            .size(20.0)
                            .strong()
                            .color(severity_color(results.severity)),
                    );
                    ui.add_space(6.0);
                    ui.label("Confidence");
                    ui.add(
                        egui::ProgressBar::new(results.bar_fraction())
                            .fill(severity_color(results.severity))
                            .text(results.confidence_text.as_str()),
                    );
                    ui.add_space(6.0);
                    ui.label(results.description);
                });
            });
        });

        if scroll {
            frame.response.scroll_to_me(Some(egui::Align::TOP));
            self.controller.results_scrolled();
        }
    }
}
