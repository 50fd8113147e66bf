mod app;
mod worker;

use app::{APP_VERSION, UiApp};
use directories_next::ProjectDirs;
use eframe::{NativeOptions, egui};
use retina_core::AppConfig;
use std::env;
use std::path::PathBuf;

fn main() {
    tracing_subscriber::fmt::init();

    let config_path = config_path();
    let config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("{e:#}; falling back to defaults");
            AppConfig::default()
        }
    };

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 760.0])
            .with_title(format!("RetinaScan {APP_VERSION}")),
        ..Default::default()
    };
    if let Err(e) = eframe::run_native(
        "RetinaScan",
        options,
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(UiApp::new(cc, config, config_path)))
        }),
    ) {
        tracing::error!("application stopped with error: {e}");
    }
}

/// `RETINASCAN_CONFIG` wins over the platform config directory.
fn config_path() -> PathBuf {
    if let Some(path) = env::var_os("RETINASCAN_CONFIG") {
        return PathBuf::from(path);
    }
    ProjectDirs::from("org", "RetinaScan", "RetinaScan")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("retinascan.toml"))
}
