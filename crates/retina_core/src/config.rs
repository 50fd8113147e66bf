use crate::validation::MAX_UPLOAD_BYTES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Client settings, persisted as TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the prediction server, without trailing path.
    pub server_url: String,
    pub predict_path: String,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: u64,
    /// Model identifiers offered when discovery is off or fails.
    pub models: Vec<String>,
    /// Scrape the server's index page for its model list on startup.
    pub discover_models: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            predict_path: "/predict".to_string(),
            request_timeout_secs: 60,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            models: vec!["custom_cnn.h5".to_string()],
            discover_models: true,
        }
    }
}

impl AppConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("config not readable: {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("config is not valid TOML: {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("config serialisation failed")?;
        fs::write(path, raw).with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
