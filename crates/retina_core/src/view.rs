use crate::client::PredictionResponse;
use crate::label::{DrLabel, Severity};

/// Everything the results region shows for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub image_path: String,
    pub label: DrLabel,
    pub confidence_percent: f64,
    /// Width of the confidence indicator, e.g. `"93%"`.
    pub bar_width: String,
    /// One-decimal text, e.g. `"93.0%"`.
    pub confidence_text: String,
    pub description: &'static str,
    pub severity: Severity,
}

impl ResultsView {
    pub fn label_text(&self) -> &str {
        self.label.as_str()
    }

    /// Fill fraction for a progress widget; out-of-range confidences are clamped.
    pub fn bar_fraction(&self) -> f32 {
        (self.confidence_percent / 100.0).clamp(0.0, 1.0) as f32
    }
}

pub fn render_prediction(response: &PredictionResponse) -> ResultsView {
    let confidence_percent = response.confidence * 100.0;
    ResultsView {
        image_path: response.image_path.clone(),
        label: response.prediction.clone(),
        confidence_percent,
        bar_width: format!("{}%", trim_float_noise(confidence_percent)),
        confidence_text: format!("{confidence_percent:.1}%"),
        description: response.prediction.description(),
        severity: response.prediction.severity(),
    }
}

// 0.07 * 100.0 is 7.000000000000001; keep two decimals at most.
fn trim_float_noise(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
