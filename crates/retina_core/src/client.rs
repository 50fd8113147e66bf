//! HTTP side of the prediction round trip.

use crate::config::AppConfig;
use crate::error::{PredictError, PredictResult};
use crate::label::DrLabel;
use crate::validation::SelectedFile;
use regex::Regex;
use reqwest::blocking::{Client, multipart};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::LazyLock;

const USER_AGENT: &str = concat!("RetinaScan/", env!("CARGO_PKG_VERSION"));

static MODEL_SELECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<select[^>]*\bid\s*=\s*["']model-select["'][^>]*>(.*?)</select>"#)
        .expect("model-select pattern is valid")
});

static OPTION_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<option[^>]*\bvalue\s*=\s*["']([^"']*)["']"#)
        .expect("option pattern is valid")
});

/// Successful classification returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResponse {
    pub prediction: DrLabel,
    /// Model probability in [0,1].
    pub confidence: f64,
    /// Server path of the echoed upload, e.g. `/static/uploads/x.jpg`.
    pub image_path: String,
}

/// Anything that can turn a selected file plus model id into a prediction.
pub trait Predictor {
    fn predict(&self, file: &SelectedFile, model: &str) -> PredictResult<PredictionResponse>;
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    prediction: Option<String>,
    #[serde(default)]
    confidence: Option<WireNumber>,
    #[serde(default)]
    image_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Number(f64),
    Text(String),
}

impl WireNumber {
    fn to_f64(&self) -> Option<f64> {
        match self {
            WireNumber::Number(n) => Some(*n),
            WireNumber::Text(s) => parse_float_prefix(s),
        }
    }
}

/// Read the longest leading decimal number of `text`, ignoring leading
/// whitespace and any trailing garbage: `" 0.93abc"` is `0.93`.
fn parse_float_prefix(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits(end);
    let mut mantissa_end = int_end;
    if bytes.get(int_end) == Some(&b'.') {
        mantissa_end = digits(int_end + 1);
    }
    // a lone sign or dot is not a number
    if mantissa_end == end || (mantissa_end == end + 1 && int_end == end) {
        return None;
    }
    end = mantissa_end;

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}

/// Interpret a `/predict` response body.
///
/// The body is parsed regardless of status, since the server reports
/// application errors as `{ "error": ... }`. An empty `error` string does not
/// count as a failure.
pub fn parse_prediction(status: StatusCode, body: &str) -> PredictResult<PredictionResponse> {
    let wire: WireResponse = match serde_json::from_str(body) {
        Ok(wire) => wire,
        Err(e) if !status.is_success() => {
            return Err(PredictError::Transport(format!(
                "server returned {status}: {e}"
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(message) = wire.error.filter(|m| !m.is_empty()) {
        return Err(PredictError::Remote(message));
    }

    let prediction = wire
        .prediction
        .ok_or_else(|| malformed("prediction"))?;
    let confidence = wire
        .confidence
        .as_ref()
        .and_then(WireNumber::to_f64)
        .filter(|c| c.is_finite())
        .ok_or_else(|| malformed("confidence"))?;
    let image_path = wire.image_path.ok_or_else(|| malformed("image_path"))?;

    Ok(PredictionResponse {
        prediction: DrLabel::from(prediction),
        confidence,
        image_path,
    })
}

fn malformed(field: &str) -> PredictError {
    PredictError::Transport(format!("response is missing a valid `{field}`"))
}

/// Pull model identifiers out of the `model-select` element of an HTML page.
pub fn extract_models_from_html(html: &str) -> Vec<String> {
    let Some(block) = MODEL_SELECT_RE.captures(html).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    let mut models: Vec<String> = Vec::new();
    for caps in OPTION_VALUE_RE.captures_iter(block.as_str()) {
        let value = caps[1].trim();
        if value.is_empty() || models.iter().any(|m| m == value) {
            continue;
        }
        models.push(value.to_string());
    }
    models
}

/// Blocking HTTP client for the prediction server.
#[derive(Debug, Clone)]
pub struct HttpPredictor {
    client: Client,
    base: Url,
    predict_url: Url,
}

impl HttpPredictor {
    pub fn new(cfg: &AppConfig) -> PredictResult<Self> {
        let base = Url::parse(&cfg.server_url).map_err(|e| {
            PredictError::Transport(format!("invalid server URL {:?}: {e}", cfg.server_url))
        })?;
        let predict_url = join(&base, &cfg.predict_path)?;
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(cfg.request_timeout());
        if is_loopback(&base) {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            base,
            predict_url,
        })
    }

    pub fn predict_url(&self) -> &Url {
        &self.predict_url
    }

    /// Resolve a server-relative path such as the echoed `image_path`.
    pub fn resolve(&self, path: &str) -> PredictResult<Url> {
        join(&self.base, path)
    }

    /// Download the image the server rendered for a prediction.
    pub fn fetch_image(&self, image_path: &str) -> PredictResult<Vec<u8>> {
        let url = self.resolve(image_path)?;
        tracing::debug!("fetching result image {url}");
        let bytes = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .bytes()?;
        Ok(bytes.to_vec())
    }

    /// Ask the server which models it offers by scraping its index page.
    pub fn discover_models(&self) -> PredictResult<Vec<String>> {
        let html = self
            .client
            .get(self.base.clone())
            .send()?
            .error_for_status()?
            .text()?;
        let models = extract_models_from_html(&html);
        tracing::info!("server advertises {} model(s)", models.len());
        Ok(models)
    }
}

impl Predictor for HttpPredictor {
    fn predict(&self, file: &SelectedFile, model: &str) -> PredictResult<PredictionResponse> {
        let bytes = file.read_bytes()?;
        let part = multipart::Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("model", model.to_string());

        tracing::info!(
            file = %file.name,
            size = file.size,
            model,
            "POST {}",
            self.predict_url
        );
        let resp = self
            .client
            .post(self.predict_url.clone())
            .multipart(form)
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        parse_prediction(status, &body)
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_matches(|c| c == '[' || c == ']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

fn join(base: &Url, path: &str) -> PredictResult<Url> {
    base.join(path)
        .map_err(|e| PredictError::Transport(format!("cannot resolve {path:?} against {base}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn success_shape_is_parsed() -> PredictResult<()> {
        let resp = parse_prediction(
            StatusCode::OK,
            r#"{"prediction":"No DR","confidence":0.93,"image_path":"/x.jpg"}"#,
        )?;
        assert_eq!(resp.prediction, DrLabel::NoDr);
        assert_relative_eq!(resp.confidence, 0.93);
        assert_eq!(resp.image_path, "/x.jpg");
        Ok(())
    }

    #[test]
    fn confidence_may_be_a_numeric_string() -> PredictResult<()> {
        let resp = parse_prediction(
            StatusCode::OK,
            r#"{"prediction":"Mild DR","confidence":" 0.5 ","image_path":"/y.png"}"#,
        )?;
        assert_relative_eq!(resp.confidence, 0.5);
        Ok(())
    }

    #[test]
    fn confidence_string_keeps_its_numeric_prefix() -> PredictResult<()> {
        let resp = parse_prediction(
            StatusCode::OK,
            r#"{"prediction":"No DR","confidence":"0.93abc","image_path":"/n.png"}"#,
        )?;
        assert_relative_eq!(resp.confidence, 0.93);
        Ok(())
    }

    #[rstest]
    #[case("0.93", Some(0.93))]
    #[case("  42%", Some(42.0))]
    #[case("-.5x", Some(-0.5))]
    #[case("7.", Some(7.0))]
    #[case("1e-2 units", Some(0.01))]
    #[case("3e", Some(3.0))]
    #[case("+", None)]
    #[case(".", None)]
    #[case("-.e3", None)]
    #[case("high", None)]
    #[case("", None)]
    fn float_prefix(#[case] text: &str, #[case] expected: Option<f64>) {
        match (parse_float_prefix(text), expected) {
            (Some(got), Some(want)) => assert_relative_eq!(got, want),
            (got, want) => assert_eq!(got, want),
        }
    }

    #[test]
    fn error_field_becomes_remote_error() {
        let err = parse_prediction(StatusCode::OK, r#"{"error":"model unavailable"}"#)
            .unwrap_err();
        assert_eq!(err, PredictError::Remote("model unavailable".into()));
    }

    #[test]
    fn error_field_wins_over_success_fields() {
        let err = parse_prediction(
            StatusCode::OK,
            r#"{"error":"boom","prediction":"No DR","confidence":1,"image_path":"/a"}"#,
        )
        .unwrap_err();
        assert_eq!(err, PredictError::Remote("boom".into()));
    }

    #[test]
    fn empty_error_string_is_ignored() -> PredictResult<()> {
        let resp = parse_prediction(
            StatusCode::OK,
            r#"{"error":"","prediction":"Severe DR","confidence":0.7,"image_path":"/s.jpg"}"#,
        )?;
        assert_eq!(resp.prediction, DrLabel::SevereDr);
        Ok(())
    }

    #[rstest]
    #[case(r#"{"confidence":0.5,"image_path":"/a"}"#, "prediction")]
    #[case(r#"{"prediction":"No DR","image_path":"/a"}"#, "confidence")]
    #[case(r#"{"prediction":"No DR","confidence":"high","image_path":"/a"}"#, "confidence")]
    #[case(r#"{"prediction":"No DR","confidence":0.5}"#, "image_path")]
    fn missing_fields_are_transport_errors(#[case] body: &str, #[case] field: &str) {
        match parse_prediction(StatusCode::OK, body) {
            Err(PredictError::Transport(msg)) => assert!(msg.contains(field), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_transport_error() {
        let err = parse_prediction(StatusCode::OK, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, PredictError::Transport(_)));
    }

    #[test]
    fn non_json_error_status_mentions_status() {
        let err = parse_prediction(StatusCode::PAYLOAD_TOO_LARGE, "<h1>Too Large</h1>")
            .unwrap_err();
        match err {
            PredictError::Transport(msg) => assert!(msg.contains("413"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn models_are_scraped_from_select() {
        let html = r#"
            <form id="upload-form">
              <select class="form-select" id="model-select" name="model">
                <option value="custom_cnn.h5">custom_cnn.h5</option>
                <option value='model.h5' selected>model.h5</option>
                <option value="">--</option>
                <option value="model.h5">dup</option>
              </select>
              <select id="other"><option value="nope">nope</option></select>
            </form>"#;
        assert_eq!(
            extract_models_from_html(html),
            vec!["custom_cnn.h5".to_string(), "model.h5".to_string()]
        );
    }

    #[test]
    fn page_without_select_has_no_models() {
        assert!(extract_models_from_html("<p>hello</p>").is_empty());
    }

    #[test]
    fn urls_resolve_against_server() -> PredictResult<()> {
        let cfg = AppConfig {
            server_url: "http://10.0.0.2:5000".into(),
            ..AppConfig::default()
        };
        let predictor = HttpPredictor::new(&cfg)?;
        assert_eq!(
            predictor.predict_url().as_str(),
            "http://10.0.0.2:5000/predict"
        );
        assert_eq!(
            predictor.resolve("/static/uploads/a.png")?.as_str(),
            "http://10.0.0.2:5000/static/uploads/a.png"
        );
        Ok(())
    }

    #[rstest]
    #[case("http://localhost:5000", true)]
    #[case("http://127.0.0.1:5000", true)]
    #[case("http://[::1]:5000", true)]
    #[case("http://10.1.2.3:5000", false)]
    #[case("https://screening.example.org", false)]
    fn loopback_hosts_are_detected(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_loopback(&Url::parse(url).unwrap()), expected);
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        let cfg = AppConfig {
            server_url: "not a url".into(),
            ..AppConfig::default()
        };
        assert!(matches!(
            HttpPredictor::new(&cfg),
            Err(PredictError::Transport(_))
        ));
    }
}
