// Gemini API client.
//
// Each assistant operation is one `generateContent` POST. The model's text
// parts are concatenated and, for structured operations, parsed as JSON.
// There is no streaming, retry, or batching.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use unishare_core::config::Config;
use unishare_core::models::Listing;

use crate::appraisal::{
    parse_damage_report, parse_video_appraisal, strip_data_url, AiError, DamageReport,
    VideoAppraisal,
};
use crate::prompt;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

// ---------------------------------------------------------------------------
// Assistant trait
// ---------------------------------------------------------------------------

/// The AI operations the marketplace relies on.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Appraise an item from a base64 360-degree video.
    async fn appraise_video(&self, video_b64: &str, mime: &str) -> Result<VideoAppraisal, AiError>;

    /// Grade visible damage on a base64 JPEG still.
    async fn inspect_damage(&self, image_b64: &str) -> Result<DamageReport, AiError>;

    /// Summarize a PDF given as bare base64 or a `data:` URL.
    async fn summarize_pdf(&self, pdf: &str, title: &str) -> Result<String, AiError>;

    async fn support_reply(&self, query: &str) -> Result<String, AiError>;

    /// Explain a decoded session token payload in plain language.
    async fn explain_claims(&self, payload: &Value) -> Result<String, AiError>;

    /// Free-text comparison of two listings.
    async fn compare_items(&self, first: &Listing, second: &Listing) -> Result<String, AiError>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one `generateContent` request and return the concatenated text
    /// of the first candidate.
    async fn generate(&self, parts: Vec<Value>, json_output: bool) -> Result<String, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured);
        }

        let mut body = json!({
            "contents": [{ "role": "user", "parts": parts }],
        });
        if json_output {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, json_output, "sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = extract_error_message(&payload)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            warn!(status = status.as_u16(), %message, "generateContent failed");
            return Err(AiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        extract_text(&payload)
            .ok_or_else(|| AiError::MalformedResponse("response carried no text".to_string()))
    }
}

fn inline_data(mime: &str, data: &str) -> Value {
    json!({ "inlineData": { "mimeType": mime, "data": data } })
}

fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

#[async_trait]
impl Assistant for GeminiClient {
    async fn appraise_video(&self, video_b64: &str, mime: &str) -> Result<VideoAppraisal, AiError> {
        info!(mime, bytes = video_b64.len(), "Requesting video appraisal");
        let parts = vec![inline_data(mime, video_b64), text_part(&prompt::video_appraisal())];
        let text = self.generate(parts, true).await?;
        let appraisal = parse_video_appraisal(&text)?;
        info!(item = %appraisal.item_name, grade = ?appraisal.quality_grade, "Appraisal complete");
        Ok(appraisal)
    }

    async fn inspect_damage(&self, image_b64: &str) -> Result<DamageReport, AiError> {
        let parts = vec![
            inline_data("image/jpeg", image_b64),
            text_part(prompt::damage_inspection()),
        ];
        let text = self.generate(parts, true).await?;
        Ok(parse_damage_report(&text))
    }

    async fn summarize_pdf(&self, pdf: &str, title: &str) -> Result<String, AiError> {
        let parts = vec![
            inline_data("application/pdf", strip_data_url(pdf)),
            text_part(&prompt::pdf_summary(title)),
        ];
        self.generate(parts, false).await
    }

    async fn support_reply(&self, query: &str) -> Result<String, AiError> {
        self.generate(vec![text_part(&prompt::support(query))], false)
            .await
    }

    async fn explain_claims(&self, payload: &Value) -> Result<String, AiError> {
        self.generate(vec![text_part(&prompt::claims_explanation(payload))], false)
            .await
    }

    async fn compare_items(&self, first: &Listing, second: &Listing) -> Result<String, AiError> {
        debug!(first = %first.id, second = %second.id, "comparing listings");
        self.generate(vec![text_part(&prompt::item_comparison(first, second))], false)
            .await
    }
}

// ---------------------------------------------------------------------------
// AiClient wrapper
// ---------------------------------------------------------------------------

/// Either a configured Gemini client or a disabled stand-in.
pub enum AiClient {
    Active(GeminiClient),
    /// No API key configured. Every call fails with [`AiError::NotConfigured`].
    Disabled,
}

impl AiClient {
    /// `Active` when credentials carry a non-empty Gemini key.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.gemini_api_key {
            Some(key) if !key.is_empty() => {
                AiClient::Active(GeminiClient::new(key.clone(), config.ai.model.clone()))
            }
            _ => AiClient::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, AiClient::Active(_))
    }

    fn active(&self) -> Result<&GeminiClient, AiError> {
        match self {
            AiClient::Active(client) => Ok(client),
            AiClient::Disabled => Err(AiError::NotConfigured),
        }
    }
}

#[async_trait]
impl Assistant for AiClient {
    async fn appraise_video(&self, video_b64: &str, mime: &str) -> Result<VideoAppraisal, AiError> {
        self.active()?.appraise_video(video_b64, mime).await
    }

    async fn inspect_damage(&self, image_b64: &str) -> Result<DamageReport, AiError> {
        self.active()?.inspect_damage(image_b64).await
    }

    async fn summarize_pdf(&self, pdf: &str, title: &str) -> Result<String, AiError> {
        self.active()?.summarize_pdf(pdf, title).await
    }

    async fn support_reply(&self, query: &str) -> Result<String, AiError> {
        self.active()?.support_reply(query).await
    }

    async fn explain_claims(&self, payload: &Value) -> Result<String, AiError> {
        self.active()?.explain_claims(payload).await
    }

    async fn compare_items(&self, first: &Listing, second: &Listing) -> Result<String, AiError> {
        self.active()?.compare_items(first, second).await
    }
}

// ---------------------------------------------------------------------------
// Response JSON helpers
// ---------------------------------------------------------------------------

/// Concatenate the text parts of the first candidate.
///
/// Expected shape: `{ "candidates": [ { "content": { "parts": [ { "text": "..." } ] } } ] }`
pub(crate) fn extract_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Expected shape: `{ "error": { "code": 400, "message": "..." } }`
fn extract_error_message(payload: &Value) -> Option<String> {
    payload
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
