// Structured results returned by the AI assistant, and their parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use unishare_core::models::{Category, HonestReview};

use crate::client::Assistant;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI not configured")]
    NotConfigured,

    #[error("No engineering tool detected in scan.")]
    NoAssetDetected,

    #[error("Network too slow")]
    TimedOut,

    #[error("AI service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed AI response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// Video appraisal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGrade {
    A,
    B,
    C,
}

impl QualityGrade {
    /// Condition label shown on a listing built from this grade.
    pub fn condition_label(&self) -> &'static str {
        match self {
            QualityGrade::A => "Excellent",
            QualityGrade::B => "Good",
            QualityGrade::C => "Fair",
        }
    }
}

/// Result of a 360-degree video audit of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAppraisal {
    pub item_name: String,
    /// Category label as returned by the model. See [`VideoAppraisal::category`].
    pub category: String,
    pub quality_grade: QualityGrade,
    pub estimated_price: f64,
    #[serde(rename = "carbonSaved")]
    pub carbon_saved: f64,
    pub review: HonestReview,
}

impl VideoAppraisal {
    /// The catalog category, falling back to general essentials for labels
    /// the catalog does not know.
    pub fn category(&self) -> Category {
        Category::from_label(&self.category).unwrap_or(Category::GeneralEssentials)
    }
}

#[derive(Deserialize)]
struct RawAppraisal {
    item_name: Option<String>,
    #[serde(default)]
    category: String,
    #[serde(default = "default_grade")]
    quality_grade: QualityGrade,
    #[serde(default)]
    estimated_price: f64,
    #[serde(default, rename = "carbonSaved")]
    carbon_saved: f64,
    #[serde(default)]
    review: HonestReview,
}

fn default_grade() -> QualityGrade {
    QualityGrade::B
}

/// Parse the model's JSON answer to an appraisal prompt. A missing, empty,
/// or `"None"` item name means nothing recognizable was in the video.
pub fn parse_video_appraisal(text: &str) -> Result<VideoAppraisal, AiError> {
    let raw: RawAppraisal = serde_json::from_str(text.trim())
        .map_err(|e| AiError::MalformedResponse(e.to_string()))?;

    let item_name = match raw.item_name {
        Some(name) if !name.trim().is_empty() && name.trim() != "None" => name,
        _ => return Err(AiError::NoAssetDetected),
    };

    Ok(VideoAppraisal {
        item_name,
        category: raw.category,
        quality_grade: raw.quality_grade,
        estimated_price: raw.estimated_price,
        carbon_saved: raw.carbon_saved,
        review: raw.review,
    })
}

/// Race an appraisal against `limit`. When the timer wins the pending call
/// is dropped and [`AiError::TimedOut`] is returned.
pub async fn appraise_with_timeout(
    assistant: &dyn Assistant,
    video_b64: &str,
    mime: &str,
    limit: Duration,
) -> Result<VideoAppraisal, AiError> {
    match tokio::time::timeout(limit, assistant.appraise_video(video_b64, mime)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(limit_secs = limit.as_secs(), "video appraisal timed out");
            Err(AiError::TimedOut)
        }
    }
}

// ---------------------------------------------------------------------------
// Damage inspection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolCondition {
    Excellent,
    Good,
    Damaged,
    Critical,
}

/// Still-image inspection report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageReport {
    pub tool_name: String,
    pub quality_grade: QualityGrade,
    pub condition: ToolCondition,
    pub score: f64,
    pub findings: Vec<String>,
    pub recommendation: String,
}

impl DamageReport {
    /// Report used when the model's answer cannot be read.
    pub fn manual_inspection() -> Self {
        Self {
            tool_name: "Unknown Tool".to_string(),
            quality_grade: QualityGrade::B,
            condition: ToolCondition::Good,
            score: 7.0,
            findings: vec!["Manual inspection required.".to_string()],
            recommendation: "Verify manually.".to_string(),
        }
    }
}

/// Parse a damage report, substituting [`DamageReport::manual_inspection`]
/// for anything unreadable.
pub fn parse_damage_report(text: &str) -> DamageReport {
    match serde_json::from_str(text.trim()) {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "unreadable damage report, falling back to manual inspection");
            DamageReport::manual_inspection()
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip a `data:<mime>;base64,` prefix, leaving bare base64.
pub fn strip_data_url(payload: &str) -> &str {
    if payload.starts_with("data:") {
        payload.split_once(',').map_or(payload, |(_, data)| data)
    } else {
        payload
    }
}
